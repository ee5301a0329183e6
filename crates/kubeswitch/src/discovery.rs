//! Discovery & matching
//!
//! Drains the registry into a static snapshot of candidates and serves lazy,
//! cached previews to whatever picker presents them.

use crate::error::{DiscoveryError, SwitchError};
use crate::store::{Candidate, StoreKind, StoreRegistry};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::io;

/// Lines of kubeconfig shown in the preview pane.
pub const PREVIEW_MAX_LINES: usize = 200;

/// Candidate snapshot plus the recovered per-PathSpec errors.
#[derive(Debug, Default)]
pub struct Discovery {
    pub candidates: Vec<Candidate>,
    pub errors: Vec<DiscoveryError>,
}

impl Discovery {
    /// Enumerate every registered store once.
    ///
    /// Candidates with the same (kind, id) are kept once. Display names that
    /// collide across PathSpecs get the id appended so the picker can tell
    /// them apart.
    pub async fn discover(registry: &StoreRegistry) -> Self {
        let mut seen: HashSet<(StoreKind, String)> = HashSet::new();
        let mut discovery = Discovery::default();

        let mut stream = registry.enumerate_all();
        while let Some(item) = stream.next().await {
            match item {
                Ok(candidate) => {
                    if seen.insert((candidate.kind, candidate.id.clone())) {
                        discovery.candidates.push(candidate);
                    }
                }
                Err(err) => {
                    tracing::warn!(path_spec = %err.path_spec, "{}", err.cause);
                    discovery.errors.push(err);
                }
            }
        }

        disambiguate_display_names(&mut discovery.candidates);
        tracing::info!(
            "Discovered {} kubeconfig(s), {} store error(s)",
            discovery.candidates.len(),
            discovery.errors.len()
        );
        discovery
    }

    /// The candidates, or `NoCandidates` carrying every recorded error.
    pub fn into_candidates(self) -> Result<(Vec<Candidate>, Vec<DiscoveryError>), SwitchError> {
        if self.candidates.is_empty() {
            return Err(SwitchError::NoCandidates {
                errors: self.errors,
            });
        }
        Ok((self.candidates, self.errors))
    }
}

fn disambiguate_display_names(candidates: &mut [Candidate]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for candidate in candidates.iter() {
        *counts.entry(candidate.display_name.clone()).or_default() += 1;
    }
    for candidate in candidates.iter_mut() {
        if counts.get(&candidate.display_name).copied().unwrap_or(0) > 1 {
            candidate.display_name = format!("{} ({})", candidate.display_name, candidate.id);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Selected(Candidate),
    /// Operator aborted. Not an error.
    Aborted,
}

/// Presents the snapshot and returns the operator's choice.
#[async_trait]
pub trait Picker: Send {
    async fn select(
        &mut self,
        candidates: &[Candidate],
        previewer: &mut Previewer<'_>,
    ) -> io::Result<Selection>;
}

/// Lazy preview fetcher. Each candidate is fetched at most once per session.
pub struct Previewer<'a> {
    registry: &'a StoreRegistry,
    enabled: bool,
    cache: HashMap<(StoreKind, String), String>,
}

impl<'a> Previewer<'a> {
    pub fn new(registry: &'a StoreRegistry, enabled: bool) -> Self {
        Self {
            registry,
            enabled,
            cache: HashMap::new(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Preview text for a candidate. Fetch failures render inline.
    pub async fn preview(&mut self, candidate: &Candidate) -> String {
        if !self.enabled {
            return "Preview disabled (--show-preview=false)".to_string();
        }

        let key = (candidate.kind, candidate.id.clone());
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        let rendered = match self.registry.fetch(candidate).await {
            Ok(kubeconfig) => render_preview(&kubeconfig.content),
            Err(err) => {
                tracing::debug!(id = %candidate.id, "Preview failed: {}", err.cause);
                format!("failed to load preview: {}", err.cause)
            }
        };
        self.cache.insert(key, rendered.clone());
        rendered
    }

    pub fn cached(&self, candidate: &Candidate) -> Option<&str> {
        self.cache
            .get(&(candidate.kind, candidate.id.clone()))
            .map(String::as_str)
    }
}

fn render_preview(content: &[u8]) -> String {
    let text = String::from_utf8_lossy(content);
    let mut lines = text.lines();
    let mut out = lines
        .by_ref()
        .take(PREVIEW_MAX_LINES)
        .collect::<Vec<_>>()
        .join("\n");
    let remaining = lines.count();
    if remaining > 0 {
        out.push_str(&format!("\n... ({} more lines)", remaining));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::registry::tests::CountingFactory;
    use crate::store::{NameFilter, PathSpec};
    use std::collections::HashMap;

    fn registry_with(contents: &[(&str, &str)], failing: Vec<StoreKind>) -> StoreRegistry {
        let contents: HashMap<_, _> = contents
            .iter()
            .map(|(id, c)| (id.to_string(), c.as_bytes().to_vec()))
            .collect();
        let factory = CountingFactory {
            contents,
            failing_kinds: failing,
            ..CountingFactory::default()
        };
        StoreRegistry::new(Box::new(factory))
    }

    fn spec(location: &str, kind: StoreKind) -> PathSpec {
        PathSpec::new(location, kind, NameFilter::new("*").unwrap())
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_other_candidates() {
        let mut registry = registry_with(&[("/fs/a", "a"), ("/fs/b", "b")], vec![StoreKind::Vault]);
        registry.register(spec("secret", StoreKind::Vault)).unwrap();
        registry.register(spec("/fs", StoreKind::Filesystem)).unwrap();

        let discovery = Discovery::discover(&registry).await;
        assert_eq!(discovery.candidates.len(), 2);
        assert_eq!(discovery.errors.len(), 1);
        assert_eq!(discovery.errors[0].path_spec.kind, StoreKind::Vault);
        assert!(discovery.into_candidates().is_ok());
    }

    #[tokio::test]
    async fn test_all_failed_is_no_candidates() {
        let mut registry = registry_with(&[], vec![StoreKind::Vault]);
        registry.register(spec("secret", StoreKind::Vault)).unwrap();

        let err = Discovery::discover(&registry).await.into_candidates().unwrap_err();
        match err {
            SwitchError::NoCandidates { errors } => assert_eq!(errors.len(), 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_display_names_are_disambiguated() {
        let mut candidates = vec![
            Candidate {
                id: "/a/config".to_string(),
                kind: StoreKind::Filesystem,
                display_name: "config".to_string(),
            },
            Candidate {
                id: "/b/config".to_string(),
                kind: StoreKind::Filesystem,
                display_name: "config".to_string(),
            },
            Candidate {
                id: "/c/dev".to_string(),
                kind: StoreKind::Filesystem,
                display_name: "dev".to_string(),
            },
        ];
        disambiguate_display_names(&mut candidates);
        assert_eq!(candidates[0].display_name, "config (/a/config)");
        assert_eq!(candidates[1].display_name, "config (/b/config)");
        assert_eq!(candidates[2].display_name, "dev");
    }

    #[tokio::test]
    async fn test_preview_is_cached_and_failures_are_inline() {
        let mut registry = registry_with(&[("/fs/a", "line1\nline2")], vec![]);
        registry.register(spec("/fs", StoreKind::Filesystem)).unwrap();

        let mut previewer = Previewer::new(&registry, true);
        let good = Candidate {
            id: "/fs/a".to_string(),
            kind: StoreKind::Filesystem,
            display_name: "a".to_string(),
        };
        assert_eq!(previewer.preview(&good).await, "line1\nline2");
        assert_eq!(previewer.cached(&good), Some("line1\nline2"));

        let missing = Candidate {
            id: "/fs/missing".to_string(),
            ..good.clone()
        };
        assert!(previewer.preview(&missing).await.starts_with("failed to load preview"));
    }

    #[tokio::test]
    async fn test_disabled_preview_never_fetches() {
        let registry = registry_with(&[], vec![]);
        let mut previewer = Previewer::new(&registry, false);
        let candidate = Candidate {
            id: "/fs/a".to_string(),
            kind: StoreKind::Filesystem,
            display_name: "a".to_string(),
        };
        assert!(previewer.preview(&candidate).await.contains("disabled"));
        assert!(previewer.cached(&candidate).is_none());
    }

    #[test]
    fn test_preview_truncates_long_content() {
        let content: String = (0..PREVIEW_MAX_LINES + 5).map(|i| format!("line{}\n", i)).collect();
        let rendered = render_preview(content.as_bytes());
        assert!(rendered.ends_with("... (5 more lines)"));
    }
}
