//! Filesystem kubeconfig store
//!
//! A PathSpec location is either a single file or a directory that is walked
//! recursively. Symlinks are followed, but every directory is entered at most
//! once (by canonical path) and the walk stops at [`MAX_WALK_DEPTH`].

use super::{unique_ids, Candidate, CandidateStream, Kubeconfig, KubeconfigStore, PathSpec, StoreKind};
use crate::error::{DiscoveryError, FetchError};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Maximum directory depth below a PathSpec root.
pub const MAX_WALK_DEPTH: usize = 8;

/// Normalize a relative path to forward slashes for display.
fn normalize_path_to_forward_slashes(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Debug, Default)]
pub struct FilesystemStore {
    path_specs: Vec<PathSpec>,
}

impl FilesystemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The PathSpec a path was enumerated from, if any.
    fn owning_spec(&self, path: &Path) -> Option<&PathSpec> {
        self.path_specs
            .iter()
            .find(|spec| path.starts_with(Path::new(&spec.location)))
    }
}

type WalkItems<'a> = Box<dyn Iterator<Item = Result<Candidate, DiscoveryError>> + Send + 'a>;

/// Lazily walk one PathSpec.
fn walk_path_spec(spec: &PathSpec) -> WalkItems<'_> {
    let root = PathBuf::from(&spec.location);

    let metadata = match fs::metadata(&root) {
        Ok(metadata) => metadata,
        Err(err) => {
            return Box::new(std::iter::once(Err(DiscoveryError::new(
                spec,
                format!("cannot access {}: {}", root.display(), err),
            ))))
        }
    };

    if metadata.is_file() {
        let matches = root
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| spec.name_filter.matches(name))
            .unwrap_or(false);
        if !matches {
            return Box::new(std::iter::empty());
        }
        return Box::new(std::iter::once(Ok(Candidate {
            id: spec.location.clone(),
            kind: StoreKind::Filesystem,
            display_name: spec.location.clone(),
        })));
    }

    let mut visited_dirs: HashSet<PathBuf> = HashSet::new();
    let walker = WalkDir::new(&root)
        .follow_links(true)
        .max_depth(MAX_WALK_DEPTH)
        .into_iter()
        .filter_entry(move |entry| enter_once(entry, &mut visited_dirs));

    Box::new(walker.filter_map(move |entry| match entry {
        Ok(entry) => candidate_for_entry(spec, &root, &entry).map(Ok),
        Err(err) if err.loop_ancestor().is_some() => {
            tracing::debug!(path_spec = %spec, "Not following symlink cycle: {}", err);
            None
        }
        Err(err) => {
            let path = err
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| root.display().to_string());
            tracing::warn!(path_spec = %spec, "Skipping {}: {}", path, err);
            Some(Err(DiscoveryError::new(spec, format!("{}: {}", path, err))))
        }
    }))
}

/// Allow a directory into the walk only the first time its canonical path is seen.
fn enter_once(entry: &DirEntry, visited_dirs: &mut HashSet<PathBuf>) -> bool {
    if !entry.file_type().is_dir() {
        return true;
    }
    match fs::canonicalize(entry.path()) {
        Ok(canonical) => {
            let first_visit = visited_dirs.insert(canonical);
            if !first_visit {
                tracing::debug!("Skipping already visited directory {}", entry.path().display());
            }
            first_visit
        }
        Err(_) => true,
    }
}

fn candidate_for_entry(spec: &PathSpec, root: &Path, entry: &DirEntry) -> Option<Candidate> {
    if !entry.file_type().is_file() {
        return None;
    }
    let name = entry.file_name().to_str()?;
    if !spec.name_filter.matches(name) {
        return None;
    }
    Some(Candidate {
        id: entry.path().to_string_lossy().to_string(),
        kind: StoreKind::Filesystem,
        display_name: display_name_for(root, entry.path()),
    })
}

fn display_name_for(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) if !relative.as_os_str().is_empty() => {
            normalize_path_to_forward_slashes(relative)
        }
        _ => path.to_string_lossy().to_string(),
    }
}

#[async_trait]
impl KubeconfigStore for FilesystemStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Filesystem
    }

    fn add_path_spec(&mut self, path_spec: PathSpec) {
        self.path_specs.push(path_spec);
    }

    fn path_specs(&self) -> &[PathSpec] {
        &self.path_specs
    }

    fn enumerate(&self) -> CandidateStream<'_> {
        let items = self.path_specs.iter().flat_map(walk_path_spec);
        unique_ids(stream::iter(items).boxed())
    }

    async fn fetch(&self, id: &str) -> Result<Kubeconfig, FetchError> {
        let path = Path::new(id);
        let spec = self
            .owning_spec(path)
            .ok_or_else(|| FetchError::new(id, "not below any configured filesystem path"))?;

        let content = tokio::fs::read(path)
            .await
            .map_err(|err| FetchError::new(id, err.to_string()))?;

        let display_name = if spec.location == id {
            id.to_string()
        } else {
            display_name_for(Path::new(&spec.location), path)
        };

        Ok(Kubeconfig {
            content,
            display_name,
        })
    }
}
