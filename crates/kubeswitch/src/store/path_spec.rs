//! PathSpec resolution
//!
//! Turns configured search roots (config file entries plus at most one
//! command-line override) into typed, normalized PathSpecs.

use super::name_filter::NameFilter;
use super::StoreKind;
use crate::config::{Environment, KubeconfigPathEntry};
use crate::error::ConfigurationError;
use std::fmt;
use std::path::{Path, PathBuf};

/// One configured search root. Immutable after resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathSpec {
    /// Absolute directory/file path, or a Vault key prefix without slashes.
    pub location: String,
    pub kind: StoreKind,
    pub name_filter: NameFilter,
}

impl PathSpec {
    pub fn new(location: impl Into<String>, kind: StoreKind, name_filter: NameFilter) -> Self {
        Self {
            location: location.into(),
            kind,
            name_filter,
        }
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.location)
    }
}

/// Resolve config entries plus an optional override into PathSpecs.
///
/// Entries without their own `kubeconfigName` use `default_name`. Exact
/// duplicates are dropped; order of first appearance is kept.
pub fn resolve_path_specs(
    entries: &[KubeconfigPathEntry],
    cli_override: Option<&KubeconfigPathEntry>,
    default_name: &str,
    env: &Environment,
) -> Result<Vec<PathSpec>, ConfigurationError> {
    let mut specs: Vec<PathSpec> = Vec::new();

    for entry in entries.iter().chain(cli_override) {
        let spec = resolve_entry(entry, default_name, env)?;
        if specs.contains(&spec) {
            tracing::debug!(path_spec = %spec, "Skipping duplicate path spec");
            continue;
        }
        specs.push(spec);
    }

    Ok(specs)
}

fn resolve_entry(
    entry: &KubeconfigPathEntry,
    default_name: &str,
    env: &Environment,
) -> Result<PathSpec, ConfigurationError> {
    let kind: StoreKind = entry.store.parse()?;

    let pattern = entry.kubeconfig_name.as_deref().unwrap_or(default_name);
    let name_filter =
        NameFilter::new(pattern).map_err(|message| ConfigurationError::InvalidNameFilter {
            pattern: pattern.to_string(),
            message,
        })?;

    let location = match kind {
        StoreKind::Filesystem => normalize_filesystem_location(&entry.path, env)?,
        StoreKind::Vault => normalize_vault_prefix(&entry.path)?,
    };

    Ok(PathSpec::new(location, kind, name_filter))
}

fn normalize_filesystem_location(raw: &str, env: &Environment) -> Result<String, ConfigurationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ConfigurationError::EmptyLocation(StoreKind::Filesystem.to_string()));
    }

    let expanded: PathBuf = if raw == "~" || raw.starts_with("~/") {
        let home = env.home.as_ref().ok_or(ConfigurationError::NoHomeDirectory)?;
        home.join(raw.trim_start_matches('~').trim_start_matches('/'))
    } else {
        PathBuf::from(raw)
    };

    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        env.cwd.join(expanded)
    };

    Ok(strip_trailing_separator(&absolute))
}

fn strip_trailing_separator(path: &Path) -> String {
    // `components()` drops trailing separators and `.` segments.
    path.components()
        .collect::<PathBuf>()
        .to_string_lossy()
        .to_string()
}

fn normalize_vault_prefix(raw: &str) -> Result<String, ConfigurationError> {
    let prefix = raw.trim().trim_matches('/');
    if prefix.is_empty() {
        return Err(ConfigurationError::EmptyLocation(StoreKind::Vault.to_string()));
    }
    Ok(prefix.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Environment {
        Environment {
            home: Some(PathBuf::from("/home/op")),
            cwd: PathBuf::from("/work"),
            ..Environment::default()
        }
    }

    fn entry(path: &str, store: &str) -> KubeconfigPathEntry {
        KubeconfigPathEntry {
            path: path.to_string(),
            store: store.to_string(),
            kubeconfig_name: None,
        }
    }

    #[test]
    fn expands_home_and_relative_paths() {
        let specs = resolve_path_specs(
            &[entry("~/.kube/static", "filesystem"), entry("clusters/", "filesystem")],
            None,
            "config",
            &env(),
        )
        .unwrap();

        assert_eq!(specs[0].location, "/home/op/.kube/static");
        assert_eq!(specs[1].location, "/work/clusters");
        assert_eq!(specs[1].name_filter.pattern(), "config");
    }

    #[test]
    fn trims_vault_prefix() {
        let specs =
            resolve_path_specs(&[entry("/secret/kube/", "vault")], None, "*", &env()).unwrap();
        assert_eq!(specs[0].location, "secret/kube");
        assert_eq!(specs[0].kind, StoreKind::Vault);
    }

    #[test]
    fn override_is_appended_and_duplicates_dropped() {
        let configured = [entry("/a", "filesystem"), entry("/a/", "filesystem")];
        let cli = entry("secret/kube", "vault");
        let specs = resolve_path_specs(&configured, Some(&cli), "config", &env()).unwrap();

        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].to_string(), "filesystem:/a");
        assert_eq!(specs[1].to_string(), "vault:secret/kube");
    }

    #[test]
    fn per_entry_filter_wins_over_default() {
        let mut e = entry("/a", "filesystem");
        e.kubeconfig_name = Some("*.yaml".to_string());
        let specs = resolve_path_specs(&[e], None, "config", &env()).unwrap();
        assert_eq!(specs[0].name_filter.pattern(), "*.yaml");
    }

    #[test]
    fn unknown_store_is_configuration_error() {
        let err = resolve_path_specs(&[entry("/a", "s3")], None, "config", &env()).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownStoreKind(kind) if kind == "s3"));
    }

    #[test]
    fn invalid_filter_is_configuration_error() {
        let err = resolve_path_specs(&[entry("/a", "filesystem")], None, "[", &env()).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidNameFilter { .. }));
    }

    #[test]
    fn tilde_without_home_fails() {
        let env = Environment {
            home: None,
            ..env()
        };
        let err = resolve_path_specs(&[entry("~/x", "filesystem")], None, "config", &env)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::NoHomeDirectory));
    }
}
