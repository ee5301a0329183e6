//! CLI command implementations for kubeswitch

pub mod clean;
pub mod error;
pub mod hooks;
pub mod picker;
pub mod switch;

use std::path::{Path, PathBuf};

/// Config file from `--config-path`, else `<home>/switch-config.yaml`.
pub fn config_path(flag: Option<&Path>) -> PathBuf {
    flag.map(Path::to_path_buf)
        .unwrap_or_else(kubeswitch::paths::default_config_path)
}
