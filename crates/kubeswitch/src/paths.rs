//! Well-known locations
//!
//! Everything lives under the kubeswitch home (`$KUBESWITCH_HOME` or `~/.kube`).

use std::path::PathBuf;

pub use kubeswitch_logging::kubeswitch_home;

/// File name of the Vault token helper file in the user's home directory.
pub const VAULT_TOKEN_FILE_NAME: &str = ".vault-token";

/// Default switch configuration: ~/.kube/switch-config.yaml
pub fn default_config_path() -> PathBuf {
    kubeswitch_home().join("switch-config.yaml")
}

/// Directory holding materialized kubeconfigs: ~/.kube/switch_tmp
pub fn switch_tmp_dir() -> PathBuf {
    kubeswitch_home().join("switch_tmp")
}

/// Vault token helper file: ~/.vault-token
pub fn vault_token_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(VAULT_TOKEN_FILE_NAME))
}
