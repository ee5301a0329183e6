//! Switch configuration
//!
//! Three inputs feed one immutable settings value:
//! - the YAML config file (`switch-config.yaml`)
//! - command-line options ([`SwitchOptions`], [`HookOptions`])
//! - the process environment ([`Environment`])
//!
//! Precedence chains are evaluated once here; nothing downstream reads the
//! environment again.

use crate::error::ConfigurationError;
use crate::hooks::{Hook, HookDefinition};
use crate::paths::VAULT_TOKEN_FILE_NAME;
use crate::store::{resolve_path_specs, PathSpec, StoreKind};
use kubeswitch_vault::DEFAULT_REQUEST_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name filter used when neither the command line nor the config sets one.
pub const DEFAULT_KUBECONFIG_NAME: &str = "config";

/// Contents of `switch-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(rename = "vaultAPIAddress", default, skip_serializing_if = "Option::is_none")]
    pub vault_api_address: Option<String>,

    /// Default name filter for entries without their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig_name: Option<String>,

    #[serde(default)]
    pub kubeconfig_paths: Vec<KubeconfigPathEntry>,

    #[serde(default)]
    pub hooks: Vec<HookDefinition>,
}

impl SwitchConfig {
    /// Load the config file. A missing file is an empty configuration.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No config file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigurationError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&contents, path)
    }

    pub fn parse(contents: &str, path: &Path) -> Result<Self, ConfigurationError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents).map_err(|e| ConfigurationError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// One `kubeconfigPaths` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeconfigPathEntry {
    pub path: String,
    #[serde(default = "default_store")]
    pub store: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig_name: Option<String>,
}

fn default_store() -> String {
    StoreKind::Filesystem.to_string()
}

/// Raw switch options as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchOptions {
    pub kubeconfig_path: Option<String>,
    /// Store kind of `kubeconfig_path`.
    pub store: String,
    pub kubeconfig_name: Option<String>,
    pub show_preview: bool,
    pub vault_api_address: Option<String>,
}

impl Default for SwitchOptions {
    fn default() -> Self {
        Self {
            kubeconfig_path: None,
            store: default_store(),
            kubeconfig_name: None,
            show_preview: true,
            vault_api_address: None,
        }
    }
}

/// Raw hook options as given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookOptions {
    pub hook_name: Option<String>,
    pub run_immediately: bool,
    pub state_directory: Option<PathBuf>,
}

/// Snapshot of the process environment relevant to configuration.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Operator home directory, used for `~` expansion.
    pub home: Option<PathBuf>,
    pub cwd: PathBuf,
    /// kubeswitch home (`$KUBESWITCH_HOME` or `~/.kube`).
    pub switch_home: PathBuf,
    pub vault_addr: Option<String>,
    pub vault_token: Option<String>,
    pub vault_token_file: Option<PathBuf>,
}

impl Environment {
    pub fn from_process() -> Self {
        Self {
            home: dirs::home_dir(),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            switch_home: crate::paths::kubeswitch_home(),
            vault_addr: non_empty_var("VAULT_ADDR"),
            vault_token: non_empty_var("VAULT_TOKEN"),
            vault_token_file: crate::paths::vault_token_file(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Connection settings for the Vault store.
#[derive(Clone, PartialEq, Eq)]
pub struct VaultSettings {
    pub address: String,
    pub token: String,
    pub timeout: Duration,
}

impl fmt::Debug for VaultSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultSettings")
            .field("address", &self.address)
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Everything the switch flow needs, resolved once.
#[derive(Debug, Clone)]
pub struct SwitchSettings {
    pub path_specs: Vec<PathSpec>,
    /// Present only when a Vault PathSpec is configured.
    pub vault: Option<VaultSettings>,
    pub show_preview: bool,
    pub tmp_dir: PathBuf,
}

impl SwitchSettings {
    pub fn resolve(
        options: &SwitchOptions,
        config: &SwitchConfig,
        env: &Environment,
    ) -> Result<Self, ConfigurationError> {
        let default_name = options
            .kubeconfig_name
            .as_deref()
            .or(config.kubeconfig_name.as_deref())
            .unwrap_or(DEFAULT_KUBECONFIG_NAME);

        let cli_override = options.kubeconfig_path.as_ref().map(|path| KubeconfigPathEntry {
            path: path.clone(),
            store: options.store.clone(),
            kubeconfig_name: None,
        });

        let mut path_specs = resolve_path_specs(
            &config.kubeconfig_paths,
            cli_override.as_ref(),
            default_name,
            env,
        )?;

        if path_specs.is_empty() {
            let fallback = KubeconfigPathEntry {
                path: env.switch_home.join("config").to_string_lossy().to_string(),
                store: default_store(),
                kubeconfig_name: None,
            };
            tracing::debug!("No kubeconfig paths configured, falling back to {}", fallback.path);
            path_specs = resolve_path_specs(&[fallback], None, default_name, env)?;
        }

        let vault = if path_specs.iter().any(|s| s.kind == StoreKind::Vault) {
            Some(VaultSettings {
                address: resolve_vault_address(options, config, env)?,
                token: resolve_vault_token(env)?,
                timeout: DEFAULT_REQUEST_TIMEOUT,
            })
        } else {
            None
        };

        Ok(Self {
            path_specs,
            vault,
            show_preview: options.show_preview,
            tmp_dir: env.switch_home.join("switch_tmp"),
        })
    }
}

/// flag > VAULT_ADDR > config file
pub fn resolve_vault_address(
    options: &SwitchOptions,
    config: &SwitchConfig,
    env: &Environment,
) -> Result<String, ConfigurationError> {
    options
        .vault_api_address
        .iter()
        .chain(env.vault_addr.iter())
        .chain(config.vault_api_address.iter())
        .map(|addr| addr.trim())
        .find(|addr| !addr.is_empty())
        .map(str::to_string)
        .ok_or(ConfigurationError::MissingVaultAddress)
}

/// VAULT_TOKEN > token file
pub fn resolve_vault_token(env: &Environment) -> Result<String, ConfigurationError> {
    if let Some(token) = &env.vault_token {
        return Ok(token.clone());
    }

    let missing = || ConfigurationError::MissingVaultToken {
        token_file: env
            .vault_token_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| format!("~/{}", VAULT_TOKEN_FILE_NAME)),
    };

    let Some(path) = &env.vault_token_file else {
        return Err(missing());
    };

    match fs::read_to_string(path) {
        Ok(contents) if !contents.trim().is_empty() => Ok(contents.trim().to_string()),
        Ok(_) => Err(missing()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(missing()),
        Err(source) => Err(ConfigurationError::Read {
            path: path.clone(),
            source,
        }),
    }
}

/// Everything the hook flow needs, resolved once.
#[derive(Debug, Clone)]
pub struct HookSettings {
    /// Hooks selected for this run, in config order.
    pub hooks: Vec<Hook>,
    pub run_immediately: bool,
    pub state_dir: PathBuf,
}

impl HookSettings {
    pub fn resolve(
        options: &HookOptions,
        config: &SwitchConfig,
        env: &Environment,
    ) -> Result<Self, ConfigurationError> {
        let hooks = config
            .hooks
            .iter()
            .map(HookDefinition::resolve)
            .collect::<Result<Vec<_>, _>>()?;

        let hooks = match &options.hook_name {
            Some(name) => {
                let hook = hooks
                    .into_iter()
                    .find(|h| &h.name == name)
                    .ok_or_else(|| ConfigurationError::UnknownHook(name.clone()))?;
                vec![hook]
            }
            None => hooks,
        };

        Ok(Self {
            hooks,
            run_immediately: options.run_immediately,
            state_dir: options
                .state_directory
                .clone()
                .unwrap_or_else(|| env.switch_home.join("switch-state")),
        })
    }
}
