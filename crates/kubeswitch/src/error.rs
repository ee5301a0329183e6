//! Error types for the switch flow

use crate::materialize::MaterializeError;
use crate::store::PathSpec;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Bad or missing configuration. Always fatal, raised before any discovery.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("unknown store '{0}' (expected 'filesystem' or 'vault')")]
    UnknownStoreKind(String),

    #[error("invalid kubeconfig name filter '{pattern}': {message}")]
    InvalidNameFilter { pattern: String, message: String },

    #[error("empty path configured for the {0} store")]
    EmptyLocation(String),

    #[error("cannot expand '~': home directory is unknown")]
    NoHomeDirectory,

    #[error("the Vault store needs an API address (--vault-api-address, VAULT_ADDR or vaultAPIAddress in the config file)")]
    MissingVaultAddress,

    #[error("the Vault store needs a token (VAULT_TOKEN or the token file {token_file})")]
    MissingVaultToken { token_file: String },

    #[error("failed to create Vault client: {0}")]
    VaultClient(String),

    #[error("invalid hook '{name}': {message}")]
    InvalidHook { name: String, message: String },

    #[error("no hook named '{0}' is configured")]
    UnknownHook(String),
}

/// One PathSpec failed to enumerate. Recovered: other PathSpecs keep going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("discovery failed for {path_spec}: {cause}")]
pub struct DiscoveryError {
    pub path_spec: PathSpec,
    pub cause: String,
}

impl DiscoveryError {
    pub fn new(path_spec: &PathSpec, cause: impl Into<String>) -> Self {
        Self {
            path_spec: path_spec.clone(),
            cause: cause.into(),
        }
    }
}

/// Content of a candidate could not be fetched.
#[derive(Error, Debug, Clone)]
#[error("failed to fetch kubeconfig '{id}': {cause}")]
pub struct FetchError {
    pub id: String,
    pub cause: String,
}

impl FetchError {
    pub fn new(id: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cause: cause.into(),
        }
    }
}

/// Fatal outcomes of the switch flow.
#[derive(Error, Debug)]
pub enum SwitchError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("no kubeconfig files found ({} store error(s))", .errors.len())]
    NoCandidates { errors: Vec<DiscoveryError> },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error("picker failed: {0}")]
    Picker(#[source] io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SwitchError>;
