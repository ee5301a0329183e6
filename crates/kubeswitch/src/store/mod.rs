//! Kubeconfig stores
//!
//! A store enumerates kubeconfig candidates below its PathSpecs and fetches
//! the content of any candidate it produced. One store instance exists per
//! [`StoreKind`]; the [`StoreRegistry`] enforces that.

pub mod filesystem;
pub mod name_filter;
pub mod path_spec;
pub mod registry;
pub mod vault;

pub use filesystem::FilesystemStore;
pub use name_filter::NameFilter;
pub use path_spec::{resolve_path_specs, PathSpec};
pub use registry::{DefaultStoreFactory, StoreFactory, StoreRegistry};
pub use vault::VaultStore;

use crate::error::{ConfigurationError, DiscoveryError, FetchError};
use async_trait::async_trait;
use futures::future;
use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Backend kinds. Closed set: adding one means adding a store implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Filesystem,
    Vault,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Filesystem => "filesystem",
            StoreKind::Vault => "vault",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "filesystem" => Ok(StoreKind::Filesystem),
            "vault" => Ok(StoreKind::Vault),
            other => Err(ConfigurationError::UnknownStoreKind(other.to_string())),
        }
    }
}

/// A discovered kubeconfig, not yet materialized.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    /// Enough for the owning store to re-fetch without re-enumerating.
    pub id: String,
    pub kind: StoreKind,
    pub display_name: String,
}

/// Fetched kubeconfig content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kubeconfig {
    pub content: Vec<u8>,
    pub display_name: String,
}

/// Lazy sequence of candidates. Errors are per-PathSpec and never end the stream.
pub type CandidateStream<'a> = BoxStream<'a, Result<Candidate, DiscoveryError>>;

#[async_trait]
pub trait KubeconfigStore: Send + Sync {
    fn kind(&self) -> StoreKind;

    /// Attach another PathSpec of this store's kind.
    fn add_path_spec(&mut self, path_spec: PathSpec);

    fn path_specs(&self) -> &[PathSpec];

    /// Enumerate candidates below every owned PathSpec, in PathSpec order.
    /// Never yields the same id twice.
    fn enumerate(&self) -> CandidateStream<'_>;

    /// Fetch content and display name of a candidate this store enumerated.
    async fn fetch(&self, id: &str) -> Result<Kubeconfig, FetchError>;
}

/// Drop candidates whose id was already yielded by this stream.
pub(crate) fn unique_ids(stream: CandidateStream<'_>) -> CandidateStream<'_> {
    let mut seen: HashSet<String> = HashSet::new();
    stream
        .filter(move |item| {
            let keep = match item {
                Ok(candidate) => seen.insert(candidate.id.clone()),
                Err(_) => true,
            };
            future::ready(keep)
        })
        .boxed()
}
