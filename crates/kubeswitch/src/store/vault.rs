//! Vault kubeconfig store
//!
//! Enumeration is exactly one list call per PathSpec; content is only read
//! on `fetch`, one read call per invocation. Keys ending in `/` are
//! sub-folders and are not descended into.

use super::{unique_ids, Candidate, CandidateStream, Kubeconfig, KubeconfigStore, PathSpec, StoreKind};
use crate::error::{DiscoveryError, FetchError};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use kubeswitch_vault::{SecretReader, VaultError};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Secret field holding the kubeconfig.
pub const KUBECONFIG_FIELD: &str = "config";

/// List calls in flight at once across PathSpecs.
const MAX_CONCURRENT_LISTS: usize = 4;

pub struct VaultStore {
    reader: Arc<dyn SecretReader>,
    request_timeout: Duration,
    path_specs: Vec<PathSpec>,
}

impl VaultStore {
    pub fn new(reader: Arc<dyn SecretReader>, request_timeout: Duration) -> Self {
        Self {
            reader,
            request_timeout,
            path_specs: Vec::new(),
        }
    }

    fn owns(&self, id: &str) -> bool {
        self.path_specs
            .iter()
            .any(|spec| id.strip_prefix(&spec.location).is_some_and(|rest| rest.starts_with('/')))
    }

    /// Bound a backend call by the request timeout.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, VaultError>>,
    ) -> Result<T, String> {
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) if err.is_auth_failure() => Err(format!("authentication failed: {}", err)),
            Ok(Err(err)) => Err(err.to_string()),
            Err(_) => Err(format!("timed out after {:?}", self.request_timeout)),
        }
    }
}

fn candidates_from_listing(
    spec: &PathSpec,
    listing: Result<Vec<String>, String>,
) -> Vec<Result<Candidate, DiscoveryError>> {
    let keys = match listing {
        Ok(keys) => keys,
        Err(cause) => {
            tracing::warn!(store = "vault", path_spec = %spec, "Listing failed: {}", cause);
            return vec![Err(DiscoveryError::new(spec, cause))];
        }
    };

    keys.into_iter()
        .filter(|key| {
            if key.ends_with('/') {
                tracing::debug!(path_spec = %spec, "Not descending into folder {}", key);
                return false;
            }
            spec.name_filter.matches(key)
        })
        .map(|key| {
            let id = format!("{}/{}", spec.location, key);
            Ok(Candidate {
                display_name: id.clone(),
                id,
                kind: StoreKind::Vault,
            })
        })
        .collect()
}

#[async_trait]
impl KubeconfigStore for VaultStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Vault
    }

    fn add_path_spec(&mut self, path_spec: PathSpec) {
        self.path_specs.push(path_spec);
    }

    fn path_specs(&self) -> &[PathSpec] {
        &self.path_specs
    }

    fn enumerate(&self) -> CandidateStream<'_> {
        let listings = stream::iter(self.path_specs.iter())
            .map(move |spec| async move {
                let listing = self.bounded(self.reader.list(&spec.location)).await;
                (spec, listing)
            })
            // Ordered: results come back in PathSpec order.
            .buffered(MAX_CONCURRENT_LISTS)
            .flat_map(|(spec, listing)| stream::iter(candidates_from_listing(spec, listing)));

        unique_ids(listings.boxed())
    }

    async fn fetch(&self, id: &str) -> Result<Kubeconfig, FetchError> {
        if !self.owns(id) {
            return Err(FetchError::new(id, "not below any configured Vault path"));
        }

        let secret = self
            .bounded(self.reader.read(id))
            .await
            .map_err(|cause| FetchError::new(id, cause))?
            .ok_or_else(|| FetchError::new(id, "secret does not exist"))?;

        let content = match secret.get(KUBECONFIG_FIELD) {
            Some(serde_json::Value::String(content)) => content.clone().into_bytes(),
            Some(_) => {
                return Err(FetchError::new(
                    id,
                    format!("field '{}' is not a string", KUBECONFIG_FIELD),
                ))
            }
            None => {
                return Err(FetchError::new(
                    id,
                    format!("secret has no '{}' field", KUBECONFIG_FIELD),
                ))
            }
        };

        Ok(Kubeconfig {
            content,
            display_name: id.to_string(),
        })
    }
}
