//! Store registry
//!
//! Holds at most one store per [`StoreKind`]. The first PathSpec of a kind
//! constructs the store through the [`StoreFactory`]; later PathSpecs of the
//! same kind are attached to that instance.

use super::{Candidate, CandidateStream, FilesystemStore, Kubeconfig, KubeconfigStore, PathSpec, StoreKind, VaultStore};
use crate::config::VaultSettings;
use crate::error::{ConfigurationError, FetchError};
use futures::stream::{self, StreamExt};
use kubeswitch_vault::VaultClient;
use std::sync::Arc;

/// Builds a store instance for a kind.
pub trait StoreFactory: Send + Sync {
    fn create(&self, kind: StoreKind) -> Result<Box<dyn KubeconfigStore>, ConfigurationError>;
}

/// Factory for the real backends.
#[derive(Debug, Clone, Default)]
pub struct DefaultStoreFactory {
    vault: Option<VaultSettings>,
}

impl DefaultStoreFactory {
    pub fn new(vault: Option<VaultSettings>) -> Self {
        Self { vault }
    }
}

impl StoreFactory for DefaultStoreFactory {
    fn create(&self, kind: StoreKind) -> Result<Box<dyn KubeconfigStore>, ConfigurationError> {
        match kind {
            StoreKind::Filesystem => Ok(Box::new(FilesystemStore::new())),
            StoreKind::Vault => {
                let settings = self
                    .vault
                    .as_ref()
                    .ok_or(ConfigurationError::MissingVaultAddress)?;
                let client = VaultClient::new(&settings.address, &settings.token, settings.timeout)
                    .map_err(|e| ConfigurationError::VaultClient(e.to_string()))?;
                tracing::info!(store = "vault", address = %client.address(), "Created Vault client");
                Ok(Box::new(VaultStore::new(Arc::new(client), settings.timeout)))
            }
        }
    }
}

pub struct StoreRegistry {
    factory: Box<dyn StoreFactory>,
    /// In order of first registration.
    stores: Vec<Box<dyn KubeconfigStore>>,
}

impl StoreRegistry {
    pub fn new(factory: Box<dyn StoreFactory>) -> Self {
        Self {
            factory,
            stores: Vec::new(),
        }
    }

    /// Route a PathSpec to the store of its kind, constructing it on first use.
    pub fn register(&mut self, path_spec: PathSpec) -> Result<(), ConfigurationError> {
        if let Some(store) = self.stores.iter_mut().find(|s| s.kind() == path_spec.kind) {
            tracing::debug!(store = %path_spec.kind, path_spec = %path_spec, "Attaching to existing store");
            store.add_path_spec(path_spec);
            return Ok(());
        }

        let mut store = self.factory.create(path_spec.kind)?;
        tracing::debug!(store = %path_spec.kind, path_spec = %path_spec, "Constructed store");
        store.add_path_spec(path_spec);
        self.stores.push(store);
        Ok(())
    }

    pub fn register_all(
        &mut self,
        path_specs: impl IntoIterator<Item = PathSpec>,
    ) -> Result<(), ConfigurationError> {
        for spec in path_specs {
            self.register(spec)?;
        }
        Ok(())
    }

    pub fn kinds(&self) -> Vec<StoreKind> {
        self.stores.iter().map(|s| s.kind()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Concatenate every store's candidates, stores in registration order.
    pub fn enumerate_all(&self) -> CandidateStream<'_> {
        stream::iter(self.stores.iter())
            .flat_map(|store| store.enumerate())
            .boxed()
    }

    /// Fetch through the store owning the candidate's kind.
    pub async fn fetch(&self, candidate: &Candidate) -> Result<Kubeconfig, FetchError> {
        let store = self
            .stores
            .iter()
            .find(|s| s.kind() == candidate.kind)
            .ok_or_else(|| {
                FetchError::new(&candidate.id, format!("no {} store is active", candidate.kind))
            })?;
        store.fetch(&candidate.id).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::DiscoveryError;
    use crate::store::NameFilter;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Store serving a fixed id -> content map for every PathSpec it owns.
    pub(crate) struct StaticStore {
        pub kind: StoreKind,
        pub path_specs: Vec<PathSpec>,
        pub contents: HashMap<String, Vec<u8>>,
        pub fail_enumeration: bool,
    }

    #[async_trait]
    impl KubeconfigStore for StaticStore {
        fn kind(&self) -> StoreKind {
            self.kind
        }

        fn add_path_spec(&mut self, path_spec: PathSpec) {
            self.path_specs.push(path_spec);
        }

        fn path_specs(&self) -> &[PathSpec] {
            &self.path_specs
        }

        fn enumerate(&self) -> CandidateStream<'_> {
            let mut items = Vec::new();
            for spec in &self.path_specs {
                if self.fail_enumeration {
                    items.push(Err(DiscoveryError::new(spec, "connection refused")));
                    continue;
                }
                let mut ids: Vec<_> = self
                    .contents
                    .keys()
                    .filter(|id| id.starts_with(&spec.location))
                    .cloned()
                    .collect();
                ids.sort();
                items.extend(ids.into_iter().map(|id| {
                    Ok(Candidate {
                        display_name: id.clone(),
                        id,
                        kind: self.kind,
                    })
                }));
            }
            stream::iter(items).boxed()
        }

        async fn fetch(&self, id: &str) -> Result<Kubeconfig, FetchError> {
            self.contents
                .get(id)
                .map(|content| Kubeconfig {
                    content: content.clone(),
                    display_name: id.to_string(),
                })
                .ok_or_else(|| FetchError::new(id, "unknown id"))
        }
    }

    /// Factory counting constructions per kind.
    #[derive(Default)]
    pub(crate) struct CountingFactory {
        pub created: Mutex<HashMap<StoreKind, usize>>,
        pub contents: HashMap<String, Vec<u8>>,
        pub failing_kinds: Vec<StoreKind>,
        pub total: AtomicUsize,
    }

    impl StoreFactory for CountingFactory {
        fn create(&self, kind: StoreKind) -> Result<Box<dyn KubeconfigStore>, ConfigurationError> {
            self.total.fetch_add(1, Ordering::SeqCst);
            *self.created.lock().unwrap().entry(kind).or_default() += 1;
            Ok(Box::new(StaticStore {
                kind,
                path_specs: Vec::new(),
                contents: self.contents.clone(),
                fail_enumeration: self.failing_kinds.contains(&kind),
            }))
        }
    }

    impl StoreFactory for Arc<CountingFactory> {
        fn create(&self, kind: StoreKind) -> Result<Box<dyn KubeconfigStore>, ConfigurationError> {
            self.as_ref().create(kind)
        }
    }

    fn spec(location: &str, kind: StoreKind) -> PathSpec {
        PathSpec::new(location, kind, NameFilter::new("*").unwrap())
    }

    #[tokio::test]
    async fn test_one_store_per_kind() {
        let factory = Arc::new(CountingFactory::default());
        let mut registry = StoreRegistry::new(Box::new(factory.clone()));

        registry
            .register_all(vec![
                spec("secret/a", StoreKind::Vault),
                spec("/a", StoreKind::Filesystem),
                spec("secret/b", StoreKind::Vault),
                spec("/b", StoreKind::Filesystem),
                spec("secret/c", StoreKind::Vault),
            ])
            .unwrap();

        let created = factory.created.lock().unwrap();
        assert_eq!(created.get(&StoreKind::Vault), Some(&1));
        assert_eq!(created.get(&StoreKind::Filesystem), Some(&1));
        assert_eq!(factory.total.load(Ordering::SeqCst), 2);
        assert_eq!(registry.kinds(), vec![StoreKind::Vault, StoreKind::Filesystem]);
    }

    #[tokio::test]
    async fn test_enumerate_all_keeps_registration_order() {
        let mut contents = HashMap::new();
        contents.insert("/fs/config".to_string(), b"fs".to_vec());
        contents.insert("secret/dev".to_string(), b"vault".to_vec());
        let factory = CountingFactory {
            contents,
            ..CountingFactory::default()
        };
        let mut registry = StoreRegistry::new(Box::new(factory));
        registry.register(spec("/fs", StoreKind::Filesystem)).unwrap();
        registry.register(spec("secret", StoreKind::Vault)).unwrap();

        let ids: Vec<_> = registry
            .enumerate_all()
            .filter_map(|r| async move { r.ok().map(|c| c.id) })
            .collect()
            .await;
        assert_eq!(ids, vec!["/fs/config", "secret/dev"]);
    }

    #[tokio::test]
    async fn test_fetch_routes_by_kind() {
        let mut contents = HashMap::new();
        contents.insert("/fs/config".to_string(), b"fs".to_vec());
        let factory = CountingFactory {
            contents,
            ..CountingFactory::default()
        };
        let mut registry = StoreRegistry::new(Box::new(factory));
        registry.register(spec("/fs", StoreKind::Filesystem)).unwrap();

        let candidate = Candidate {
            id: "/fs/config".to_string(),
            kind: StoreKind::Filesystem,
            display_name: "config".to_string(),
        };
        assert_eq!(registry.fetch(&candidate).await.unwrap().content, b"fs");

        let vault_candidate = Candidate {
            kind: StoreKind::Vault,
            ..candidate
        };
        let err = registry.fetch(&vault_candidate).await.unwrap_err();
        assert!(err.cause.contains("no vault store"));
    }

    #[test]
    fn test_default_factory_requires_vault_settings() {
        let factory = DefaultStoreFactory::default();
        assert!(factory.create(StoreKind::Filesystem).is_ok());
        assert!(matches!(
            factory.create(StoreKind::Vault),
            Err(ConfigurationError::MissingVaultAddress)
        ));
    }
}
