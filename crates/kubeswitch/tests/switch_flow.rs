//! End-to-end switch flow against real directories and a mocked Vault.

use async_trait::async_trait;
use kubeswitch::store::{DefaultStoreFactory, StoreFactory, VaultStore};
use kubeswitch::{
    run_switch, Candidate, ConfigurationError, Discovery, Environment, KubeconfigStore, Materializer,
    Picker, Previewer, Selection, StoreKind, StoreRegistry, SwitchConfig, SwitchError, SwitchOptions,
    SwitchOutcome, SwitchSettings,
};
use kubeswitch_vault::{SecretData, SecretReader, VaultError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct ScriptedPicker {
    choose: Option<String>,
    offered: Vec<String>,
}

impl ScriptedPicker {
    fn choosing(name: &str) -> Self {
        Self {
            choose: Some(name.to_string()),
            offered: Vec::new(),
        }
    }

    fn aborting() -> Self {
        Self {
            choose: None,
            offered: Vec::new(),
        }
    }
}

#[async_trait]
impl Picker for ScriptedPicker {
    async fn select(
        &mut self,
        candidates: &[Candidate],
        _previewer: &mut Previewer<'_>,
    ) -> io::Result<Selection> {
        self.offered = candidates.iter().map(|c| c.display_name.clone()).collect();
        match &self.choose {
            None => Ok(Selection::Aborted),
            Some(name) => candidates
                .iter()
                .find(|c| &c.display_name == name)
                .cloned()
                .map(Selection::Selected)
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, name.clone())),
        }
    }
}

/// Secret reader whose every call fails like an unreachable server.
struct UnreachableVault;

#[async_trait]
impl SecretReader for UnreachableVault {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, VaultError> {
        Err(VaultError::Timeout {
            url: format!("http://vault.invalid/v1/{}", prefix),
        })
    }

    async fn read(&self, key: &str) -> Result<Option<SecretData>, VaultError> {
        Err(VaultError::Timeout {
            url: format!("http://vault.invalid/v1/{}", key),
        })
    }
}

/// Real filesystem store, Vault store over [`UnreachableVault`].
struct BrokenVaultFactory;

impl StoreFactory for BrokenVaultFactory {
    fn create(&self, kind: StoreKind) -> Result<Box<dyn KubeconfigStore>, ConfigurationError> {
        match kind {
            StoreKind::Filesystem => DefaultStoreFactory::default().create(kind),
            StoreKind::Vault => Ok(Box::new(VaultStore::new(
                Arc::new(UnreachableVault),
                Duration::from_secs(1),
            ))),
        }
    }
}

fn touch(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn environment(temp: &TempDir) -> Environment {
    Environment {
        home: Some(temp.path().to_path_buf()),
        cwd: temp.path().to_path_buf(),
        switch_home: temp.path().join(".kube"),
        vault_addr: None,
        vault_token: Some("test-token".to_string()),
        vault_token_file: None,
    }
}

fn settings_from_yaml(temp: &TempDir, yaml: &str) -> SwitchSettings {
    let config_path = temp.path().join("switch-config.yaml");
    fs::write(&config_path, yaml).unwrap();
    let config = SwitchConfig::load(&config_path).unwrap();
    SwitchSettings::resolve(&SwitchOptions::default(), &config, &environment(temp)).unwrap()
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn filter_matches_leaf_names_in_nested_directories() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("clusters");
    touch(&root, "a/config", "a");
    touch(&root, "a/b/config", "b");
    touch(&root, "a/other.yaml", "other");

    let settings = settings_from_yaml(
        &temp,
        &format!("kubeconfigPaths:\n  - path: {}\n    store: filesystem\n", root.display()),
    );
    let mut registry = StoreRegistry::new(Box::new(DefaultStoreFactory::default()));
    registry.register_all(settings.path_specs.clone()).unwrap();

    let discovery = Discovery::discover(&registry).await;
    let mut names: Vec<_> = discovery.candidates.iter().map(|c| c.display_name.clone()).collect();
    names.sort();
    assert_eq!(names, vec!["a/b/config", "a/config"]);
    assert!(discovery.errors.is_empty());
}

#[tokio::test]
async fn vault_failure_does_not_hide_filesystem_candidates() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("clusters");
    touch(&root, "dev/config", "dev-content");

    let settings = settings_from_yaml(
        &temp,
        &format!(
            "vaultAPIAddress: http://vault.invalid:8200\nkubeconfigPaths:\n  - path: secret/kube\n    store: vault\n  - path: {}\n",
            root.display()
        ),
    );
    assert!(settings.vault.is_some());

    let mut picker = ScriptedPicker::choosing("dev/config");
    let outcome = run_switch(&settings, Box::new(BrokenVaultFactory), &mut picker)
        .await
        .unwrap();

    assert_eq!(picker.offered, vec!["dev/config"]);
    let SwitchOutcome::Switched { active, warnings } = outcome else {
        panic!("expected a switch");
    };
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].path_spec.kind, StoreKind::Vault);
    assert!(warnings[0].cause.contains("http://vault.invalid/v1/secret/kube"));
    assert_eq!(fs::read_to_string(&active.temp_file_path).unwrap(), "dev-content");
    assert!(active.temp_file_path.starts_with(temp.path().join(".kube/switch_tmp")));
}

#[tokio::test]
async fn all_stores_failing_reports_every_error() {
    let temp = TempDir::new().unwrap();
    let settings = settings_from_yaml(
        &temp,
        "vaultAPIAddress: http://vault.invalid:8200\nkubeconfigPaths:\n  - path: secret/a\n    store: vault\n  - path: secret/b\n    store: vault\n",
    );

    let mut picker = ScriptedPicker::aborting();
    let err = run_switch(&settings, Box::new(BrokenVaultFactory), &mut picker)
        .await
        .unwrap_err();
    match err {
        SwitchError::NoCandidates { errors } => assert_eq!(errors.len(), 2),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn abort_is_clean_and_writes_nothing() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), ".kube/config", "default");

    let settings = settings_from_yaml(&temp, "");
    let mut picker = ScriptedPicker::aborting();
    let outcome = run_switch(&settings, Box::new(DefaultStoreFactory::default()), &mut picker)
        .await
        .unwrap();

    assert_eq!(outcome, SwitchOutcome::Aborted);
    assert_eq!(picker.offered.len(), 1);
    assert!(files_in(&settings.tmp_dir).is_empty());
}

#[tokio::test]
async fn clean_removes_every_materialized_file() {
    let temp = TempDir::new().unwrap();
    touch(temp.path(), ".kube/config", "default");
    let settings = settings_from_yaml(&temp, "");

    for _ in 0..3 {
        let mut picker = ScriptedPicker::choosing(&settings.path_specs[0].location);
        let outcome = run_switch(&settings, Box::new(DefaultStoreFactory::default()), &mut picker)
            .await
            .unwrap();
        assert!(matches!(outcome, SwitchOutcome::Switched { .. }));
    }
    assert_eq!(files_in(&settings.tmp_dir).len(), 3);

    let materializer = Materializer::new(&settings.tmp_dir);
    assert_eq!(materializer.clean().unwrap(), 3);
    assert!(files_in(&settings.tmp_dir).is_empty());
    assert_eq!(materializer.clean().unwrap(), 0);
}

#[tokio::test]
async fn vault_store_end_to_end_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/kube"))
        .and(query_param("list", "true"))
        .and(header("X-Vault-Token", "test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "keys": ["dev", "prod", "nested/"] }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/secret/kube/prod"))
        .and(header("X-Vault-Token", "test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "config": "apiVersion: v1\nkind: Config\n" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut settings = settings_from_yaml(
        &temp,
        &format!(
            "vaultAPIAddress: {}\nkubeconfigPaths:\n  - path: /secret/kube/\n    store: vault\n    kubeconfigName: \"*\"\n",
            server.uri()
        ),
    );
    settings.show_preview = false;
    let vault = settings.vault.clone().unwrap();
    assert_eq!(vault.address, server.uri());
    assert_eq!(vault.token, "test-token");
    let factory = DefaultStoreFactory::new(Some(vault));

    let mut picker = ScriptedPicker::choosing("secret/kube/prod");
    let outcome = run_switch(&settings, Box::new(factory), &mut picker)
        .await
        .unwrap();

    assert_eq!(picker.offered, vec!["secret/kube/dev", "secret/kube/prod"]);
    let SwitchOutcome::Switched { active, warnings } = outcome else {
        panic!("expected a switch");
    };
    assert!(warnings.is_empty());
    assert_eq!(active.source_candidate_id, "secret/kube/prod");
    assert_eq!(
        fs::read_to_string(&active.temp_file_path).unwrap(),
        "apiVersion: v1\nkind: Config\n"
    );
}
