//! Vault KV access for kubeswitch
//!
//! Provides:
//! - **SecretReader**: the list/read seam the Vault kubeconfig store talks to
//! - **VaultClient**: raw HTTP implementation against the Vault KV (v1) API

pub mod client;

pub use client::{SecretData, SecretReader, VaultClient, VaultError, DEFAULT_REQUEST_TIMEOUT};
