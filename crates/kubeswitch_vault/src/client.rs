//! Vault KV client
//!
//! Uses raw HTTP requests (no heavy SDK dependencies). Every call is a single
//! request with a bounded timeout; nothing is retried or prefetched.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fields of a single secret.
pub type SecretData = HashMap<String, serde_json::Value>;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("invalid Vault address '{0}'")]
    InvalidAddress(String),

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Vault returned {status} for {url}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode Vault response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl VaultError {
    /// True for 401/403 responses.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == 401 || *status == 403)
    }
}

/// Authenticated key/value reader over a secret-management service.
#[async_trait]
pub trait SecretReader: Send + Sync {
    /// List the keys directly under `prefix`. Keys ending in `/` are folders.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, VaultError>;

    /// Read one secret. `Ok(None)` when the key does not exist.
    async fn read(&self, key: &str) -> Result<Option<SecretData>, VaultError>;
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    data: ListData,
}

#[derive(Debug, Deserialize)]
struct ListData {
    #[serde(default)]
    keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SecretResponse {
    #[serde(default)]
    data: SecretData,
}

/// Vault HTTP client
pub struct VaultClient {
    address: String,
    token: String,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultClient")
            .field("address", &self.address)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl VaultClient {
    /// Create a client for `address` authenticating with `token`.
    pub fn new(address: &str, token: &str, timeout: Duration) -> Result<Self, VaultError> {
        let address = address.trim().trim_end_matches('/').to_string();
        if !(address.starts_with("http://") || address.starts_with("https://")) {
            return Err(VaultError::InvalidAddress(address));
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| VaultError::Http {
                url: address.clone(),
                source,
            })?;

        Ok(Self {
            address,
            token: token.trim().to_string(),
            http_client,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/v1/{}", self.address, key.trim_matches('/'))
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<reqwest::Response, VaultError> {
        tracing::debug!("GET {}", url);
        let mut request = self.http_client.get(url).header("X-Vault-Token", &self.token);
        if !query.is_empty() {
            request = request.query(query);
        }
        request
            .send()
            .await
            .map_err(|source| classify(url, source))
    }
}

fn classify(url: &str, source: reqwest::Error) -> VaultError {
    if source.is_timeout() {
        VaultError::Timeout {
            url: url.to_string(),
        }
    } else {
        VaultError::Http {
            url: url.to_string(),
            source,
        }
    }
}

async fn error_for_status(url: &str, response: reqwest::Response) -> VaultError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    VaultError::Status {
        url: url.to_string(),
        status,
        body: body.trim().to_string(),
    }
}

#[async_trait]
impl SecretReader for VaultClient {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, VaultError> {
        let url = self.url_for(prefix);
        let response = self.get(&url, &[("list", "true")]).await?;

        // Vault answers 404 for a prefix without keys.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(error_for_status(&url, response).await);
        }

        let list: ListResponse = response.json().await.map_err(|e| VaultError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })?;
        Ok(list.data.keys)
    }

    async fn read(&self, key: &str) -> Result<Option<SecretData>, VaultError> {
        let url = self.url_for(key);
        let response = self.get(&url, &[]).await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_for_status(&url, response).await);
        }

        let secret: SecretResponse = response.json().await.map_err(|e| VaultError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })?;
        Ok(Some(secret.data))
    }
}
