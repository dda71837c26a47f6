//! Application secret retrieval.
//!
//! A secret can come from an environment variable, a mounted file, or
//! Vault. The Vault path authenticates with the pod's service account
//! token via the kubernetes auth method, then reads a KV v2 secret.

use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("environment variable '{0}' is not set")]
    MissingEnvVar(String),

    #[error("could not read '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    #[error("vault request failed: {0}")]
    Vault(#[from] reqwest::Error),

    #[error("vault login did not return a token")]
    NoVaultToken,

    #[error("no data found under '{0}'")]
    NoData(String),

    #[error("secret '{0}' does not exist")]
    MissingKey(String),
}

/// Vault connection and lookup parameters.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Vault base address, e.g. `https://vault.example.com:8200`.
    pub address: String,

    /// Kubernetes auth role to log in as.
    pub role: String,

    /// Service account token presented at login.
    pub token_file: PathBuf,

    /// KV v2 secret path, e.g. `kv/data/k8s/default`.
    pub secret_path: String,

    /// Key within the secret's data.
    pub secret_key: String,
}

/// Where the application secret comes from.
#[derive(Debug, Clone)]
pub enum SecretSource {
    Env { var: String },
    File { path: PathBuf },
    Vault(VaultConfig),
}

#[derive(Debug, Deserialize)]
struct VaultLoginResponse {
    #[serde(default)]
    auth: Option<VaultAuth>,
}

#[derive(Debug, Deserialize)]
struct VaultAuth {
    client_token: String,
}

/// Load the secret from its configured source.
#[instrument(skip_all, name = "gateway.secrets.load")]
pub async fn load_secret(
    http: &reqwest::Client,
    source: &SecretSource,
) -> Result<String, SecretError> {
    match source {
        SecretSource::Env { var } => {
            std::env::var(var).map_err(|_| SecretError::MissingEnvVar(var.clone()))
        }
        SecretSource::File { path } => {
            fs::read_to_string(path).map_err(|source| SecretError::ReadFile {
                path: path.display().to_string(),
                source,
            })
        }
        SecretSource::Vault(vault) => load_from_vault(http, vault).await,
    }
}

async fn load_from_vault(
    http: &reqwest::Client,
    vault: &VaultConfig,
) -> Result<String, SecretError> {
    let jwt = fs::read_to_string(&vault.token_file)
        .map(|t| t.trim().to_string())
        .map_err(|source| SecretError::ReadFile {
            path: vault.token_file.display().to_string(),
            source,
        })?;

    let address = vault.address.trim_end_matches('/');

    let login: VaultLoginResponse = http
        .post(format!("{}/v1/auth/kubernetes/login", address))
        .json(&serde_json::json!({ "role": vault.role, "jwt": jwt }))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let client_token = login.auth.ok_or(SecretError::NoVaultToken)?.client_token;

    let secret: Value = http
        .get(format!("{}/v1/{}", address, vault.secret_path))
        .header("X-Vault-Token", client_token)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    extract_kv2_value(&secret, &vault.secret_path, &vault.secret_key)
}

/// Pull `data.data[key]` out of a KV v2 read response.
fn extract_kv2_value(secret: &Value, path: &str, key: &str) -> Result<String, SecretError> {
    let data = secret
        .get("data")
        .filter(|d| !d.is_null())
        .ok_or_else(|| SecretError::NoData(path.to_string()))?;

    let inner = data
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| SecretError::NoData(path.to_string()))?;

    inner
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SecretError::MissingKey(key.to_string()))
}
