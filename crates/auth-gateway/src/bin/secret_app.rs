//! Secret demo application.
//!
//! Loads a single secret at startup (from the environment, a file, or
//! Vault) and serves it on `/`. Companion workload used to demonstrate
//! secret delivery alongside the gateway.
//!
//! Configuration (environment):
//! - `SECRET_MODE` - `env`, `file`, or `vault` (default `env`)
//! - `SECRET_ENV_VAR` - variable name for env mode (default `SECRET`)
//! - `SECRET_FILE` - path for file mode (default `/etc/secret/value`)
//! - `VAULT_ADDR`, `VAULT_ROLE`, `VAULT_SECRET_PATH`, `VAULT_SECRET_KEY`,
//!   `VAULT_TOKEN_FILE` - vault mode parameters

use auth_gateway::config::DEFAULT_KUBE_TOKEN_FILE;
use auth_gateway::http_client;
use auth_gateway::secrets::{self, SecretSource, VaultConfig};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth_gateway=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let source = secret_source_from_env()?;
    info!(source = source_name(&source), "Loading secret");

    let ca_files: Vec<PathBuf> = std::env::var("TRUSTED_CA_FILE")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .into_iter()
        .collect();
    let http = http_client::build(&ca_files)?;

    let secret = secrets::load_secret(&http, &source).await.map_err(|e| {
        error!("Failed to load secret: {}", e);
        e
    })?;

    let app = Router::new().route(
        "/",
        get(move || async move { format!("the secret is: {}", secret) }),
    );

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let addr: SocketAddr = bind_address.parse()?;

    info!("Secret app listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn secret_source_from_env() -> Result<SecretSource, Box<dyn std::error::Error>> {
    let mode = std::env::var("SECRET_MODE").unwrap_or_else(|_| "env".to_string());

    match mode.as_str() {
        "env" => Ok(SecretSource::Env {
            var: std::env::var("SECRET_ENV_VAR").unwrap_or_else(|_| "SECRET".to_string()),
        }),
        "file" => Ok(SecretSource::File {
            path: std::env::var("SECRET_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/etc/secret/value")),
        }),
        "vault" => Ok(SecretSource::Vault(VaultConfig {
            address: std::env::var("VAULT_ADDR")?,
            role: std::env::var("VAULT_ROLE")?,
            token_file: std::env::var("VAULT_TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_KUBE_TOKEN_FILE)),
            secret_path: std::env::var("VAULT_SECRET_PATH")?,
            secret_key: std::env::var("VAULT_SECRET_KEY")?,
        })),
        other => Err(format!("unknown SECRET_MODE: {}", other).into()),
    }
}

fn source_name(source: &SecretSource) -> &'static str {
    match source {
        SecretSource::Env { .. } => "env",
        SecretSource::File { .. } => "file",
        SecretSource::Vault(_) => "vault",
    }
}
