//! Polling client for the Auth Gateway.
//!
//! Reads a service account token and calls the gateway every few
//! seconds, logging each response. Intended to run as a sidecar or
//! companion deployment when smoke-testing a cluster rollout.
//!
//! Usage: `gateway-client <url>` with `TOKEN_FILE` (and optionally
//! `TRUSTED_CA_FILE`) in the environment.

use auth_gateway::config::DEFAULT_KUBE_TOKEN_FILE;
use auth_gateway::http_client;
use auth_gateway::poller::PollingClient;
use std::path::PathBuf;
use tracing::error;
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

    let target_url = std::env::args().nth(1).ok_or_else(|| {
        error!("Usage: gateway-client <url>");
        "missing target url argument"
    })?;

    let token_file = std::env::var("TOKEN_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_KUBE_TOKEN_FILE));

    let ca_files: Vec<PathBuf> = std::env::var("TRUSTED_CA_FILE")
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .into_iter()
        .collect();

    let http = http_client::build(&ca_files)?;
    let poller = PollingClient::from_token_file(http, &target_url, &token_file)?;

    poller.run().await;

    Ok(())
}
