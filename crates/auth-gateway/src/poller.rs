//! Periodic authenticated client.
//!
//! Exercises the gateway from the inside of a cluster: reads a token
//! from disk once, then polls the target on a fixed interval with
//! `Authorization: Bearer <token>`, logging the outcome. Errors are
//! logged and the loop continues; the poller never gives up.

use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

/// Default polling interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum PollerError {
    #[error("invalid target url '{url}': {detail}")]
    InvalidUrl { url: String, detail: String },

    #[error("could not read token file '{path}': {source}")]
    ReadToken {
        path: String,
        source: std::io::Error,
    },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Polls a target URL with a bearer token on a fixed interval.
pub struct PollingClient {
    http: reqwest::Client,
    target_url: reqwest::Url,
    token: String,
    interval: Duration,
}

impl PollingClient {
    /// Build a poller from a target URL and a token file.
    pub fn from_token_file(
        http: reqwest::Client,
        target_url: &str,
        token_file: &Path,
    ) -> Result<Self, PollerError> {
        let target_url =
            reqwest::Url::parse(target_url).map_err(|e| PollerError::InvalidUrl {
                url: target_url.to_string(),
                detail: e.to_string(),
            })?;

        let token = fs::read_to_string(token_file)
            .map(|t| t.trim().to_string())
            .map_err(|source| PollerError::ReadToken {
                path: token_file.display().to_string(),
                source,
            })?;

        Ok(Self {
            http,
            target_url,
            token,
            interval: DEFAULT_INTERVAL,
        })
    }

    /// Override the polling interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Poll forever, logging each response or error.
    pub async fn run(&self) {
        tracing::info!(target: "gateway.poller", target_url = %self.target_url, "start client");

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.call().await {
                tracing::warn!(target: "gateway.poller", error = %e, "poll failed");
            }
        }
    }

    /// One authenticated GET against the target.
    #[instrument(skip_all, name = "gateway.poller.call")]
    pub async fn call(&self) -> Result<(), PollerError> {
        let response = self
            .http
            .get(self.target_url.clone())
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::info!(
            target: "gateway.poller",
            target_url = %self.target_url,
            status = status.as_u16(),
            response = %body,
            "poll complete"
        );
        Ok(())
    }
}
