//! In-cluster configuration loading.
//!
//! Boundary-level only: the gateway needs the API server URL, its own
//! service account token, and the cluster CA path. The API server comes
//! from an explicit override or from the in-cluster environment
//! variables; kubeconfig files are out of scope.

use crate::config::Config;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KubeError {
    #[error("not running in a cluster and no KUBE_API_SERVER override set")]
    NotInCluster,

    #[error("could not read service account token '{path}': {source}")]
    ReadToken {
        path: String,
        source: std::io::Error,
    },
}

/// Cluster connection details for the token-review strategy.
#[derive(Debug, Clone)]
pub struct KubeConfig {
    /// Base URL of the cluster API server.
    pub api_server: String,

    /// The gateway's own service account token (calls the TokenReview API).
    pub token: String,

    /// Cluster CA certificate, when present on disk.
    pub ca_file: Option<PathBuf>,
}

impl KubeConfig {
    /// Load cluster details from config overrides or the in-cluster
    /// environment (`KUBERNETES_SERVICE_HOST`/`KUBERNETES_SERVICE_PORT`).
    pub fn load(config: &Config) -> Result<Self, KubeError> {
        let api_server = match &config.kube_api_server {
            Some(url) => url.clone(),
            None => in_cluster_api_server().ok_or(KubeError::NotInCluster)?,
        };

        let token_path = &config.kube_token_file;
        let token = fs::read_to_string(token_path)
            .map(|t| t.trim().to_string())
            .map_err(|source| KubeError::ReadToken {
                path: token_path.display().to_string(),
                source,
            })?;

        let ca_file = config
            .kube_ca_file
            .exists()
            .then(|| config.kube_ca_file.clone());

        Ok(Self {
            api_server,
            token,
            ca_file,
        })
    }
}

fn in_cluster_api_server() -> Option<String> {
    let host = std::env::var("KUBERNETES_SERVICE_HOST").ok()?;
    let port = std::env::var("KUBERNETES_SERVICE_PORT").ok()?;
    Some(format!("https://{}:{}", host, port))
}
