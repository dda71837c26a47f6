//! Outbound HTTP client construction.
//!
//! The trust root is an explicit dependency: one client is built at
//! startup with whatever CA bundles the deployment needs and handed to
//! every collaborator that performs outbound calls (token review, OIDC
//! discovery and JWKS, Vault). No process-global transport is mutated.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Timeout for individual outbound calls. Shorter than the inbound
/// request deadline so a slow backend surfaces as a classified error
/// rather than a gateway timeout.
const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("could not read ca '{path}': {source}")]
    ReadCa {
        path: String,
        source: std::io::Error,
    },

    #[error("could not parse ca '{path}': {source}")]
    ParseCa {
        path: String,
        source: reqwest::Error,
    },

    #[error("could not build http client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Build the outbound client, trusting system roots plus the given PEM
/// CA bundles.
pub fn build(ca_files: &[PathBuf]) -> Result<reqwest::Client, HttpClientError> {
    let mut builder = reqwest::Client::builder().timeout(OUTBOUND_TIMEOUT);

    for path in ca_files {
        let pem = fs::read(path).map_err(|source| HttpClientError::ReadCa {
            path: path.display().to_string(),
            source,
        })?;

        let certs =
            reqwest::Certificate::from_pem_bundle(&pem).map_err(|source| {
                HttpClientError::ParseCa {
                    path: path.display().to_string(),
                    source,
                }
            })?;

        for cert in certs {
            builder = builder.add_root_certificate(cert);
        }
    }

    Ok(builder.build()?)
}
