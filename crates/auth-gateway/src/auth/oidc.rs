//! OIDC discovery verification strategy.
//!
//! Provider metadata (issuer, JWKS location) is discovered once at
//! startup from the `/.well-known/openid-configuration` document; per
//! request, the token is verified against keys fetched through the
//! [`JwksCache`], which handles rotation by refreshing autonomously.
//!
//! Every per-request failure maps to 401 - including transport errors
//! while re-fetching signing keys. Re-querying key material is part of
//! verification here, and surfacing a 500 instead would leak provider
//! availability to callers. The 500-vs-401 distinction is reserved for
//! the token-review strategy, where the backend owns the verdict.

use crate::auth::jwks::{JwksCache, JwksError};
use crate::auth::{map_jwt_error, Subject, TokenVerifier};
use crate::errors::AuthError;
use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// Algorithms accepted from provider-issued tokens.
const ALLOWED_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::EdDSA,
];

/// Startup-time discovery failure.
#[derive(Debug, Error)]
pub enum OidcDiscoveryError {
    #[error("could not fetch discovery document from '{url}': {detail}")]
    Fetch { url: String, detail: String },

    #[error("issuer mismatch: configured '{configured}', discovered '{discovered}'")]
    IssuerMismatch {
        configured: String,
        discovered: String,
    },
}

/// The subset of provider metadata the gateway uses.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub jwks_uri: String,
}

/// ID token claims checked by this strategy.
#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    #[serde(default)]
    sub: String,
}

/// Verification strategy using keys and metadata discovered from an
/// OIDC provider.
pub struct OidcVerifier {
    issuer: String,
    audience: Option<String>,
    keys: JwksCache,
}

impl OidcVerifier {
    /// Discover provider metadata and construct the verifier.
    ///
    /// The document's `issuer` must equal the configured URL; a mismatch
    /// means the provider is serving metadata for someone else.
    pub async fn discover(
        http: reqwest::Client,
        issuer_url: &str,
        audience: Option<String>,
    ) -> Result<Self, OidcDiscoveryError> {
        let discovery_url = format!("{}{}", issuer_url.trim_end_matches('/'), DISCOVERY_PATH);

        let fetch_err = |detail: String| OidcDiscoveryError::Fetch {
            url: discovery_url.clone(),
            detail,
        };

        let response = http
            .get(&discovery_url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        if !response.status().is_success() {
            return Err(fetch_err(format!("status {}", response.status())));
        }

        let document: DiscoveryDocument = response
            .json()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        if document.issuer.trim_end_matches('/') != issuer_url.trim_end_matches('/') {
            return Err(OidcDiscoveryError::IssuerMismatch {
                configured: issuer_url.to_string(),
                discovered: document.issuer,
            });
        }

        tracing::info!(
            target: "gateway.auth.oidc",
            issuer = %document.issuer,
            jwks_uri = %document.jwks_uri,
            "OIDC provider discovered"
        );

        Ok(Self {
            issuer: document.issuer,
            audience,
            keys: JwksCache::new(http, document.jwks_uri),
        })
    }

    /// Build a verifier from already-known metadata (tests, pinned
    /// deployments).
    pub fn from_parts(
        http: reqwest::Client,
        issuer: String,
        jwks_uri: String,
        audience: Option<String>,
    ) -> Self {
        Self {
            issuer,
            audience,
            keys: JwksCache::new(http, jwks_uri),
        }
    }
}

#[async_trait]
impl TokenVerifier for OidcVerifier {
    #[instrument(skip_all, name = "gateway.auth.oidc")]
    async fn verify(&self, token: &str) -> Result<Subject, AuthError> {
        let header = decode_header(token).map_err(map_jwt_error)?;

        if !ALLOWED_ALGORITHMS.contains(&header.alg) {
            return Err(AuthError::SignatureInvalid(format!(
                "token algorithm {:?} not accepted",
                header.alg
            )));
        }

        // Key-fetch failures stay 401s, see module docs.
        let jwk = self
            .keys
            .get_key(header.kid.as_deref())
            .await
            .map_err(|e: JwksError| AuthError::SignatureInvalid(e.to_string()))?;

        let key = jwk
            .decoding_key()
            .map_err(|e| AuthError::SignatureInvalid(e.to_string()))?;

        let mut validation = Validation::new(header.alg);
        // No leeway: expiry is an exact, exclusive bound here too.
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let data = decode::<IdTokenClaims>(token, &key, &validation).map_err(map_jwt_error)?;

        tracing::debug!(target: "gateway.auth.oidc", "token verified");
        Ok(Subject::new(data.claims.sub))
    }
}
