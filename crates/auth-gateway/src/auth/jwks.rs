//! JWKS fetching and caching for the OIDC strategy.
//!
//! Keys are cached with a TTL and refreshed when an unknown `kid` shows
//! up, so provider key rotation is picked up without restarting the
//! gateway. The cache is the only stateful part of the OIDC verifier
//! and is invisible to the middleware.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::instrument;

/// Default cache TTL (5 minutes).
const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

#[derive(Debug, Error)]
pub enum JwksError {
    /// The JWKS endpoint could not be reached or replied with garbage.
    #[error("fetching signing keys: {0}")]
    Unavailable(String),

    /// No key in the set matches the token's key ID.
    #[error("no signing key matches the token")]
    UnknownKey,

    /// A matching key exists but cannot be used for verification.
    #[error("unusable signing key: {0}")]
    UnusableKey(String),
}

/// JSON Web Key as served by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" or "OKP").
    pub kty: String,

    /// Key ID; providers serving a single key may omit it.
    #[serde(default)]
    pub kid: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// OKP public key (base64url).
    #[serde(default)]
    pub x: Option<String>,

    /// Advertised algorithm.
    #[serde(default)]
    pub alg: Option<String>,
}

impl Jwk {
    /// Build a verification key from this JWK.
    pub fn decoding_key(&self) -> Result<DecodingKey, JwksError> {
        match self.kty.as_str() {
            "RSA" => {
                let n = self
                    .n
                    .as_deref()
                    .ok_or_else(|| JwksError::UnusableKey("RSA key missing n".to_string()))?;
                let e = self
                    .e
                    .as_deref()
                    .ok_or_else(|| JwksError::UnusableKey("RSA key missing e".to_string()))?;
                DecodingKey::from_rsa_components(n, e)
                    .map_err(|err| JwksError::UnusableKey(err.to_string()))
            }
            "OKP" => {
                let x = self
                    .x
                    .as_deref()
                    .ok_or_else(|| JwksError::UnusableKey("OKP key missing x".to_string()))?;
                let bytes = URL_SAFE_NO_PAD
                    .decode(x)
                    .map_err(|err| JwksError::UnusableKey(err.to_string()))?;
                Ok(DecodingKey::from_ed_der(&bytes))
            }
            other => Err(JwksError::UnusableKey(format!(
                "unsupported key type {}",
                other
            ))),
        }
    }
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksDocument {
    pub keys: Vec<Jwk>,
}

struct CachedKeys {
    keys: Vec<Jwk>,
    by_kid: HashMap<String, usize>,
    expires_at: Instant,
}

impl CachedKeys {
    fn lookup(&self, kid: Option<&str>) -> Option<&Jwk> {
        match kid {
            Some(kid) => self.by_kid.get(kid).and_then(|i| self.keys.get(*i)),
            // Without a kid the set must be unambiguous.
            None => match self.keys.as_slice() {
                [only] => Some(only),
                _ => None,
            },
        }
    }
}

/// TTL cache of a provider's JWKS.
pub struct JwksCache {
    jwks_url: String,
    http: reqwest::Client,
    cache: Arc<RwLock<Option<CachedKeys>>>,
    cache_ttl: Duration,
}

impl JwksCache {
    pub fn new(http: reqwest::Client, jwks_url: String) -> Self {
        Self::with_ttl(http, jwks_url, Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS))
    }

    pub fn with_ttl(http: reqwest::Client, jwks_url: String, cache_ttl: Duration) -> Self {
        Self {
            jwks_url,
            http,
            cache: Arc::new(RwLock::new(None)),
            cache_ttl,
        }
    }

    /// Get the signing key for `kid`, refreshing the cache when it is
    /// stale or when the kid is not present (key rotation).
    #[instrument(skip(self))]
    pub async fn get_key(&self, kid: Option<&str>) -> Result<Jwk, JwksError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.expires_at > Instant::now() {
                    if let Some(key) = cached.lookup(kid) {
                        tracing::debug!(target: "gateway.auth.jwks", "JWKS cache hit");
                        return Ok(key.clone());
                    }
                }
            }
        }

        self.refresh().await?;

        let cache = self.cache.read().await;
        if let Some(cached) = cache.as_ref() {
            if let Some(key) = cached.lookup(kid) {
                return Ok(key.clone());
            }
        }

        tracing::warn!(target: "gateway.auth.jwks", "key not found in JWKS after refresh");
        Err(JwksError::UnknownKey)
    }

    #[instrument(skip(self))]
    async fn refresh(&self) -> Result<(), JwksError> {
        tracing::debug!(target: "gateway.auth.jwks", url = %self.jwks_url, "fetching JWKS");

        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| JwksError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(JwksError::Unavailable(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }

        let document: JwksDocument = response
            .json()
            .await
            .map_err(|e| JwksError::Unavailable(e.to_string()))?;

        let by_kid = document
            .keys
            .iter()
            .enumerate()
            .filter_map(|(i, key)| key.kid.clone().map(|kid| (kid, i)))
            .collect();

        tracing::info!(
            target: "gateway.auth.jwks",
            key_count = document.keys.len(),
            "JWKS cache refreshed"
        );

        let mut cache = self.cache.write().await;
        *cache = Some(CachedKeys {
            keys: document.keys,
            by_kid,
            expires_at: Instant::now() + self.cache_ttl,
        });

        Ok(())
    }
}
