//! Public key loading for local JWT verification.
//!
//! Parses a PEM-encoded (SPKI) public key file and pins the algorithm
//! family to the key type. Pinning means a token whose header names an
//! algorithm outside the family is rejected before any cryptography
//! runs, closing the usual algorithm-confusion hole.

use jsonwebtoken::{Algorithm, DecodingKey};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("could not read key file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("unsupported public key in '{0}' (expected RSA, EC or Ed25519 PEM)")]
    Unsupported(String),
}

/// A parsed verification key together with the JWT algorithms it admits.
pub struct VerifyingKey {
    pub(crate) key: DecodingKey,
    pub(crate) algorithms: Vec<Algorithm>,
}

impl VerifyingKey {
    /// Whether a token signed with `alg` can be checked with this key.
    pub fn admits(&self, alg: Algorithm) -> bool {
        self.algorithms.contains(&alg)
    }
}

/// Load a PEM public key from `path`.
///
/// RSA, EC and Ed25519 SPKI keys are attempted in turn; the first
/// parse that succeeds decides the admitted algorithm family.
pub fn load_public_key(path: &Path) -> Result<VerifyingKey, KeyError> {
    let pem = fs::read(path).map_err(|source| KeyError::Read {
        path: path.display().to_string(),
        source,
    })?;

    if let Ok(key) = DecodingKey::from_rsa_pem(&pem) {
        return Ok(VerifyingKey {
            key,
            algorithms: vec![Algorithm::RS256, Algorithm::RS384, Algorithm::RS512],
        });
    }

    if let Ok(key) = DecodingKey::from_ec_pem(&pem) {
        return Ok(VerifyingKey {
            key,
            algorithms: vec![Algorithm::ES256, Algorithm::ES384],
        });
    }

    if let Ok(key) = DecodingKey::from_ed_pem(&pem) {
        return Ok(VerifyingKey {
            key,
            algorithms: vec![Algorithm::EdDSA],
        });
    }

    Err(KeyError::Unsupported(path.display().to_string()))
}
