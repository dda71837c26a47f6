//! Token extraction and the verification strategies.
//!
//! One contract unifies the three verification backends:
//! [`TokenVerifier::verify`] takes the raw bearer token and returns either
//! a [`Subject`] or a classified [`AuthError`]. The strategy is chosen
//! once at startup and shared read-only across all requests.
//!
//! # Components
//!
//! - `extract` - bearer token extraction from request headers
//! - `token_review` - delegated verification via the cluster API
//! - `keys` + `jwt` - local verification against a configured public key
//! - `jwks` + `oidc` - verification against discovered provider keys

pub mod extract;
pub mod jwks;
pub mod jwt;
pub mod keys;
pub mod oidc;
pub mod token_review;

use crate::errors::AuthError;
use async_trait::async_trait;
use std::fmt;

pub use extract::bearer_token;
pub use jwt::JwtVerifier;
pub use oidc::OidcVerifier;
pub use token_review::TokenReviewVerifier;

/// Verified caller identity.
///
/// Attached to the request by the authentication middleware and read by
/// the protected handler. The name may be empty when the backend
/// authenticated the token without reporting a username; handlers must
/// tolerate that.
///
/// `Debug` output redacts the name: subjects are identities and should
/// not leak through debug formatting of requests.
#[derive(Clone, PartialEq, Eq)]
pub struct Subject(String);

impl Subject {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Subject").field(&"[REDACTED]").finish()
    }
}

/// A verification strategy.
///
/// Implementations hold immutable configuration (keys, clients, expected
/// audience) constructed at startup and are safe for unsynchronized
/// concurrent use. A call may block on network I/O; it is bounded by the
/// calling request's lifetime, so an aborted request aborts the
/// in-flight verification.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify a raw bearer token, returning the authenticated subject.
    async fn verify(&self, token: &str) -> Result<Subject, AuthError>;
}

/// Map a `jsonwebtoken` failure onto the error taxonomy.
///
/// Signature failures and claim failures are reported distinctly; every
/// structural problem (bad base64, wrong segment count, invalid JSON)
/// counts as a malformed token. All of these are 401s.
pub(crate) fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
            AuthError::SignatureInvalid(err.to_string())
        }
        ErrorKind::ExpiredSignature
        | ErrorKind::ImmatureSignature
        | ErrorKind::InvalidAudience
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidSubject
        | ErrorKind::MissingRequiredClaim(_) => AuthError::ClaimInvalid(err.to_string()),
        _ => AuthError::MalformedToken(err.to_string()),
    }
}
