//! Auth Gateway error types.
//!
//! Every authentication failure is handled at the middleware boundary
//! and mapped to an HTTP status here. Bodies follow the
//! `"<status text>: <detail>"` convention so callers can distinguish the
//! failure reason, but raw token contents never appear in details or logs.
//!
//! The one asymmetric mapping is `ServiceUnavailable` (500): when the
//! trusted verification backend itself cannot be reached, the verdict is
//! undetermined, which must stay distinguishable from "caller presented a
//! bad token" (401) for operators.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Authentication error taxonomy.
///
/// Maps to HTTP status codes:
/// - NoToken, MalformedToken, SignatureInvalid, ClaimInvalid, Denied: 401
/// - ServiceUnavailable: 500
#[derive(Debug, Error)]
pub enum AuthError {
    /// Request carries no extractable bearer token.
    #[error("no token")]
    NoToken,

    /// Token cannot be parsed into its expected structure.
    #[error("{0}")]
    MalformedToken(String),

    /// Cryptographic verification failed.
    #[error("{0}")]
    SignatureInvalid(String),

    /// Time-window or audience claim failed validation.
    #[error("{0}")]
    ClaimInvalid(String),

    /// The verification backend affirmatively declared the token invalid.
    #[error("{0}")]
    Denied(String),

    /// The verification backend could not be reached or errored.
    #[error("{0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::NoToken
            | AuthError::MalformedToken(_)
            | AuthError::SignatureInvalid(_)
            | AuthError::ClaimInvalid(_)
            | AuthError::Denied(_) => StatusCode::UNAUTHORIZED,
            AuthError::ServiceUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            AuthError::ServiceUnavailable(detail) => {
                tracing::error!(
                    target: "gateway.auth",
                    detail = %detail,
                    "verification backend unavailable"
                );
            }
            other => {
                tracing::warn!(
                    target: "gateway.auth",
                    detail = %other,
                    "request denied"
                );
            }
        }

        let status_text = status.canonical_reason().unwrap_or("Error");
        let body = format!("{}: {}", status_text, self);

        let mut response = (status, body).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Bearer".parse() {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}
