//! Authentication middleware for protected routes.
//!
//! Implements the per-request state machine: extract the bearer token,
//! hand it to the configured verification strategy, and either attach
//! the verified [`Subject`] to the request and continue, or terminate
//! with the strategy's classified error. The downstream handler is
//! never invoked on a denial, and each request is verified exactly
//! once - no retries at this layer.

use crate::auth::{bearer_token, Subject, TokenVerifier};
use crate::errors::AuthError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    /// The verification strategy chosen at startup.
    pub verifier: Arc<dyn TokenVerifier>,
}

/// Authentication middleware.
///
/// # Response
///
/// - 401/500 per the strategy's error classification when the token is
///   missing or fails verification
/// - continues to the next handler with [`Subject`] in the request
///   extensions when verification succeeds
#[instrument(skip_all, name = "gateway.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AuthError> {
    let token = match bearer_token(req.headers()) {
        Some(token) if !token.is_empty() => token.to_string(),
        _ => {
            tracing::debug!(target: "gateway.middleware.auth", "no bearer token in request");
            return Err(AuthError::NoToken);
        }
    };

    // Verification runs inside the request future: if the caller goes
    // away, the in-flight backend call is dropped with it.
    let subject = state.verifier.verify(&token).await?;

    req.extensions_mut().insert(subject);

    Ok(next.run(req).await)
}
