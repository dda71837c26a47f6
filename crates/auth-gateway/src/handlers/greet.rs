//! The protected handler.
//!
//! Echoes the authenticated identity attached by the middleware. The
//! subject may legitimately be absent (the middleware was bypassed in a
//! test, or the backend authenticated without a username); that is a
//! neutral response, not a crash condition.

use crate::auth::Subject;
use axum::Extension;
use tracing::instrument;

/// Handler for any authenticated request.
#[instrument(skip_all, name = "gateway.handlers.greet")]
pub async fn greet(subject: Option<Extension<Subject>>) -> String {
    let name = match &subject {
        Some(Extension(subject)) => subject.name(),
        None => "",
    };

    if name.is_empty() {
        return "no subject".to_string();
    }

    tracing::info!(target: "gateway.handlers.greet", subject = %name, "got request");
    format!("hello {}", name)
}
