//! HTTP routes for the Auth Gateway.
//!
//! Defines the axum router: a public health probe and a catch-all
//! protected route guarded by the authentication middleware.

use crate::auth::TokenVerifier;
use crate::handlers;
use crate::middleware::{require_auth, AuthState};
use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Request deadline; also bounds in-flight verification backend calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the application routes.
///
/// - `/healthz` - liveness probe, public
/// - everything else, any method - the protected greeting handler
///   behind `require_auth`
/// - `TraceLayer` for request logging, 30 second request timeout
pub fn build_routes(verifier: Arc<dyn TokenVerifier>) -> Router {
    let auth_state = Arc::new(AuthState { verifier });

    let public_routes = Router::new().route("/healthz", get(handlers::health_check));

    // The fallback makes every method/path authenticated; layer (not
    // route_layer) so the middleware covers the fallback too.
    let protected_routes = Router::new()
        .fallback(handlers::greet)
        .layer(middleware::from_fn_with_state(auth_state, require_auth));

    public_routes
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
}
