//! Auth Gateway Service Library
//!
//! A request-authentication gateway: it sits in front of a protected
//! handler and decides, per incoming request, whether the caller presents
//! a valid bearer token, attaching the verified identity to the request.
//!
//! # Architecture
//!
//! The core is a single verification seam:
//!
//! ```text
//! request -> middleware (extract bearer token)
//!         -> TokenVerifier (one of three strategies, chosen at startup)
//!         -> Subject attached -> protected handler
//! ```
//!
//! Strategies:
//!
//! - `auth::token_review` - delegates the verdict to the cluster
//!   TokenReview API
//! - `auth::jwt` - verifies the token locally against a configured
//!   public key
//! - `auth::oidc` - verifies against keys discovered from an OIDC
//!   provider
//!
//! # Modules
//!
//! - `config` - service configuration from environment
//! - `errors` - error taxonomy with HTTP status mapping
//! - `auth` - token extraction and the verification strategies
//! - `middleware` - the authentication middleware
//! - `handlers` - protected and operational HTTP handlers
//! - `routes` - axum router setup
//! - `http_client` - explicit outbound HTTP client construction
//! - `kube` - in-cluster configuration loading
//! - `poller` - periodic authenticated client
//! - `secrets` - secret retrieval (env, file, Vault)

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod http_client;
pub mod kube;
pub mod middleware;
pub mod poller;
pub mod routes;
pub mod secrets;
