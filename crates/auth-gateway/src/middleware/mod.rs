//! Middleware for the Auth Gateway.
//!
//! # Components
//!
//! - `auth` - bearer-token authentication in front of protected routes

pub mod auth;

pub use auth::{require_auth, AuthState};
