//! Test utilities for the Auth Gateway.
//!
//! Deterministic signing keys, JWT claim builders, and a server harness
//! for end-to-end tests. Everything here is test-only; the fixtures are
//! reproducible and must never be used outside tests.

pub mod server_harness;
pub mod token_builders;

pub use server_harness::TestGateway;
pub use token_builders::{TestClaimsBuilder, TestKeypair};
