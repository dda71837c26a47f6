//! HTTP request handlers for the Auth Gateway.

pub mod greet;
pub mod health;

pub use greet::greet;
pub use health::health_check;
