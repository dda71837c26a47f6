//! Health check handler.

/// Liveness probe. Public, unauthenticated.
pub async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_is_ok() {
        assert_eq!(health_check().await, "OK");
    }
}
