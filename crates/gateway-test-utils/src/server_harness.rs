//! Test server harness for end-to-end testing.
//!
//! Provides `TestGateway` for spawning a real gateway instance bound to
//! an ephemeral port, with the verification strategy injected.

use auth_gateway::auth::TokenVerifier;
use auth_gateway::routes;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Test harness for spawning the gateway in end-to-end tests.
///
/// # Example
/// ```rust,ignore
/// let gateway = TestGateway::spawn(Arc::new(verifier)).await?;
/// let response = reqwest::get(format!("{}/healthz", gateway.url())).await?;
/// assert_eq!(response.status(), 200);
/// ```
pub struct TestGateway {
    addr: SocketAddr,
    _handle: JoinHandle<()>,
}

impl TestGateway {
    /// Spawn the gateway with the given verification strategy, bound to
    /// a random available port on localhost.
    pub async fn spawn(verifier: Arc<dyn TokenVerifier>) -> Result<Self, anyhow::Error> {
        let app = routes::build_routes(verifier);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            _handle: handle,
        })
    }

    /// Base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Socket address the server is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        // Abort the server task so the port is released as soon as the
        // test completes.
        self._handle.abort();
    }
}
