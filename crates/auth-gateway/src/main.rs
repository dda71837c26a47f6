//! Auth Gateway
//!
//! Entry point for the request-authentication gateway. Loads
//! configuration, constructs the configured token verification
//! strategy, and serves the protected routes.

use auth_gateway::auth::{jwt::JwtVerifier, keys, oidc::OidcVerifier, token_review::TokenReviewVerifier, TokenVerifier};
use auth_gateway::config::{Config, Mode};
use auth_gateway::http_client;
use auth_gateway::kube::KubeConfig;
use auth_gateway::routes;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Auth Gateway");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        mode = config.mode.as_str(),
        bind_address = %config.bind_address,
        audience = config.audience.as_deref().unwrap_or("<unchecked>"),
        "Configuration loaded successfully"
    );

    let verifier = build_verifier(&config).await?;
    let app = routes::build_routes(verifier);

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Auth Gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Auth Gateway shutdown complete");

    Ok(())
}

/// Construct the verification strategy selected by `GATEWAY_MODE`.
async fn build_verifier(
    config: &Config,
) -> Result<Arc<dyn TokenVerifier>, Box<dyn std::error::Error>> {
    match config.mode {
        Mode::TokenReview => {
            let kube = KubeConfig::load(config)?;

            let mut ca_files: Vec<PathBuf> = Vec::new();
            if let Some(ca) = &kube.ca_file {
                ca_files.push(ca.clone());
            }
            if let Some(ca) = &config.trusted_ca_file {
                ca_files.push(ca.clone());
            }
            let http = http_client::build(&ca_files)?;

            let audiences = config.audience.clone().map(|a| vec![a]);
            info!(api_server = %kube.api_server, "Using cluster token review");
            Ok(Arc::new(TokenReviewVerifier::new(
                http,
                &kube.api_server,
                kube.token,
                audiences,
            )))
        }
        Mode::JwtPubKey => {
            let key = keys::load_public_key(&config.jwt_public_key_file).map_err(|e| {
                error!("Failed to load public key: {}", e);
                e
            })?;

            info!(
                key_file = %config.jwt_public_key_file.display(),
                "Using local JWT verification"
            );
            Ok(Arc::new(JwtVerifier::new(key, config.audience.clone())))
        }
        Mode::OidcDiscovery => {
            let ca_files: Vec<PathBuf> =
                config.trusted_ca_file.clone().into_iter().collect();
            let http = http_client::build(&ca_files)?;

            let verifier =
                OidcVerifier::discover(http, &config.issuer_url, config.audience.clone())
                    .await
                    .map_err(|e| {
                        error!("OIDC discovery failed: {}", e);
                        e
                    })?;

            info!(issuer = %config.issuer_url, "Using OIDC discovery verification");
            Ok(Arc::new(verifier))
        }
    }
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
