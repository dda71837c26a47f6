//! Auth Gateway configuration.
//!
//! Configuration is loaded from environment variables. Defaults match
//! the in-cluster deployment layout (service account token and CA under
//! `/var/run/secrets/kubernetes.io/serviceaccount/`).

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default OIDC issuer for oidc-discovery mode.
pub const DEFAULT_ISSUER_URL: &str = "https://kubernetes.default.svc";

/// Default public key file for jwt-pubkey mode.
pub const DEFAULT_JWT_PUBLIC_KEY_FILE: &str = "sa.pub";

/// Default service account token path.
pub const DEFAULT_KUBE_TOKEN_FILE: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Default service account CA certificate path.
pub const DEFAULT_KUBE_CA_FILE: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// Authentication mode selecting the verification strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Delegate verification to the cluster TokenReview API.
    TokenReview,

    /// Verify JWTs locally against a configured public key.
    JwtPubKey,

    /// Verify tokens against keys discovered from an OIDC provider.
    OidcDiscovery,
}

impl Mode {
    /// The mode name as accepted in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::TokenReview => "token-review",
            Mode::JwtPubKey => "jwt-pubkey",
            Mode::OidcDiscovery => "oidc-discovery",
        }
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "token-review" => Ok(Mode::TokenReview),
            "jwt-pubkey" => Ok(Mode::JwtPubKey),
            "oidc-discovery" => Ok(Mode::OidcDiscovery),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

/// Auth Gateway configuration.
///
/// Loaded from environment variables with defaults matching the
/// in-cluster deployment. Nothing in here is secret; secrets (service
/// account token contents) are read from files at use sites.
#[derive(Debug, Clone)]
pub struct Config {
    /// Verification strategy to construct at startup.
    pub mode: Mode,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Expected audience. Optional; when unset, audience is not checked.
    pub audience: Option<String>,

    /// OIDC issuer discovery URL (oidc-discovery mode).
    pub issuer_url: String,

    /// PEM public key file to verify JWTs (jwt-pubkey mode).
    pub jwt_public_key_file: PathBuf,

    /// Cluster API server URL override (token-review mode).
    /// When unset, the in-cluster environment is used.
    pub kube_api_server: Option<String>,

    /// Path to the service account token used to call the cluster API.
    pub kube_token_file: PathBuf,

    /// Path to the cluster CA certificate.
    pub kube_ca_file: PathBuf,

    /// Additional CA bundle trusted by the outbound HTTP client.
    pub trusted_ca_file: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("unknown mode: {0} (expected token-review, jwt-pubkey or oidc-discovery)")]
    UnknownMode(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mode = vars
            .get("GATEWAY_MODE")
            .ok_or_else(|| ConfigError::MissingEnvVar("GATEWAY_MODE".to_string()))?
            .parse()?;

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        // An empty audience means "do not check" (operator opts in).
        let audience = vars
            .get("GATEWAY_AUDIENCE")
            .filter(|a| !a.is_empty())
            .cloned();

        let issuer_url = vars
            .get("OIDC_ISSUER_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_ISSUER_URL.to_string());

        let jwt_public_key_file = vars
            .get("JWT_PUBLIC_KEY_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_JWT_PUBLIC_KEY_FILE));

        let kube_api_server = vars
            .get("KUBE_API_SERVER")
            .filter(|s| !s.is_empty())
            .cloned();

        let kube_token_file = vars
            .get("KUBE_TOKEN_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_KUBE_TOKEN_FILE));

        let kube_ca_file = vars
            .get("KUBE_CA_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_KUBE_CA_FILE));

        let trusted_ca_file = vars
            .get("TRUSTED_CA_FILE")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        Ok(Config {
            mode,
            bind_address,
            audience,
            issuer_url,
            jwt_public_key_file,
            kube_api_server,
            kube_token_file,
            kube_ca_file,
            trusted_ca_file,
        })
    }
}
