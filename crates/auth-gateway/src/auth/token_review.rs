//! Cluster TokenReview verification strategy.
//!
//! Verification is fully delegated: the raw token is submitted to the
//! cluster's `authentication.k8s.io/v1` TokenReview API and its verdict
//! is trusted. This strategy holds no cryptographic material, which is
//! the right posture when the caller's credential is itself
//! cluster-issued.
//!
//! Failure to obtain a verdict (transport error, non-2xx API reply) is
//! a system error (500), not a caller error: an unreachable backend must
//! stay distinguishable from a rejected token.

use crate::auth::{Subject, TokenVerifier};
use crate::errors::AuthError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

const TOKEN_REVIEW_PATH: &str = "/apis/authentication.k8s.io/v1/tokenreviews";

/// TokenReview request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenReviewRequest<'a> {
    api_version: &'static str,
    kind: &'static str,
    spec: TokenReviewSpec<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenReviewSpec<'a> {
    token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    audiences: Option<&'a [String]>,
}

/// TokenReview reply. Only the status carries information we act on.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenReviewResponse {
    #[serde(default)]
    pub status: TokenReviewStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenReviewStatus {
    #[serde(default)]
    pub authenticated: bool,

    #[serde(default)]
    pub user: TokenReviewUser,

    /// Set by the API when authentication failed.
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenReviewUser {
    #[serde(default)]
    pub username: String,
}

/// Verification strategy backed by the cluster TokenReview API.
pub struct TokenReviewVerifier {
    /// Outbound client, pre-configured with the cluster CA.
    http: reqwest::Client,

    /// TokenReview endpoint URL.
    review_url: String,

    /// Service account credential used to call the API.
    api_token: String,

    /// Audiences the reviewed token must be intended for, if any.
    audiences: Option<Vec<String>>,
}

impl TokenReviewVerifier {
    /// Create a verifier talking to `api_server`, authenticating with
    /// `api_token` (the gateway's own service account token).
    pub fn new(
        http: reqwest::Client,
        api_server: &str,
        api_token: String,
        audiences: Option<Vec<String>>,
    ) -> Self {
        let review_url = format!("{}{}", api_server.trim_end_matches('/'), TOKEN_REVIEW_PATH);
        Self {
            http,
            review_url,
            api_token,
            audiences,
        }
    }
}

#[async_trait]
impl TokenVerifier for TokenReviewVerifier {
    #[instrument(skip_all, name = "gateway.auth.token_review")]
    async fn verify(&self, token: &str) -> Result<Subject, AuthError> {
        let request = TokenReviewRequest {
            api_version: "authentication.k8s.io/v1",
            kind: "TokenReview",
            spec: TokenReviewSpec {
                token,
                audiences: self.audiences.as_deref(),
            },
        };

        let response = self
            .http
            .post(&self.review_url)
            .bearer_auth(&self.api_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AuthError::ServiceUnavailable(format!("token review failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::ServiceUnavailable(format!(
                "token review failed: cluster API returned {}",
                status
            )));
        }

        let review: TokenReviewResponse = response.json().await.map_err(|e| {
            AuthError::ServiceUnavailable(format!("token review failed: {}", e))
        })?;

        if !review.status.authenticated {
            tracing::debug!(
                target: "gateway.auth.token_review",
                error = %review.status.error,
                "cluster API rejected token"
            );
            return Err(AuthError::Denied(review.status.error));
        }

        Ok(Subject::new(review.status.user.username))
    }
}
