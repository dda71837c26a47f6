//! End-to-end tests for the OIDC discovery strategy.
//!
//! A wiremock server plays the provider: it serves the discovery
//! document and the JWKS, and signs nothing itself; tokens come from
//! the deterministic test keypairs.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use auth_gateway::auth::oidc::OidcVerifier;
use gateway_test_utils::{TestClaimsBuilder, TestGateway, TestKeypair};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";
const JWKS_PATH: &str = "/keys";

/// Serve discovery metadata and a JWKS with the given keys.
async fn mount_provider(provider: &MockServer, keys: &[&TestKeypair]) {
    let issuer = provider.uri();

    Mock::given(method("GET"))
        .and(path(DISCOVERY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "issuer": issuer,
            "jwks_uri": format!("{}{}", issuer, JWKS_PATH),
        })))
        .mount(provider)
        .await;

    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(TestKeypair::jwks_json(keys)))
        .mount(provider)
        .await;
}

async fn get(gateway: &TestGateway, token: &str) -> Result<(u16, String)> {
    let response = reqwest::Client::new()
        .get(format!("{}/greet", gateway.url()))
        .bearer_auth(token)
        .send()
        .await?;

    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok((status, body))
}

#[tokio::test]
async fn test_provider_issued_token_greets_subject() -> Result<()> {
    let keypair = TestKeypair::new(1, "provider-key");
    let provider = MockServer::start().await;
    mount_provider(&provider, &[&keypair]).await;

    let verifier =
        OidcVerifier::discover(reqwest::Client::new(), &provider.uri(), None).await?;
    let gateway = TestGateway::spawn(Arc::new(verifier)).await?;

    let token = keypair.sign(
        &TestClaimsBuilder::new()
            .subject("alice")
            .issuer(&provider.uri())
            .build(),
    );
    let (status, body) = get(&gateway, &token).await?;

    assert_eq!(status, 200);
    assert_eq!(body, "hello alice");
    Ok(())
}

#[tokio::test]
async fn test_wrong_issuer_claim_is_unauthorized() -> Result<()> {
    let keypair = TestKeypair::new(1, "provider-key");
    let provider = MockServer::start().await;
    mount_provider(&provider, &[&keypair]).await;

    let verifier =
        OidcVerifier::discover(reqwest::Client::new(), &provider.uri(), None).await?;
    let gateway = TestGateway::spawn(Arc::new(verifier)).await?;

    let token = keypair.sign(
        &TestClaimsBuilder::new()
            .subject("alice")
            .issuer("https://somebody-else.example.com")
            .build(),
    );
    let (status, body) = get(&gateway, &token).await?;

    assert_eq!(status, 401);
    assert!(body.starts_with("Unauthorized:"), "body was: {}", body);
    Ok(())
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() -> Result<()> {
    let keypair = TestKeypair::new(1, "provider-key");
    let provider = MockServer::start().await;
    mount_provider(&provider, &[&keypair]).await;

    let verifier =
        OidcVerifier::discover(reqwest::Client::new(), &provider.uri(), None).await?;
    let gateway = TestGateway::spawn(Arc::new(verifier)).await?;

    let token = keypair.sign(
        &TestClaimsBuilder::new()
            .subject("alice")
            .issuer(&provider.uri())
            .expires_in(-600)
            .build(),
    );
    let (status, _body) = get(&gateway, &token).await?;

    assert_eq!(status, 401);
    Ok(())
}

#[tokio::test]
async fn test_recently_expired_token_is_unauthorized() -> Result<()> {
    // Expiry is exact: a token seconds past exp must not slip through
    // on clock tolerance.
    let keypair = TestKeypair::new(1, "provider-key");
    let provider = MockServer::start().await;
    mount_provider(&provider, &[&keypair]).await;

    let verifier =
        OidcVerifier::discover(reqwest::Client::new(), &provider.uri(), None).await?;
    let gateway = TestGateway::spawn(Arc::new(verifier)).await?;

    let token = keypair.sign(
        &TestClaimsBuilder::new()
            .subject("alice")
            .issuer(&provider.uri())
            .expires_in(-30)
            .build(),
    );
    let (status, body) = get(&gateway, &token).await?;

    assert_eq!(status, 401);
    assert!(body.starts_with("Unauthorized:"), "body was: {}", body);
    Ok(())
}

#[tokio::test]
async fn test_unknown_key_id_is_unauthorized() -> Result<()> {
    let published = TestKeypair::new(1, "provider-key");
    let rogue = TestKeypair::new(2, "rogue-key");
    let provider = MockServer::start().await;
    mount_provider(&provider, &[&published]).await;

    let verifier =
        OidcVerifier::discover(reqwest::Client::new(), &provider.uri(), None).await?;
    let gateway = TestGateway::spawn(Arc::new(verifier)).await?;

    let token = rogue.sign(
        &TestClaimsBuilder::new()
            .subject("mallory")
            .issuer(&provider.uri())
            .build(),
    );
    let (status, body) = get(&gateway, &token).await?;

    assert_eq!(status, 401);
    assert!(body.starts_with("Unauthorized:"), "body was: {}", body);
    Ok(())
}

#[tokio::test]
async fn test_audience_is_enforced_when_configured() -> Result<()> {
    let keypair = TestKeypair::new(1, "provider-key");
    let provider = MockServer::start().await;
    mount_provider(&provider, &[&keypair]).await;

    let verifier = OidcVerifier::discover(
        reqwest::Client::new(),
        &provider.uri(),
        Some("svc-a".to_string()),
    )
    .await?;
    let gateway = TestGateway::spawn(Arc::new(verifier)).await?;

    let wrong = keypair.sign(
        &TestClaimsBuilder::new()
            .subject("alice")
            .issuer(&provider.uri())
            .audience("svc-b")
            .build(),
    );
    let (status, _) = get(&gateway, &wrong).await?;
    assert_eq!(status, 401);

    let right = keypair.sign(
        &TestClaimsBuilder::new()
            .subject("alice")
            .issuer(&provider.uri())
            .audience("svc-a")
            .build(),
    );
    let (status, body) = get(&gateway, &right).await?;
    assert_eq!(status, 200);
    assert_eq!(body, "hello alice");
    Ok(())
}

#[tokio::test]
async fn test_unreachable_jwks_is_unauthorized_not_a_system_error() -> Result<()> {
    // The provider was discovered once, then its key endpoint went away.
    // Key fetching is part of verification, so the caller sees 401.
    let keypair = TestKeypair::new(1, "provider-key");
    let issuer = "http://127.0.0.1:1".to_string();

    let verifier = OidcVerifier::from_parts(
        reqwest::Client::new(),
        issuer.clone(),
        "http://127.0.0.1:1/keys".to_string(),
        None,
    );
    let gateway = TestGateway::spawn(Arc::new(verifier)).await?;

    let token = keypair.sign(
        &TestClaimsBuilder::new()
            .subject("alice")
            .issuer(&issuer)
            .build(),
    );
    let (status, body) = get(&gateway, &token).await?;

    assert_eq!(status, 401);
    assert!(
        body.starts_with("Unauthorized: fetching signing keys"),
        "body was: {}",
        body
    );
    Ok(())
}

#[tokio::test]
async fn test_discovery_issuer_mismatch_fails_startup() -> Result<()> {
    let provider = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DISCOVERY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "issuer": "https://somebody-else.example.com",
            "jwks_uri": format!("{}{}", provider.uri(), JWKS_PATH),
        })))
        .mount(&provider)
        .await;

    let result = OidcVerifier::discover(reqwest::Client::new(), &provider.uri(), None).await;
    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_key_rotation_is_picked_up() -> Result<()> {
    // Publish key A, discover, then swap the JWKS to key B. A token
    // signed with B must verify once the cache refreshes for its kid.
    let old_key = TestKeypair::new(1, "old-key");
    let new_key = TestKeypair::new(2, "new-key");
    let provider = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DISCOVERY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "issuer": provider.uri(),
            "jwks_uri": format!("{}{}", provider.uri(), JWKS_PATH),
        })))
        .mount(&provider)
        .await;

    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(TestKeypair::jwks_json(&[&old_key])),
        )
        .up_to_n_times(1)
        .mount(&provider)
        .await;

    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(TestKeypair::jwks_json(&[&new_key])),
        )
        .mount(&provider)
        .await;

    let verifier =
        OidcVerifier::discover(reqwest::Client::new(), &provider.uri(), None).await?;
    let gateway = TestGateway::spawn(Arc::new(verifier)).await?;

    // First request caches the old key
    let old_token = old_key.sign(
        &TestClaimsBuilder::new()
            .subject("alice")
            .issuer(&provider.uri())
            .build(),
    );
    let (status, _) = get(&gateway, &old_token).await?;
    assert_eq!(status, 200);

    // The new kid misses the cache and forces a refresh
    let new_token = new_key.sign(
        &TestClaimsBuilder::new()
            .subject("bob")
            .issuer(&provider.uri())
            .build(),
    );
    let (status, body) = get(&gateway, &new_token).await?;
    assert_eq!(status, 200);
    assert_eq!(body, "hello bob");
    Ok(())
}
