//! Local JWT public-key verification strategy.
//!
//! The token is parsed and its signature verified against the single
//! configured public key; registered claims are then validated at
//! wall-clock "now". Three failure classes, all 401: malformed
//! structure, bad signature, claim violation.
//!
//! Claim validation is deliberately manual rather than delegated to the
//! JWT library: the validity window treats expiry as an exclusive bound
//! (`exp == now` is already expired) and applies no leeway.

use crate::auth::{keys::VerifyingKey, map_jwt_error, Subject, TokenVerifier};
use crate::errors::AuthError;
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, decode_header, Validation};
use serde::Deserialize;
use std::fmt;
use tracing::instrument;

/// Audience claim: a single string or an array of strings on the wire.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Audience::One(aud) => aud == expected,
            Audience::Many(auds) => auds.iter().any(|a| a == expected),
        }
    }
}

/// Registered claims this gateway acts on. Unknown claims are ignored.
#[derive(Clone, Deserialize)]
pub struct RegisteredClaims {
    /// Subject of the token; may be absent.
    #[serde(default)]
    pub sub: String,

    /// Expiration (exclusive), seconds since the Unix epoch.
    #[serde(default)]
    pub exp: Option<i64>,

    /// Not-before (inclusive), seconds since the Unix epoch.
    #[serde(default)]
    pub nbf: Option<i64>,

    /// Intended audiences.
    #[serde(default)]
    pub aud: Option<Audience>,
}

/// `sub` is an identity, so keep it out of debug output.
impl fmt::Debug for RegisteredClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredClaims")
            .field("sub", &"[REDACTED]")
            .field("exp", &self.exp)
            .field("nbf", &self.nbf)
            .field("aud", &self.aud)
            .finish()
    }
}

/// Validate claims against the expected audience at time `now`.
///
/// Checks that `now` falls within `[nbf, exp)` and, when an audience is
/// configured, that the token's audience set contains it. Absent window
/// claims are not checked; the audience check however fails closed when
/// expected but missing.
pub(crate) fn validate_claims(
    claims: &RegisteredClaims,
    expected_audience: Option<&str>,
    now: i64,
) -> Result<(), AuthError> {
    if let Some(nbf) = claims.nbf {
        if nbf > now {
            return Err(AuthError::ClaimInvalid(
                "token not valid yet (nbf)".to_string(),
            ));
        }
    }

    if let Some(exp) = claims.exp {
        if now >= exp {
            return Err(AuthError::ClaimInvalid("token is expired (exp)".to_string()));
        }
    }

    if let Some(expected) = expected_audience {
        let matched = claims
            .aud
            .as_ref()
            .map(|aud| aud.contains(expected))
            .unwrap_or(false);
        if !matched {
            return Err(AuthError::ClaimInvalid(format!(
                "invalid audience claim (expected {})",
                expected
            )));
        }
    }

    Ok(())
}

/// Verification strategy using a locally configured public key.
pub struct JwtVerifier {
    key: VerifyingKey,
    audience: Option<String>,
}

impl JwtVerifier {
    pub fn new(key: VerifyingKey, audience: Option<String>) -> Self {
        Self { key, audience }
    }

    fn decode_claims(&self, token: &str) -> Result<RegisteredClaims, AuthError> {
        let header = decode_header(token).map_err(map_jwt_error)?;

        if !self.key.admits(header.alg) {
            return Err(AuthError::SignatureInvalid(format!(
                "token algorithm {:?} not admitted by configured key",
                header.alg
            )));
        }

        // Signature verification only; the validity window and audience
        // are checked by validate_claims with exclusive-expiry semantics.
        let mut validation = Validation::new(header.alg);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims::<&str>(&[]);

        let data = decode::<RegisteredClaims>(token, &self.key.key, &validation)
            .map_err(map_jwt_error)?;
        Ok(data.claims)
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    #[instrument(skip_all, name = "gateway.auth.jwt")]
    async fn verify(&self, token: &str) -> Result<Subject, AuthError> {
        let claims = self.decode_claims(token)?;

        validate_claims(&claims, self.audience.as_deref(), Utc::now().timestamp())?;

        tracing::debug!(target: "gateway.auth.jwt", "token verified");
        Ok(Subject::new(claims.sub))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::keys::load_public_key;
    use gateway_test_utils::{TestClaimsBuilder, TestKeypair};

    const NOW: i64 = 1_700_000_000;

    fn claims(exp: Option<i64>, nbf: Option<i64>, aud: Option<Audience>) -> RegisteredClaims {
        RegisteredClaims {
            sub: "alice".to_string(),
            exp,
            nbf,
            aud,
        }
    }

    #[test]
    fn test_window_valid() {
        let c = claims(Some(NOW + 60), Some(NOW - 60), None);
        assert!(validate_claims(&c, None, NOW).is_ok());
    }

    #[test]
    fn test_expiry_is_exclusive() {
        // exp == now is already expired.
        let c = claims(Some(NOW), None, None);
        let err = validate_claims(&c, None, NOW).unwrap_err();
        assert!(matches!(err, AuthError::ClaimInvalid(msg) if msg.contains("expired")));
    }

    #[test]
    fn test_expiry_one_second_ahead_is_valid() {
        let c = claims(Some(NOW + 1), None, None);
        assert!(validate_claims(&c, None, NOW).is_ok());
    }

    #[test]
    fn test_nbf_in_future_is_invalid() {
        let c = claims(Some(NOW + 60), Some(NOW + 1), None);
        let err = validate_claims(&c, None, NOW).unwrap_err();
        assert!(matches!(err, AuthError::ClaimInvalid(msg) if msg.contains("nbf")));
    }

    #[test]
    fn test_nbf_equal_to_now_is_valid() {
        let c = claims(Some(NOW + 60), Some(NOW), None);
        assert!(validate_claims(&c, None, NOW).is_ok());
    }

    #[test]
    fn test_absent_window_claims_pass() {
        let c = claims(None, None, None);
        assert!(validate_claims(&c, None, NOW).is_ok());
    }

    #[test]
    fn test_audience_not_checked_when_unconfigured() {
        let c = claims(Some(NOW + 60), None, Some(Audience::One("svc-b".to_string())));
        assert!(validate_claims(&c, None, NOW).is_ok());
    }

    #[test]
    fn test_audience_mismatch() {
        let c = claims(
            Some(NOW + 60),
            None,
            Some(Audience::Many(vec!["svc-b".to_string()])),
        );
        let err = validate_claims(&c, Some("svc-a"), NOW).unwrap_err();
        assert!(matches!(err, AuthError::ClaimInvalid(msg) if msg.contains("audience")));
    }

    #[test]
    fn test_audience_match_in_set() {
        let c = claims(
            Some(NOW + 60),
            None,
            Some(Audience::Many(vec!["svc-b".to_string(), "svc-a".to_string()])),
        );
        assert!(validate_claims(&c, Some("svc-a"), NOW).is_ok());
    }

    #[test]
    fn test_expected_audience_with_no_aud_claim_fails() {
        let c = claims(Some(NOW + 60), None, None);
        assert!(validate_claims(&c, Some("svc-a"), NOW).is_err());
    }

    #[test]
    fn test_aud_deserializes_from_string_and_array() {
        let one: RegisteredClaims =
            serde_json::from_str(r#"{"sub":"a","aud":"svc-a"}"#).unwrap();
        assert_eq!(one.aud, Some(Audience::One("svc-a".to_string())));

        let many: RegisteredClaims =
            serde_json::from_str(r#"{"sub":"a","aud":["svc-a","svc-b"]}"#).unwrap();
        assert!(many.aud.unwrap().contains("svc-b"));
    }

    #[test]
    fn test_claims_debug_redacts_sub() {
        let c = claims(Some(NOW), None, None);
        let debug_str = format!("{:?}", c);
        assert!(!debug_str.contains("alice"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    fn verifier_for(keypair: &TestKeypair, audience: Option<&str>) -> JwtVerifier {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("auth-gateway-jwt-test-{}.pem", keypair.kid()));
        std::fs::write(&path, keypair.public_key_pem()).unwrap();
        let key = load_public_key(&path).unwrap();
        std::fs::remove_file(&path).ok();
        JwtVerifier::new(key, audience.map(str::to_string))
    }

    #[tokio::test]
    async fn test_verify_valid_token() {
        let keypair = TestKeypair::new(1, "jwt-unit-key");
        let verifier = verifier_for(&keypair, None);

        let token = keypair.sign(&TestClaimsBuilder::new().subject("alice").build());

        let subject = verifier.verify(&token).await.expect("token should verify");
        assert_eq!(subject.name(), "alice");
    }

    #[tokio::test]
    async fn test_verify_is_idempotent() {
        let keypair = TestKeypair::new(1, "jwt-unit-key");
        let verifier = verifier_for(&keypair, None);
        let token = keypair.sign(&TestClaimsBuilder::new().subject("alice").build());

        let first = verifier.verify(&token).await.unwrap();
        let second = verifier.verify(&token).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_verify_rejects_garbage() {
        let keypair = TestKeypair::new(1, "jwt-unit-key");
        let verifier = verifier_for(&keypair, None);

        let err = verifier.verify("not.a.jwt").await.unwrap_err();
        assert!(matches!(err, AuthError::MalformedToken(_)));
    }

    #[tokio::test]
    async fn test_verify_rejects_wrong_key() {
        let keypair = TestKeypair::new(1, "jwt-unit-key");
        let other = TestKeypair::new(2, "other-key");
        let verifier = verifier_for(&keypair, None);

        let token = other.sign(&TestClaimsBuilder::new().subject("mallory").build());

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::SignatureInvalid(_)));
    }

    #[tokio::test]
    async fn test_verify_rejects_expired() {
        let keypair = TestKeypair::new(1, "jwt-unit-key");
        let verifier = verifier_for(&keypair, None);

        let token = keypair.sign(
            &TestClaimsBuilder::new()
                .subject("alice")
                .expires_in(-60)
                .build(),
        );

        let err = verifier.verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::ClaimInvalid(_)));
    }
}
