//! Deterministic signing keys and JWT claim builders for tests.
//!
//! Keypairs are Ed25519, derived from a one-byte seed so the same seed
//! always produces the same key. Claims are built as plain JSON values
//! and signed with `jsonwebtoken`.

use base64::engine::general_purpose;
use base64::Engine;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde_json::{json, Value};

/// A deterministic Ed25519 keypair for signing test tokens.
///
/// # Example
/// ```rust,ignore
/// let keypair = TestKeypair::new(1, "test-key");
/// let token = keypair.sign(&TestClaimsBuilder::new().subject("alice").build());
/// ```
pub struct TestKeypair {
    kid: String,
    public_key: Vec<u8>,
    pkcs8: Vec<u8>,
}

impl TestKeypair {
    /// Create a keypair from a seed byte. The same seed always produces
    /// the same keypair.
    ///
    /// # Panics
    /// Panics if key derivation fails (cannot happen for a 32-byte seed).
    pub fn new(seed: u8, kid: &str) -> Self {
        // Deterministic 32-byte seed from the input byte
        let mut seed_bytes = [0u8; 32];
        seed_bytes[0] = seed;
        for (i, byte) in seed_bytes.iter_mut().enumerate().skip(1) {
            *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
        }

        let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes)
            .expect("test keypair derivation should not fail");

        Self {
            kid: kid.to_string(),
            public_key: key_pair.public_key().as_ref().to_vec(),
            pkcs8: build_pkcs8_from_seed(&seed_bytes),
        }
    }

    /// Key id placed in signed token headers and the JWK.
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Public key as a PEM-encoded SubjectPublicKeyInfo document.
    pub fn public_key_pem(&self) -> String {
        // SPKI DER for Ed25519: fixed 12-byte prefix plus the raw key
        let mut der = vec![
            0x30, 0x2a, // SEQUENCE, 42 bytes
            0x30, 0x05, // AlgorithmIdentifier SEQUENCE, 5 bytes
            0x06, 0x03, 0x2b, 0x65, 0x70, // OID 1.3.101.112 (Ed25519)
            0x03, 0x21, 0x00, // BIT STRING, 33 bytes, no unused bits
        ];
        der.extend_from_slice(&self.public_key);

        format!(
            "-----BEGIN PUBLIC KEY-----\n{}\n-----END PUBLIC KEY-----\n",
            general_purpose::STANDARD.encode(der)
        )
    }

    /// Raw 32-byte public key.
    pub fn public_key_raw(&self) -> &[u8] {
        &self.public_key
    }

    /// Sign claims into a compact JWT with `alg: EdDSA` and this key's kid.
    ///
    /// # Panics
    /// Panics if signing fails.
    pub fn sign(&self, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(self.kid.clone());

        let key = EncodingKey::from_ed_der(&self.pkcs8);
        jsonwebtoken::encode(&header, claims, &key).expect("test token signing should not fail")
    }

    /// This key as a JWK (OKP/Ed25519) JSON object.
    pub fn jwk_json(&self) -> Value {
        json!({
            "kty": "OKP",
            "crv": "Ed25519",
            "kid": self.kid,
            "alg": "EdDSA",
            "use": "sig",
            "x": general_purpose::URL_SAFE_NO_PAD.encode(&self.public_key),
        })
    }

    /// A JWKS document containing the given keys.
    pub fn jwks_json(keys: &[&TestKeypair]) -> Value {
        json!({ "keys": keys.iter().map(|k| k.jwk_json()).collect::<Vec<_>>() })
    }
}

/// PKCS#8 v1 document from an Ed25519 seed.
///
/// Test-only; production keys come from the deployment, never from a
/// hardcoded seed.
fn build_pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    let mut pkcs8 = Vec::new();

    // Outer SEQUENCE, 46 bytes
    pkcs8.push(0x30);
    pkcs8.push(0x2e);

    // Version: INTEGER 0
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);

    // AlgorithmIdentifier: SEQUENCE { OID 1.3.101.112 }
    pkcs8.push(0x30);
    pkcs8.push(0x05);
    pkcs8.extend_from_slice(&[0x06, 0x03, 0x2b, 0x65, 0x70]);

    // PrivateKey: OCTET STRING wrapping OCTET STRING with the seed
    pkcs8.push(0x04);
    pkcs8.push(0x22);
    pkcs8.push(0x04);
    pkcs8.push(0x20);
    pkcs8.extend_from_slice(seed);

    pkcs8
}

/// Builder for test JWT claims.
///
/// # Example
/// ```rust,ignore
/// let claims = TestClaimsBuilder::new()
///     .subject("alice")
///     .audience("svc-a")
///     .expires_in(3600)
///     .build();
/// ```
pub struct TestClaimsBuilder {
    sub: String,
    exp: i64,
    iat: i64,
    nbf: Option<i64>,
    aud: Option<String>,
    iss: Option<String>,
}

impl TestClaimsBuilder {
    /// New builder: subject "test-subject", valid for an hour from now.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: "test-subject".to_string(),
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
            nbf: None,
            aud: None,
            iss: None,
        }
    }

    /// Set the subject.
    pub fn subject(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set expiration in seconds from now. Negative values produce an
    /// already-expired token.
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set not-before in seconds from now. Positive values produce a
    /// not-yet-valid token.
    pub fn not_before_in(mut self, seconds: i64) -> Self {
        self.nbf = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Set the audience.
    pub fn audience(mut self, audience: &str) -> Self {
        self.aud = Some(audience.to_string());
        self
    }

    /// Set the issuer.
    pub fn issuer(mut self, issuer: &str) -> Self {
        self.iss = Some(issuer.to_string());
        self
    }

    /// Build the claims as a JSON value.
    pub fn build(self) -> Value {
        let mut claims = json!({
            "sub": self.sub,
            "exp": self.exp,
            "iat": self.iat,
        });

        if let Some(nbf) = self.nbf {
            claims["nbf"] = json!(nbf);
        }
        if let Some(aud) = self.aud {
            claims["aud"] = json!(aud);
        }
        if let Some(iss) = self.iss {
            claims["iss"] = json!(iss);
        }

        claims
    }
}

impl Default for TestClaimsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
