//! HS256 bearer tokens.
//!
//! Tokens use the JWT compact layout (`header.claims.signature`, each part
//! base64url without padding) signed with HMAC-SHA256, so standard JWT
//! tooling can decode them.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use nellore_market_core::{UserId, UserRole};

use crate::models::User;

type HmacSha256 = Hmac<Sha256>;

const HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Errors from issuing or verifying a token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("unsupported token algorithm")]
    UnsupportedAlgorithm,
    #[error("bad signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("invalid signing key")]
    InvalidKey,
}

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub email: String,
    pub role: UserRole,
    /// Issued-at, Unix seconds.
    pub iat: i64,
    /// Expiry, Unix seconds.
    pub exp: i64,
}

#[derive(Deserialize)]
struct Header {
    alg: String,
}

/// Issues and verifies tokens with one secret and lifetime.
#[derive(Clone)]
pub struct TokenSigner {
    mac: HmacSha256,
    ttl_secs: i64,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// # Errors
    ///
    /// Returns `TokenError::InvalidKey` if the secret cannot key HMAC.
    pub fn new(secret: &SecretString, ttl: Duration) -> Result<Self, TokenError> {
        let mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
            .map_err(|_| TokenError::InvalidKey)?;
        Ok(Self {
            mac,
            ttl_secs: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
        })
    }

    /// Issue a token for `user` valid from now.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Malformed` if the claims cannot be serialized.
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        self.issue_at(user, Utc::now().timestamp())
    }

    /// Issue a token as if the clock read `now` (Unix seconds).
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Malformed` if the claims cannot be serialized.
    pub fn issue_at(&self, user: &User, now: i64) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user.id,
            email: user.email.as_str().to_owned(),
            role: user.role,
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
        };
        let payload = serde_json::to_vec(&claims).map_err(|_| TokenError::Malformed)?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER_JSON),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let signature = self.sign(signing_input.as_bytes());
        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Verify signature and expiry, returning the claims.
    ///
    /// # Errors
    ///
    /// Returns a `TokenError` describing why the token was rejected.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify as if the clock read `now` (Unix seconds).
    ///
    /// # Errors
    ///
    /// Returns a `TokenError` describing why the token was rejected.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let header: Header = decode_json(header_b64)?;
        if header.alg != "HS256" {
            return Err(TokenError::UnsupportedAlgorithm);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Malformed)?;
        let mut mac = self.mac.clone();
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims: Claims = decode_json(payload_b64)?;
        if claims.exp <= now {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    fn sign(&self, input: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(input);
        mac.finalize().into_bytes().to_vec()
    }
}

fn decode_json<T: for<'de> Deserialize<'de>>(part: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nellore_market_core::Email;

    fn signer(secret: &str) -> TokenSigner {
        TokenSigner::new(
            &SecretString::from(secret.to_string()),
            Duration::from_secs(7 * 24 * 3600),
        )
        .unwrap()
    }

    fn user() -> User {
        User {
            id: UserId::new(42),
            name: "Lakshmi".to_string(),
            email: Email::parse("lakshmi@nellore.com").unwrap(),
            phone: None,
            role: UserRole::Vendor,
            avatar: None,
            address: None,
            city: "Nellore".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let signer = signer("k3y-for-tests-Zq9!mW2#pL7vX4@nR8");
        let token = signer.issue_at(&user(), 1_000).unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert!(token.starts_with("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9."));

        let claims = signer.verify_at(&token, 2_000).unwrap();
        assert_eq!(claims.sub, UserId::new(42));
        assert_eq!(claims.role, UserRole::Vendor);
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 3600);
    }

    #[test]
    fn test_expired_token() {
        let signer = signer("k3y-for-tests-Zq9!mW2#pL7vX4@nR8");
        let token = signer.issue_at(&user(), 1_000).unwrap();
        assert_eq!(
            signer.verify_at(&token, 1_000 + 7 * 24 * 3600),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_wrong_secret_is_bad_signature() {
        let token = signer("first-key-Zq9!mW2#pL7vX4@nR8abcd")
            .issue_at(&user(), 1_000)
            .unwrap();
        assert_eq!(
            signer("second-key-Zq9!mW2#pL7vX4@nR8abc").verify_at(&token, 1_001),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let signer = signer("k3y-for-tests-Zq9!mW2#pL7vX4@nR8");
        let token = signer.issue_at(&user(), 1_000).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged_claims = URL_SAFE_NO_PAD.encode(
            r#"{"sub":1,"email":"a@b.co","role":"admin","iat":1000,"exp":99999999999}"#,
        );
        let forged = format!("{}.{}.{}", parts[0], forged_claims, parts[2]);
        assert_eq!(signer.verify_at(&forged, 1_001), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_malformed_tokens() {
        let signer = signer("k3y-for-tests-Zq9!mW2#pL7vX4@nR8");
        assert_eq!(signer.verify_at("abc", 0), Err(TokenError::Malformed));
        assert_eq!(signer.verify_at("a.b.c.d", 0), Err(TokenError::Malformed));

        let none_header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#);
        assert_eq!(
            signer.verify_at(&format!("{none_header}.e30.x"), 0),
            Err(TokenError::UnsupportedAlgorithm)
        );
    }
}
