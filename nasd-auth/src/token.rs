//! Signed token issuance and validation (§3 Signed Token, §4.6 Issuance),
//! adapted from the teacher's `r2e-oidc::TokenService` (which signs RS256
//! via an externally-provisioned key pair) to this daemon's requirement:
//! an HMAC-family algorithm with a secret established at boot, never
//! persisted.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use nasd_core::clock::unix_now_secs;
use nasd_core::permissions::Role;
use serde::{Deserialize, Serialize};

use crate::principal::Principal;

pub const TOKEN_TTL_SECONDS: u64 = 24 * 3600;
const ISSUER: &str = "nasd";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub role: Role,
    pub iat: u64,
    pub nbf: u64,
    pub exp: u64,
    pub iss: String,
}

#[derive(Debug)]
pub enum TokenError {
    Expired,
    NotYetValid,
    Invalid(String),
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Expired => write!(f, "token expired"),
            TokenError::NotYetValid => write!(f, "token not yet valid"),
            TokenError::Invalid(msg) => write!(f, "invalid token: {msg}"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Generate a fresh 256-bit secret. Used at boot when no `auth.jwt_secret`
/// is configured; never persisted to disk.
pub fn generate_secret() -> Vec<u8> {
    use rand::RngCore;
    let mut bytes = vec![0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenService {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    pub fn issue(&self, principal: &Principal) -> Result<(String, u64), TokenError> {
        let now = unix_now_secs();
        let exp = now + TOKEN_TTL_SECONDS;
        let claims = Claims {
            sub: principal.id.clone(),
            name: principal.display_name.clone(),
            role: principal.role,
            iat: now,
            nbf: now,
            exp,
            iss: ISSUER.to_string(),
        };
        let header = Header::new(Algorithm::HS256);
        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;
        Ok((token, TOKEN_TTL_SECONDS))
    }

    /// Validate signature, expiry, and not-before. `jsonwebtoken`'s
    /// built-in `exp`/`nbf` checks enforce the latter two; a mapped error
    /// distinguishes expiry from a structurally invalid token.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.validate_nbf = true;

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(TokenError::Expired),
                jsonwebtoken::errors::ErrorKind::ImmatureSignature => Err(TokenError::NotYetValid),
                other => Err(TokenError::Invalid(other.to_string())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal() -> Principal {
        Principal::new("p1", "Jane", Role::Operator, "uma_abc")
    }

    #[test]
    fn issued_token_round_trips() {
        let svc = TokenService::new(b"test-secret-0123456789");
        let (token, ttl) = svc.issue(&principal()).unwrap();
        assert_eq!(ttl, TOKEN_TTL_SECONDS);
        let claims = svc.validate(&token).unwrap();
        assert_eq!(claims.sub, "p1");
        assert_eq!(claims.role, Role::Operator);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let svc1 = TokenService::new(b"secret-one-aaaaaaaaaaaa");
        let svc2 = TokenService::new(b"secret-two-bbbbbbbbbbbb");
        let (token, _) = svc1.issue(&principal()).unwrap();
        assert!(svc2.validate(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = TokenService::new(b"test-secret-0123456789");
        let now = unix_now_secs();
        let claims = Claims {
            sub: "p1".into(),
            name: "Jane".into(),
            role: Role::Viewer,
            iat: now - 1000,
            nbf: now - 1000,
            exp: now - 10,
            iss: ISSUER.to_string(),
        };
        let header = Header::new(Algorithm::HS256);
        let token = encode(&header, &claims, &svc.encoding_key).unwrap();
        match svc.validate(&token) {
            Err(TokenError::Expired) => {}
            other => panic!("expected Expired, got {other:?}"),
        }
    }
}
