//! Signed credential payloads. Credentials are compact HS256-signed tokens
//! carrying the subject id, an issuance uniqueness id, the credential kind
//! and the expiry instant. Verification distinguishes a malformed or badly
//! signed payload from an expired one and from a kind mismatch.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user) id.
    pub sub: String,
    /// Issuance uniqueness id; two issuances for the same subject never share one.
    pub jti: String,
    pub kind: TokenKind,
    /// Issued-at, epoch seconds.
    pub iat: i64,
    /// Expiry, epoch seconds. A credential is valid strictly before this instant.
    pub exp: i64,
}

pub fn sign(cfg: &AuthConfig, claims: &Claims) -> AppResult<String> {
    encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(cfg.secret.as_bytes()))
        .map_err(|e| AppError::internal("token_sign".to_string(), e.to_string()))
}

/// Decode and verify a raw credential: signature and shape first, then
/// expiry, then kind. Expiry is compared here against `exp` directly (no
/// leeway) so a zero-TTL credential is expired the moment it is minted.
pub fn verify(cfg: &AuthConfig, raw: &str, expected: TokenKind) -> AppResult<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();
    let data = decode::<Claims>(raw, &DecodingKey::from_secret(cfg.secret.as_bytes()), &validation)
        .map_err(|e| AppError::token_invalid(e.to_string()))?;
    let claims = data.claims;
    if Utc::now().timestamp() >= claims.exp {
        return Err(AppError::TokenExpired);
    }
    if claims.kind != expected {
        return Err(AppError::wrong_type(expected.as_str(), claims.kind.as_str()));
    }
    Ok(claims)
}
