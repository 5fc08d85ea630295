//! Unified application error model and mapping helpers.
//! This module provides a common error enum used across the HTTP surface,
//! the token lifecycle and the query engine, along with a mapper to HTTP
//! status codes. Token and access-control failures are terminal for the
//! current request; nothing here is retried.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// Caller-facing validation failure, e.g. an update supplying no fields.
    #[error("{code}: {message}")]
    UserInput { code: String, message: String },
    #[error("{code}: {message}")]
    NotFound { code: String, message: String },
    #[error("{code}: {message}")]
    Conflict { code: String, message: String },
    /// No credential was presented, or it could not be read at all.
    #[error("unauthenticated: {message}")]
    Unauthenticated { message: String },
    /// Bad signature or malformed payload.
    #[error("invalid token: {message}")]
    TokenInvalid { message: String },
    #[error("token expired")]
    TokenExpired,
    /// Kind embedded in the credential differs from what the caller requires.
    #[error("wrong token type: expected {expected}, got {actual}")]
    TokenWrongType { expected: String, actual: String },
    /// Well-formed and unexpired, but no active row in the credential store.
    #[error("token revoked or unknown")]
    TokenRevoked,
    /// Authenticated but role/ownership insufficient.
    #[error("requires role {required} or higher")]
    Forbidden { required: String },
    /// A store operation could not complete; no partial results.
    #[error("store failure: {message}")]
    Store { message: String },
    #[error("{code}: {message}")]
    Internal { code: String, message: String },
}

impl AppError {
    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn no_data<S: Into<String>>(msg: S) -> Self { AppError::UserInput { code: "no_data".into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn conflict<S: Into<String>>(code: S, msg: S) -> Self { AppError::Conflict { code: code.into(), message: msg.into() } }
    pub fn unauthenticated<S: Into<String>>(msg: S) -> Self { AppError::Unauthenticated { message: msg.into() } }
    pub fn token_invalid<S: Into<String>>(msg: S) -> Self { AppError::TokenInvalid { message: msg.into() } }
    pub fn wrong_type<S: Into<String>>(expected: S, actual: S) -> Self {
        AppError::TokenWrongType { expected: expected.into(), actual: actual.into() }
    }
    pub fn forbidden<S: Into<String>>(required: S) -> Self { AppError::Forbidden { required: required.into() } }
    pub fn store<S: Into<String>>(msg: S) -> Self { AppError::Store { message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Stable machine-readable code for logs and response bodies.
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
            AppError::Unauthenticated { .. } => "unauthenticated",
            AppError::TokenInvalid { .. } => "token_invalid",
            AppError::TokenExpired => "token_expired",
            AppError::TokenWrongType { .. } => "token_wrong_type",
            AppError::TokenRevoked => "token_revoked",
            AppError::Forbidden { .. } => "forbidden",
            AppError::Store { .. } => "store_failure",
        }
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::NotFound { .. } => 404,
            AppError::Conflict { .. } => 409,
            AppError::Unauthenticated { .. }
            | AppError::TokenInvalid { .. }
            | AppError::TokenExpired
            | AppError::TokenWrongType { .. }
            | AppError::TokenRevoked => 401,
            AppError::Forbidden { .. } => 403,
            AppError::Store { .. } => 503,
            AppError::Internal { .. } => 500,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Store-internal errors bubble out of the persistence layer as anyhow
        AppError::Store { message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::user("bad_input", "oops").http_status(), 400);
        assert_eq!(AppError::no_data("nothing to update").http_status(), 400);
        assert_eq!(AppError::not_found("not_found", "missing").http_status(), 404);
        assert_eq!(AppError::conflict("conflict", "dup").http_status(), 409);
        assert_eq!(AppError::unauthenticated("no header").http_status(), 401);
        assert_eq!(AppError::token_invalid("garbage").http_status(), 401);
        assert_eq!(AppError::TokenExpired.http_status(), 401);
        assert_eq!(AppError::wrong_type("access", "refresh").http_status(), 401);
        assert_eq!(AppError::TokenRevoked.http_status(), 401);
        assert_eq!(AppError::forbidden("moderator").http_status(), 403);
        assert_eq!(AppError::store("io").http_status(), 503);
        assert_eq!(AppError::internal("internal", "panic").http_status(), 500);
    }

    #[test]
    fn code_strings_are_stable() {
        assert_eq!(AppError::no_data("x").code_str(), "no_data");
        assert_eq!(AppError::TokenExpired.code_str(), "token_expired");
        assert_eq!(AppError::TokenRevoked.code_str(), "token_revoked");
        assert_eq!(AppError::forbidden("admin").code_str(), "forbidden");
    }

    #[test]
    fn serializes_with_type_tag() {
        let v = serde_json::to_value(AppError::TokenExpired).unwrap();
        assert_eq!(v.get("type").and_then(|t| t.as_str()), Some("token_expired"));
        let v = serde_json::to_value(AppError::wrong_type("access", "refresh")).unwrap();
        assert_eq!(v.get("type").and_then(|t| t.as_str()), Some("token_wrong_type"));
        assert_eq!(v.get("expected").and_then(|t| t.as_str()), Some("access"));
    }
}
