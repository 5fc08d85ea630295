//! Credential lifecycle: issuing, rotating, revoking and garbage-collecting
//! session tokens. Issued credentials live as rows in `security.tokens`;
//! a row is created `active=true`, flips to `active=false` on logout,
//! rotation or account deletion, and is hard-deleted only from that revoked
//! state by `purge_inactive`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};
use crate::store::{Row, Store};

use super::claims::{self, Claims, TokenKind};
use super::principal::Subject;

pub const TOKENS_TABLE: &str = "security.tokens";

/// One issued credential row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenRecord {
    pub user_id: String,
    pub kind: TokenKind,
    /// The opaque signed payload exactly as handed to the client.
    pub value: String,
    /// Issuance uniqueness id mirrored from the claims.
    pub jti: String,
    /// Epoch millis.
    pub issued_at: i64,
    /// Epoch seconds, mirrors the `exp` claim.
    pub expires_at: i64,
    pub active: bool,
}

impl TokenRecord {
    pub fn to_row(&self) -> Row {
        match serde_json::to_value(self) {
            Ok(Value::Object(m)) => m,
            _ => Row::new(),
        }
    }

    pub fn from_row(row: &Row) -> Option<TokenRecord> {
        serde_json::from_value(Value::Object(row.clone())).ok()
    }
}

fn row_matches(row: &Row, user_id: &str, kind: Option<TokenKind>) -> bool {
    let user_ok = row.get("user_id").and_then(|v| v.as_str()) == Some(user_id);
    let kind_ok = match kind {
        None => true,
        Some(k) => row.get("kind").and_then(|v| v.as_str()) == Some(k.as_str()),
    };
    user_ok && kind_ok
}

/// Issues, validates and revokes credentials against the shared store.
/// Construction takes the immutable [`AuthConfig`]; nothing here reads
/// ambient process state.
pub struct TokenManager {
    store: Store,
    cfg: AuthConfig,
}

impl TokenManager {
    pub fn new(store: Store, cfg: AuthConfig) -> Self { Self { store, cfg } }

    pub fn config(&self) -> &AuthConfig { &self.cfg }

    fn ttl_secs(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.cfg.access_ttl.as_secs() as i64,
            TokenKind::Refresh => self.cfg.refresh_ttl.as_secs() as i64,
        }
    }

    /// Sign and persist a fresh `active=true` credential for the subject.
    ///
    /// This does not touch prior rows: callers minting a login or rotation
    /// must call [`TokenManager::deactivate`] first, and that deactivation
    /// must have completed before `issue` runs, or the one-active-credential
    /// rule breaks.
    pub fn issue(&self, subject: &Subject, kind: TokenKind) -> AppResult<TokenRecord> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.user_id.clone(),
            jti: Uuid::new_v4().to_string(),
            kind,
            iat: now.timestamp(),
            exp: now.timestamp() + self.ttl_secs(kind),
        };
        let value = claims::sign(&self.cfg, &claims)?;
        let rec = TokenRecord {
            user_id: subject.user_id.clone(),
            kind,
            value,
            jti: claims.jti,
            issued_at: now.timestamp_millis(),
            expires_at: claims.exp,
            active: true,
        };
        self.store.insert(TOKENS_TABLE, rec.to_row()).map_err(AppError::from)?;
        debug!(target: "lobbyd::tokens", "issue user={} kind={} jti={}", rec.user_id, kind, rec.jti);
        Ok(rec)
    }

    /// Flip `active=false` on all of the subject's credentials of the given
    /// kind (all kinds when `None`). Idempotent.
    pub fn deactivate(&self, user_id: &str, kind: Option<TokenKind>) -> AppResult<()> {
        let n = self
            .store
            .update_where(
                TOKENS_TABLE,
                |row| row_matches(row, user_id, kind),
                |row| {
                    row.insert("active".to_string(), Value::Bool(false));
                },
            )
            .map_err(AppError::from)?;
        debug!(target: "lobbyd::tokens", "deactivate user={} kind={:?} rows={}", user_id, kind.map(|k| k.as_str()), n);
        Ok(())
    }

    /// Full login issuance: revoke everything the subject holds, then mint
    /// one access and one refresh credential.
    pub fn login(&self, subject: &Subject) -> AppResult<(TokenRecord, TokenRecord)> {
        self.deactivate(&subject.user_id, None)?;
        let access = self.issue(subject, TokenKind::Access)?;
        let refresh = self.issue(subject, TokenKind::Refresh)?;
        Ok((access, refresh))
    }

    /// Rotate the access credential off a valid refresh credential. Only the
    /// access kind is deactivated; the presented refresh credential stays
    /// active and keeps its original expiry.
    pub fn refresh(&self, raw_refresh: &str) -> AppResult<TokenRecord> {
        let subject = self.validate(raw_refresh, TokenKind::Refresh)?;
        self.deactivate(&subject.user_id, Some(TokenKind::Access))?;
        self.issue(&subject, TokenKind::Access)
    }

    /// Validate a presented credential and resolve its subject.
    ///
    /// Check order: signature/shape, expiry, embedded kind, then an
    /// `active=true` row holding this exact value. Only after all of those
    /// pass is the subject looked up in the user catalog; a valid credential
    /// whose user row has vanished reports the same kind as a revoked one.
    pub fn validate(&self, raw: &str, expected: TokenKind) -> AppResult<Subject> {
        let claims = claims::verify(&self.cfg, raw, expected)?;
        let rows = self.store.scan(TOKENS_TABLE).map_err(AppError::from)?;
        let live = rows
            .iter()
            .any(|row| {
                row.get("value").and_then(|v| v.as_str()) == Some(raw)
                    && row.get("active").and_then(|v| v.as_bool()).unwrap_or(false)
            });
        if !live {
            return Err(AppError::TokenRevoked);
        }
        let Some(user) = crate::security::find_by_id(&self.store, &claims.sub)? else {
            return Err(AppError::TokenRevoked);
        };
        Ok(Subject { user_id: user.id, username: user.username, role: user.role })
    }

    /// Hard-delete revoked rows, for one subject or store-wide. Returns the
    /// number of rows removed. This is the only destructor for credential
    /// rows; `active=true` rows are never touched.
    pub fn purge_inactive(&self, user_id: Option<&str>) -> AppResult<usize> {
        let removed = self
            .store
            .delete_where(TOKENS_TABLE, |row| {
                let inactive = !row.get("active").and_then(|v| v.as_bool()).unwrap_or(true);
                let scoped = match user_id {
                    None => true,
                    Some(u) => row.get("user_id").and_then(|v| v.as_str()) == Some(u),
                };
                inactive && scoped
            })
            .map_err(AppError::from)?;
        debug!(target: "lobbyd::tokens", "purge_inactive scope={:?} removed={}", user_id, removed);
        Ok(removed)
    }
}

#[path = "tokens_tests.rs"]
#[cfg(test)]
mod tokens_tests;
