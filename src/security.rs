//! User catalog and password handling. Users live in `security.users` with
//! Argon2 PHC password hashes; authentication resolves a username/password
//! pair to a user record, and account deletion triggers the credential
//! cleanup for that subject.

use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use password_hash::{PasswordHash, SaltString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::identity::{Role, TokenManager};
use crate::store::{Row, Store};

pub const USERS_TABLE: &str = "security.users";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    /// Epoch millis.
    pub created_at: i64,
    pub updated_at: i64,
}

impl UserRecord {
    fn to_row(&self) -> Row {
        match serde_json::to_value(self) {
            Ok(Value::Object(m)) => m,
            _ => Row::new(),
        }
    }

    fn from_row(row: &Row) -> Option<UserRecord> {
        serde_json::from_value(Value::Object(row.clone())).ok()
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2.hash_password(password.as_bytes(), &salt).map_err(|e| anyhow!(e.to_string()))?.to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else { false }
}

/// Provision the bootstrap administrator on first run. The password comes
/// from `LOBBYD_ADMIN_PASSWORD` when set and falls back to "admin" for
/// development stores.
pub fn ensure_default_admin(store: &Store) -> Result<()> {
    if find_by_username(store, "admin").map_err(|e| anyhow!(e.to_string()))?.is_some() {
        return Ok(());
    }
    let password = std::env::var("LOBBYD_ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string());
    add_user(store, "admin", &password, Role::Admin).map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

pub fn add_user(store: &Store, username: &str, password: &str, role: Role) -> AppResult<UserRecord> {
    if find_by_username(store, username)?.is_some() {
        return Err(AppError::conflict("username_taken", "a user with this name already exists"));
    }
    let now = Utc::now().timestamp_millis();
    let rec = UserRecord {
        id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        password_hash: hash_password(password)
            .map_err(|e| AppError::internal("password_hash".to_string(), e.to_string()))?,
        role,
        created_at: now,
        updated_at: now,
    };
    store.insert(USERS_TABLE, rec.to_row()).map_err(AppError::from)?;
    Ok(rec)
}

/// Case-insensitive username lookup.
pub fn find_by_username(store: &Store, username: &str) -> AppResult<Option<UserRecord>> {
    let rows = store.scan(USERS_TABLE).map_err(AppError::from)?;
    Ok(rows
        .iter()
        .filter_map(UserRecord::from_row)
        .find(|u| u.username.eq_ignore_ascii_case(username)))
}

pub fn find_by_id(store: &Store, id: &str) -> AppResult<Option<UserRecord>> {
    let rows = store.scan(USERS_TABLE).map_err(AppError::from)?;
    Ok(rows.iter().filter_map(UserRecord::from_row).find(|u| u.id == id))
}

/// Resolve a username/password pair; `None` covers both unknown user and
/// bad password so callers cannot distinguish the two.
pub fn authenticate(store: &Store, username: &str, password: &str) -> AppResult<Option<UserRecord>> {
    let Some(user) = find_by_username(store, username)? else { return Ok(None) };
    if verify_password(&user.password_hash, password) {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

/// Update password and/or role. Supplying neither is a caller error.
pub fn alter_user(
    store: &Store,
    id: &str,
    new_password: Option<&str>,
    new_role: Option<Role>,
) -> AppResult<UserRecord> {
    if new_password.is_none() && new_role.is_none() {
        return Err(AppError::no_data("nothing to update"));
    }
    if find_by_id(store, id)?.is_none() {
        return Err(AppError::not_found("user_not_found", "no such user"));
    }
    let new_hash = match new_password {
        Some(pw) => Some(
            hash_password(pw).map_err(|e| AppError::internal("password_hash".to_string(), e.to_string()))?,
        ),
        None => None,
    };
    let now = Utc::now().timestamp_millis();
    store
        .update_where(
            USERS_TABLE,
            |row| row.get("id").and_then(|v| v.as_str()) == Some(id),
            |row| {
                if let Some(h) = &new_hash {
                    row.insert("password_hash".to_string(), Value::String(h.clone()));
                }
                if let Some(r) = new_role {
                    row.insert("role".to_string(), serde_json::json!(r));
                }
                row.insert("updated_at".to_string(), serde_json::json!(now));
            },
        )
        .map_err(AppError::from)?;
    find_by_id(store, id)?.ok_or_else(|| AppError::not_found("user_not_found", "no such user"))
}

/// Delete an account. The subject's credentials are revoked and then purged
/// before the user row goes away; returns the number of credential rows
/// removed by the purge.
pub fn delete_user(store: &Store, tokens: &TokenManager, id: &str) -> AppResult<usize> {
    if find_by_id(store, id)?.is_none() {
        return Err(AppError::not_found("user_not_found", "no such user"));
    }
    tokens.deactivate(id, None)?;
    let purged = tokens.purge_inactive(Some(id))?;
    store
        .delete_where(USERS_TABLE, |row| row.get("id").and_then(|v| v.as_str()) == Some(id))
        .map_err(AppError::from)?;
    Ok(purged)
}
