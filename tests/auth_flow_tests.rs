//! End-to-end lifecycle tests: authentication, rotation, revocation and
//! garbage collection across the token manager, the user catalog and the
//! filter engine, all against a temp-dir store.

use std::time::Duration;

use tempfile::tempdir;

use lobbyd::config::AuthConfig;
use lobbyd::entities::{lobby, LOBBIES_TABLE, LOBBY_FILTERS};
use lobbyd::error::AppError;
use lobbyd::filter::{self, ListQuery, QueryOutcome};
use lobbyd::identity::{require, require_or, Role, Subject, TokenKind, TokenManager, TOKENS_TABLE};
use lobbyd::security;
use lobbyd::store::Store;

fn auth_cfg() -> AuthConfig {
    AuthConfig::new("integration-secret", Duration::from_secs(900), Duration::from_secs(3600))
}

fn subject_of(user: &security::UserRecord) -> Subject {
    Subject { user_id: user.id.clone(), username: user.username.clone(), role: user.role }
}

#[test]
fn full_login_refresh_logout_cycle() {
    let tmp = tempdir().unwrap();
    let store = Store::open(tmp.path()).unwrap();
    let tokens = TokenManager::new(store.clone(), auth_cfg());

    let user = security::add_user(&store, "alice", "s3cr3t!", Role::User).unwrap();
    let alice = subject_of(&user);

    // Login mints one active credential of each kind.
    let (access, refresh) = tokens.login(&alice).unwrap();
    assert_eq!(tokens.validate(&access.value, TokenKind::Access).unwrap(), alice);

    // Rotation replaces the access credential and preserves the refresh one.
    let rotated = tokens.refresh(&refresh.value).unwrap();
    assert_eq!(tokens.validate(&access.value, TokenKind::Access).unwrap_err(), AppError::TokenRevoked);
    assert_eq!(tokens.validate(&rotated.value, TokenKind::Access).unwrap(), alice);

    // Logout revokes everything; the rotated credential stops validating.
    tokens.deactivate(&alice.user_id, None).unwrap();
    assert_eq!(tokens.validate(&rotated.value, TokenKind::Access).unwrap_err(), AppError::TokenRevoked);
    assert_eq!(tokens.validate(&refresh.value, TokenKind::Refresh).unwrap_err(), AppError::TokenRevoked);

    // The revoked rows are purgeable exactly once.
    let purged = tokens.purge_inactive(Some(&alice.user_id)).unwrap();
    assert!(purged >= 2);
    assert_eq!(tokens.purge_inactive(Some(&alice.user_id)).unwrap(), 0);
    assert!(store.scan(TOKENS_TABLE).unwrap().is_empty());
}

#[test]
fn zero_ttl_access_token_expires_immediately() {
    let tmp = tempdir().unwrap();
    let store = Store::open(tmp.path()).unwrap();
    let cfg = AuthConfig::new("integration-secret", Duration::from_secs(0), Duration::from_secs(3600));
    let tokens = TokenManager::new(store.clone(), cfg);

    let user = security::add_user(&store, "alice", "pw", Role::User).unwrap();
    let tok = tokens.issue(&subject_of(&user), TokenKind::Access).unwrap();
    assert_eq!(tokens.validate(&tok.value, TokenKind::Access).unwrap_err(), AppError::TokenExpired);
}

#[test]
fn guards_and_store_survive_reopen() {
    let tmp = tempdir().unwrap();
    let (raw_access, user_id);
    {
        let store = Store::open(tmp.path()).unwrap();
        let tokens = TokenManager::new(store.clone(), auth_cfg());
        let user = security::add_user(&store, "mod", "pw", Role::Moderator).unwrap();
        let (access, _) = tokens.login(&subject_of(&user)).unwrap();
        raw_access = access.value;
        user_id = user.id;
    }

    // A fresh process over the same root still honors the issued credential.
    let store = Store::open(tmp.path()).unwrap();
    let tokens = TokenManager::new(store.clone(), auth_cfg());
    let subject = tokens.validate(&raw_access, TokenKind::Access).unwrap();
    assert_eq!(subject.user_id, user_id);
    assert_eq!(subject.role, Role::Moderator);

    // Moderator passes a moderator gate but not an admin one.
    assert!(require(Some(&subject), Role::Moderator).is_ok());
    assert!(require(Some(&subject), Role::Admin).is_err());
}

#[test]
fn ownership_lets_a_user_edit_their_own_lobby() {
    let tmp = tempdir().unwrap();
    let store = Store::open(tmp.path()).unwrap();
    let host = security::add_user(&store, "host", "pw", Role::User).unwrap();
    let stranger = security::add_user(&store, "stranger", "pw", Role::User).unwrap();
    let host_s = subject_of(&host);
    let stranger_s = subject_of(&stranger);

    let row = lobby::new_row(&host_s, "Scrim Night", "", 10, "public", false, None);
    let owned_by = |s: &Subject| row.get("host_id").and_then(|v| v.as_str()) == Some(s.user_id.as_str());
    store.insert(LOBBIES_TABLE, row.clone()).unwrap();

    assert!(require_or(Some(&host_s), Role::Moderator, owned_by(&host_s)).is_ok());
    assert!(require_or(Some(&stranger_s), Role::Moderator, owned_by(&stranger_s)).is_err());
}

#[test]
fn lobby_listing_counts_match_pages() {
    let tmp = tempdir().unwrap();
    let store = Store::open(tmp.path()).unwrap();
    let host = security::add_user(&store, "host", "pw", Role::User).unwrap();
    let host_s = subject_of(&host);

    for i in 0..5 {
        let mut row = lobby::new_row(&host_s, &format!("Lobby {i}"), "", 10, "public", i % 2 == 0, None);
        if i == 4 {
            row.insert("status".into(), serde_json::json!("closed"));
        }
        store.insert(LOBBIES_TABLE, row).unwrap();
    }

    // Default status filter sees the four open lobbies.
    let mut q = ListQuery::default();
    q.limit = Some(2);
    let page = filter::list(&store, &LOBBY_FILTERS, &q).unwrap();
    assert_eq!(page.len(), 2);
    let n = filter::count(&store, &LOBBY_FILTERS, &q.filters).unwrap();
    assert_eq!(n, 4);

    // ranked=false is a real filter value (two open unranked lobbies).
    let mut q = ListQuery::default();
    q.filters.insert("ranked".into(), serde_json::json!(false));
    match filter::run(&store, &LOBBY_FILTERS, &q, true).unwrap() {
        QueryOutcome::Count(c) => assert_eq!(c, 2),
        other => panic!("expected count, got {other:?}"),
    }
}
