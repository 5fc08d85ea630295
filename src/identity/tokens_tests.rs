use super::*;
use crate::security;
use std::time::Duration;

fn manager(tmp: &tempfile::TempDir) -> (Store, TokenManager) {
    let store = Store::open(tmp.path()).unwrap();
    let cfg = AuthConfig::new("tokens-test-secret", Duration::from_secs(900), Duration::from_secs(3600));
    (store.clone(), TokenManager::new(store, cfg))
}

fn seed_subject(store: &Store, username: &str) -> Subject {
    let user = security::add_user(store, username, "hunter2", crate::identity::Role::User).unwrap();
    Subject { user_id: user.id, username: user.username, role: user.role }
}

fn active_count(store: &Store, user_id: &str, kind: TokenKind) -> usize {
    store
        .scan(TOKENS_TABLE)
        .unwrap()
        .iter()
        .filter_map(TokenRecord::from_row)
        .filter(|t| t.user_id == user_id && t.kind == kind && t.active)
        .count()
}

#[test]
fn test_issue_then_validate_resolves_subject() {
    let tmp = tempfile::tempdir().unwrap();
    let (store, mgr) = manager(&tmp);
    let subject = seed_subject(&store, "alice");
    let tok = mgr.issue(&subject, TokenKind::Access).unwrap();
    let resolved = mgr.validate(&tok.value, TokenKind::Access).unwrap();
    assert_eq!(resolved, subject);
}

#[test]
fn test_single_active_session_after_repeated_logins() {
    let tmp = tempfile::tempdir().unwrap();
    let (store, mgr) = manager(&tmp);
    let subject = seed_subject(&store, "alice");
    for _ in 0..3 {
        mgr.login(&subject).unwrap();
    }
    assert_eq!(active_count(&store, &subject.user_id, TokenKind::Access), 1);
    assert_eq!(active_count(&store, &subject.user_id, TokenKind::Refresh), 1);
}

#[test]
fn test_second_login_revokes_first_access_token() {
    let tmp = tempfile::tempdir().unwrap();
    let (store, mgr) = manager(&tmp);
    let subject = seed_subject(&store, "alice");
    let (first_access, _) = mgr.login(&subject).unwrap();
    mgr.login(&subject).unwrap();
    let err = mgr.validate(&first_access.value, TokenKind::Access).unwrap_err();
    assert_eq!(err, AppError::TokenRevoked);
}

#[test]
fn test_refresh_rotates_access_only() {
    let tmp = tempfile::tempdir().unwrap();
    let (store, mgr) = manager(&tmp);
    let subject = seed_subject(&store, "alice");
    let (old_access, refresh) = mgr.login(&subject).unwrap();
    let new_access = mgr.refresh(&refresh.value).unwrap();

    // The superseded access credential is revoked, the new one validates,
    // and the refresh credential used for rotation is still active.
    assert_eq!(mgr.validate(&old_access.value, TokenKind::Access).unwrap_err(), AppError::TokenRevoked);
    assert_eq!(mgr.validate(&new_access.value, TokenKind::Access).unwrap().user_id, subject.user_id);
    assert_eq!(mgr.validate(&refresh.value, TokenKind::Refresh).unwrap().user_id, subject.user_id);
    assert_eq!(active_count(&store, &subject.user_id, TokenKind::Access), 1);
    assert_eq!(active_count(&store, &subject.user_id, TokenKind::Refresh), 1);
}

#[test]
fn test_validate_rejects_wrong_kind() {
    let tmp = tempfile::tempdir().unwrap();
    let (store, mgr) = manager(&tmp);
    let subject = seed_subject(&store, "alice");
    let (_, refresh) = mgr.login(&subject).unwrap();
    let err = mgr.validate(&refresh.value, TokenKind::Access).unwrap_err();
    assert_eq!(err, AppError::wrong_type("access", "refresh"));
}

#[test]
fn test_validate_unknown_value_is_revoked_kind() {
    let tmp = tempfile::tempdir().unwrap();
    let (store, mgr) = manager(&tmp);
    let subject = seed_subject(&store, "alice");
    // Signed with the right secret but never persisted: well-formed, not in store.
    let claims = Claims {
        sub: subject.user_id.clone(),
        jti: uuid::Uuid::new_v4().to_string(),
        kind: TokenKind::Access,
        iat: chrono::Utc::now().timestamp(),
        exp: chrono::Utc::now().timestamp() + 900,
    };
    let raw = crate::identity::claims::sign(mgr.config(), &claims).unwrap();
    assert_eq!(mgr.validate(&raw, TokenKind::Access).unwrap_err(), AppError::TokenRevoked);
}

#[test]
fn test_deactivate_is_idempotent() {
    let tmp = tempfile::tempdir().unwrap();
    let (store, mgr) = manager(&tmp);
    let subject = seed_subject(&store, "alice");
    mgr.login(&subject).unwrap();
    mgr.deactivate(&subject.user_id, None).unwrap();
    let after_first = store.scan(TOKENS_TABLE).unwrap();
    mgr.deactivate(&subject.user_id, None).unwrap();
    let after_second = store.scan(TOKENS_TABLE).unwrap();
    assert_eq!(after_first, after_second);
    assert_eq!(active_count(&store, &subject.user_id, TokenKind::Access), 0);
}

#[test]
fn test_purge_counts_then_zero() {
    let tmp = tempfile::tempdir().unwrap();
    let (store, mgr) = manager(&tmp);
    let subject = seed_subject(&store, "alice");
    // Two active rows, then deactivate all of them.
    mgr.issue(&subject, TokenKind::Access).unwrap();
    mgr.issue(&subject, TokenKind::Refresh).unwrap();
    mgr.deactivate(&subject.user_id, None).unwrap();
    crate::tprintln!("rows before purge: {}", store.scan(TOKENS_TABLE).unwrap().len());

    assert_eq!(mgr.purge_inactive(Some(&subject.user_id)).unwrap(), 2);
    assert_eq!(mgr.purge_inactive(Some(&subject.user_id)).unwrap(), 0);
}

#[test]
fn test_purge_global_spans_subjects_and_spares_active() {
    let tmp = tempfile::tempdir().unwrap();
    let (store, mgr) = manager(&tmp);
    let alice = seed_subject(&store, "alice");
    let bob = seed_subject(&store, "bob");
    mgr.login(&alice).unwrap();
    mgr.login(&bob).unwrap();
    mgr.deactivate(&alice.user_id, None).unwrap();

    // Only alice's two revoked rows go; bob's active pair survives.
    assert_eq!(mgr.purge_inactive(None).unwrap(), 2);
    assert_eq!(active_count(&store, &bob.user_id, TokenKind::Access), 1);
    assert_eq!(active_count(&store, &bob.user_id, TokenKind::Refresh), 1);
}
