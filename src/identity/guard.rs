//! Reusable access checks wired in front of request handlers.
//!
//! Ownership never lives in the role hierarchy: callers compute it as a
//! boolean (e.g. `lobby.host_id == subject.user_id`) and pass it in, which
//! keeps one guard implementation working for every owned resource type.

use crate::error::{AppError, AppResult};

use super::claims::TokenKind;
use super::principal::Subject;
use super::roles::Role;
use super::tokens::TokenManager;

/// Fail with `Unauthenticated` when no subject was resolved, with
/// `Forbidden` when the subject's role sits below `required`.
pub fn require(subject: Option<&Subject>, required: Role) -> AppResult<()> {
    let Some(s) = subject else {
        return Err(AppError::unauthenticated("no credential presented"));
    };
    if s.role.has_access(required) {
        Ok(())
    } else {
        Err(AppError::forbidden(required.as_str()))
    }
}

/// Passes when the role check passes OR `extra` holds. The usual shape is
/// "owner or moderator-plus". A missing subject is still `Unauthenticated`
/// regardless of `extra`.
pub fn require_or(subject: Option<&Subject>, required: Role, extra: bool) -> AppResult<()> {
    let Some(s) = subject else {
        return Err(AppError::unauthenticated("no credential presented"));
    };
    if extra || s.role.has_access(required) {
        Ok(())
    } else {
        Err(AppError::forbidden(required.as_str()))
    }
}

/// Passes only when both the role check and `extra` hold.
pub fn require_and(subject: Option<&Subject>, required: Role, extra: bool) -> AppResult<()> {
    require(subject, required)?;
    if extra {
        Ok(())
    } else {
        Err(AppError::forbidden(required.as_str()))
    }
}

/// A guard bound to one required role, wired in front of a handler. It
/// resolves the subject from a presented bearer value via the token
/// manager, then applies [`require`].
#[derive(Debug, Clone, Copy)]
pub struct AccessGuard {
    required: Role,
}

impl AccessGuard {
    pub fn new(required: Role) -> Self { Self { required } }

    pub fn required_role(&self) -> Role { self.required }

    pub fn authenticate(&self, tokens: &TokenManager, bearer: Option<&str>) -> AppResult<Subject> {
        let raw = bearer.ok_or_else(|| AppError::unauthenticated("missing bearer credential"))?;
        let subject = tokens.validate(raw, TokenKind::Access)?;
        require(Some(&subject), self.required)?;
        Ok(subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(role: Role) -> Subject {
        Subject { user_id: "u-1".into(), username: "alice".into(), role }
    }

    #[test]
    fn require_follows_ordinal_order() {
        let all = [Role::User, Role::Moderator, Role::Admin];
        for have in all {
            for need in all {
                let s = subject(have);
                let res = require(Some(&s), need);
                assert_eq!(res.is_ok(), have >= need, "{} vs {}", have, need);
            }
        }
    }

    #[test]
    fn require_without_subject_is_unauthenticated() {
        let err = require(None, Role::User).unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated { .. }));
    }

    #[test]
    fn require_reports_the_required_role() {
        let s = subject(Role::User);
        let err = require(Some(&s), Role::Moderator).unwrap_err();
        assert_eq!(err, AppError::forbidden("moderator"));
    }

    #[test]
    fn ownership_overrides_role_in_require_or() {
        // A plain user passes a moderator gate when the ownership bit holds.
        let s = subject(Role::User);
        assert!(require_or(Some(&s), Role::Moderator, true).is_ok());
        assert!(require_or(Some(&s), Role::Moderator, false).is_err());
        // Role alone is still enough.
        let m = subject(Role::Moderator);
        assert!(require_or(Some(&m), Role::Moderator, false).is_ok());
    }

    #[test]
    fn require_or_without_subject_is_unauthenticated_even_when_extra_holds() {
        let err = require_or(None, Role::User, true).unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated { .. }));
    }

    #[test]
    fn require_and_needs_both() {
        let m = subject(Role::Moderator);
        assert!(require_and(Some(&m), Role::Moderator, true).is_ok());
        assert!(require_and(Some(&m), Role::Moderator, false).is_err());
        let u = subject(Role::User);
        assert!(require_and(Some(&u), Role::Moderator, true).is_err());
    }
}
