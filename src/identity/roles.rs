use serde::{Deserialize, Serialize};
use std::fmt;

/// Role hierarchy. Comparison is ordinal: a subject satisfies a requirement
/// iff its role level is greater than or equal to the required level, so the
/// declaration order below is load-bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User = 1,
    Moderator = 2,
    Admin = 3,
}

impl Role {
    pub fn has_access(self, required: Role) -> bool { self >= required }

    pub fn level(self) -> i64 { self as i64 }

    pub fn from_level(level: i64) -> Option<Role> {
        match level {
            1 => Some(Role::User),
            2 => Some(Role::Moderator),
            3 => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Some(Role::User),
            "moderator" => Some(Role::Moderator),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinal_access_matrix() {
        let all = [Role::User, Role::Moderator, Role::Admin];
        for a in all {
            for b in all {
                assert_eq!(a.has_access(b), a.level() >= b.level(), "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn level_roundtrip() {
        for r in [Role::User, Role::Moderator, Role::Admin] {
            assert_eq!(Role::from_level(r.level()), Some(r));
            assert_eq!(Role::parse(r.as_str()), Some(r));
        }
        assert_eq!(Role::from_level(0), None);
        assert_eq!(Role::parse("root"), None);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_value(Role::Moderator).unwrap(), serde_json::json!("moderator"));
        let r: Role = serde_json::from_value(serde_json::json!("admin")).unwrap();
        assert_eq!(r, Role::Admin);
    }
}
