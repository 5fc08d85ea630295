//! Identity: roles, subjects, signed credentials and access guards.
//! Keep the public surface thin and split implementation across sub-modules.

mod claims;
mod guard;
mod principal;
mod roles;
mod tokens;

pub use claims::{Claims, TokenKind};
pub use guard::{require, require_and, require_or, AccessGuard};
pub use principal::Subject;
pub use roles::Role;
pub use tokens::{TokenManager, TokenRecord, TOKENS_TABLE};
