use serde::{Deserialize, Serialize};

use super::roles::Role;

/// Authenticated principal resolved from a presented credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subject {
    pub user_id: String,
    pub username: String,
    pub role: Role,
}
