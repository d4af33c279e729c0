//! User model
//!
//! Users are authors and reviewers of pull requests. Every user belongs to
//! exactly one team; the team determines the reviewer pool for pull
//! requests the user authors or reviews. Users are never deleted, only
//! deactivated.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE users (
//!     id TEXT PRIMARY KEY,
//!     username TEXT NOT NULL,
//!     is_active BOOLEAN NOT NULL DEFAULT TRUE,
//!     team_id BIGINT NOT NULL REFERENCES teams(id)
//! );
//! ```

use serde::{Deserialize, Serialize};

use super::team::TeamId;

/// User joined with the name of its team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Caller-chosen user ID
    pub id: String,

    /// Display name
    pub username: String,

    /// Whether the user may be picked as a reviewer
    pub is_active: bool,

    /// Owning team
    pub team_id: TeamId,

    /// Name of the owning team
    pub team_name: String,
}

/// Team member as supplied when creating a team and as listed by team lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamMember {
    /// User ID
    pub user_id: String,

    /// Display name
    pub username: String,

    /// Active flag
    pub is_active: bool,
}

impl TeamMember {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>, is_active: bool) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            is_active,
        }
    }
}
