//! Team model
//!
//! A team is a named group of users. Team names are unique and compared
//! case-sensitively. Membership only grows: users are upserted into a team
//! and never removed from it explicitly.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE teams (
//!     id BIGSERIAL PRIMARY KEY,
//!     name TEXT NOT NULL UNIQUE,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use serde::{Deserialize, Serialize};

use super::user::TeamMember;

/// Storage-generated team identifier
pub type TeamId = i64;

/// Team with its member listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    /// Unique team ID
    pub id: TeamId,

    /// Unique, human-chosen team name
    pub name: String,

    /// Team members
    ///
    /// Only populated by lookups that load membership (`get_by_name`);
    /// empty when the team was resolved through one of its users.
    #[sqlx(skip)]
    #[serde(default)]
    pub members: Vec<TeamMember>,
}

impl Team {
    /// Creates a team value without members
    pub fn new(id: TeamId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            members: Vec::new(),
        }
    }
}
