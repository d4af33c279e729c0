//! Pull request model
//!
//! # State Machine
//!
//! ```text
//! OPEN → MERGED
//! ```
//!
//! `MERGED` is terminal. A merged pull request keeps its reviewer list and
//! merge timestamp forever.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE pr_status AS ENUM ('OPEN', 'MERGED');
//!
//! CREATE TABLE pull_requests (
//!     id TEXT PRIMARY KEY,
//!     title TEXT NOT NULL,
//!     author_id TEXT NOT NULL REFERENCES users(id),
//!     status pr_status NOT NULL DEFAULT 'OPEN',
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     merged_at TIMESTAMPTZ
//! );
//!
//! CREATE TABLE pr_reviewers (
//!     pr_id TEXT NOT NULL REFERENCES pull_requests(id) ON DELETE CASCADE,
//!     reviewer_id TEXT NOT NULL REFERENCES users(id),
//!     slot SMALLINT NOT NULL CHECK (slot IN (0, 1)),
//!     PRIMARY KEY (pr_id, reviewer_id),
//!     UNIQUE (pr_id, slot)
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of reviewers on a pull request
pub const MAX_REVIEWERS: usize = 2;

/// Pull request status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "pr_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PullRequestStatus {
    /// Under review; reviewers may be reassigned
    Open,

    /// Merged; no further changes
    Merged,
}

impl PullRequestStatus {
    /// Converts status to its stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PullRequestStatus::Open => "OPEN",
            PullRequestStatus::Merged => "MERGED",
        }
    }

    /// Checks if status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, PullRequestStatus::Merged)
    }

    /// Checks if transition to target status is valid
    pub fn can_transition_to(&self, target: PullRequestStatus) -> bool {
        matches!(
            (self, target),
            (PullRequestStatus::Open, PullRequestStatus::Merged)
        )
    }
}

impl std::fmt::Display for PullRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pull request with its ordered reviewer list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PullRequest {
    /// Caller-supplied pull request ID
    pub id: String,

    /// Title
    pub title: String,

    /// Author user ID
    pub author_id: String,

    /// Current status
    pub status: PullRequestStatus,

    /// Assigned reviewer IDs in slot order (at most `MAX_REVIEWERS`)
    pub assigned_reviewers: Vec<String>,

    /// When the pull request was created
    pub created_at: DateTime<Utc>,

    /// When the pull request was merged (None while open)
    pub merged_at: Option<DateTime<Utc>>,
}

impl PullRequest {
    /// Builds a new open pull request
    ///
    /// Reviewers beyond `MAX_REVIEWERS` are dropped.
    pub fn open(
        id: impl Into<String>,
        title: impl Into<String>,
        author_id: impl Into<String>,
        mut reviewers: Vec<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        reviewers.truncate(MAX_REVIEWERS);
        Self {
            id: id.into(),
            title: title.into(),
            author_id: author_id.into(),
            status: PullRequestStatus::Open,
            assigned_reviewers: reviewers,
            created_at,
            merged_at: None,
        }
    }

    /// Returns true if the pull request is merged
    pub fn is_merged(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns true if `user_id` is currently a reviewer
    pub fn has_reviewer(&self, user_id: &str) -> bool {
        self.assigned_reviewers.iter().any(|r| r == user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_as_str() {
        assert_eq!(PullRequestStatus::Open.as_str(), "OPEN");
        assert_eq!(PullRequestStatus::Merged.as_str(), "MERGED");
        assert_eq!(PullRequestStatus::Merged.to_string(), "MERGED");
    }

    #[test]
    fn test_status_transitions() {
        assert!(PullRequestStatus::Open.can_transition_to(PullRequestStatus::Merged));
        assert!(!PullRequestStatus::Open.can_transition_to(PullRequestStatus::Open));
        assert!(!PullRequestStatus::Merged.can_transition_to(PullRequestStatus::Open));
        assert!(!PullRequestStatus::Merged.can_transition_to(PullRequestStatus::Merged));

        assert!(!PullRequestStatus::Open.is_terminal());
        assert!(PullRequestStatus::Merged.is_terminal());
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(
            serde_json::to_string(&PullRequestStatus::Open).unwrap(),
            "\"OPEN\""
        );
        let status: PullRequestStatus = serde_json::from_str("\"MERGED\"").unwrap();
        assert_eq!(status, PullRequestStatus::Merged);
    }

    #[test]
    fn test_open_caps_reviewers() {
        let pr = PullRequest::open(
            "pr-1",
            "Add feature",
            "u1",
            vec!["u2".into(), "u3".into(), "u4".into()],
            Utc::now(),
        );

        assert_eq!(pr.status, PullRequestStatus::Open);
        assert_eq!(pr.assigned_reviewers, vec!["u2", "u3"]);
        assert!(pr.merged_at.is_none());
        assert!(pr.has_reviewer("u3"));
        assert!(!pr.has_reviewer("u4"));
        assert!(!pr.is_merged());
    }
}
