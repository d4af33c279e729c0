//! Persistence port for teams, users and pull requests.
//!
//! The assignment engine only talks to storage through the traits in this
//! module. Two backends are provided:
//!
//! - [`PgStore`]: PostgreSQL via sqlx (production)
//! - [`InMemoryStore`]: `RwLock`-guarded maps (tests and local runs)
//!
//! Every call reads from or writes to the backend directly; nothing is
//! cached between calls.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::{PullRequest, Team, TeamId, TeamMember, User};

/// Storage error
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A unique key already exists (duplicate team name, pull request ID, ...)
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// The backend could not serve the request
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Any other database error
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let constraint = db_err
                    .constraint()
                    .map(str::to_string)
                    .unwrap_or_else(|| db_err.message().to_string());
                return StorageError::UniqueViolation(constraint);
            }
        }
        StorageError::Database(err)
    }
}

/// Storage result type alias
pub type StorageResult<T> = Result<T, StorageError>;

/// Team storage operations
#[async_trait]
pub trait TeamRepository: Send + Sync {
    /// Returns true if a team with exactly this name exists.
    async fn exists(&self, name: &str) -> StorageResult<bool>;

    /// Creates a team and returns its generated ID.
    ///
    /// Fails with `UniqueViolation` if the name is taken.
    async fn create(&self, name: &str) -> StorageResult<TeamId>;

    /// Finds a team by name, loading its members.
    async fn get_by_name(&self, name: &str) -> StorageResult<Option<Team>>;

    /// Finds a team by ID (members are not loaded).
    async fn get_by_id(&self, id: TeamId) -> StorageResult<Option<Team>>;
}

/// User storage operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts or updates users, binding all of them to `team_id`.
    ///
    /// Existing users are moved to the team and have their name and active
    /// flag overwritten. Runs as one transaction.
    async fn upsert_many(&self, team_id: TeamId, members: &[TeamMember]) -> StorageResult<()>;

    /// Active members of a team other than `exclude_id`, ordered by user ID.
    async fn get_active_in_team_excluding(
        &self,
        team_id: TeamId,
        exclude_id: &str,
    ) -> StorageResult<Vec<User>>;

    /// Team ID of a user, None if the user is unknown.
    async fn get_team_id_by_user(&self, user_id: &str) -> StorageResult<Option<TeamId>>;

    /// Team of a user (members are not loaded), None if the user is unknown.
    async fn get_team_by_user(&self, user_id: &str) -> StorageResult<Option<Team>>;

    /// Marks users inactive and returns how many rows changed.
    async fn deactivate_many(&self, user_ids: &[String]) -> StorageResult<u64>;

    /// Sets the active flag; returns false if the user does not exist.
    async fn set_active(&self, user_id: &str, is_active: bool) -> StorageResult<bool>;

    /// Finds a user by ID.
    async fn get_by_id(&self, user_id: &str) -> StorageResult<Option<User>>;
}

/// Pull request storage operations
#[async_trait]
pub trait PullRequestRepository: Send + Sync {
    /// Inserts the pull request row. Reviewers are stored by `assign_reviewers`.
    ///
    /// Fails with `UniqueViolation` if the ID is taken.
    async fn create(&self, pr: &PullRequest) -> StorageResult<()>;

    /// Inserts the pull request row together with `pr.assigned_reviewers`
    /// as one unit. Nothing is stored if either part fails.
    ///
    /// Fails with `UniqueViolation` if the ID is taken.
    async fn create_with_reviewers(&self, pr: &PullRequest) -> StorageResult<()>;

    /// Finds a pull request with its reviewers.
    async fn get_by_id(&self, id: &str) -> StorageResult<Option<PullRequest>>;

    /// Stores the reviewer list of a pull request that has none yet.
    ///
    /// Only the first `MAX_REVIEWERS` IDs are kept.
    async fn assign_reviewers(&self, pr_id: &str, reviewer_ids: &[String]) -> StorageResult<()>;

    /// Marks an open pull request merged.
    ///
    /// Returns false when the pull request is missing or already merged.
    async fn merge(&self, pr_id: &str, merged_at: DateTime<Utc>) -> StorageResult<bool>;

    /// Reviewer IDs in slot order.
    async fn get_reviewers(&self, pr_id: &str) -> StorageResult<Vec<String>>;

    /// Atomically swaps `old_id` for `new_id` in the same slot.
    ///
    /// Returns false (and changes nothing) when `old_id` is no longer
    /// assigned or the pull request is missing or merged.
    async fn replace_reviewer(&self, pr_id: &str, old_id: &str, new_id: &str)
        -> StorageResult<bool>;

    /// Pull requests of any status where `reviewer_id` is assigned.
    async fn get_by_reviewer(&self, reviewer_id: &str) -> StorageResult<Vec<PullRequest>>;

    /// Number of pull requests (any status) per assigned reviewer.
    async fn get_review_counts(&self) -> StorageResult<BTreeMap<String, i64>>;

    /// Open pull requests where any of `user_ids` is assigned.
    async fn get_open_by_reviewers(&self, user_ids: &[String]) -> StorageResult<Vec<PullRequest>>;
}

/// Backend liveness probe used by the health endpoint
#[async_trait]
pub trait StorageHealth: Send + Sync {
    async fn ping(&self) -> StorageResult<()>;
}

/// Handles to every repository, backed by one store
#[derive(Clone)]
pub struct Repositories {
    pub teams: Arc<dyn TeamRepository>,
    pub users: Arc<dyn UserRepository>,
    pub pull_requests: Arc<dyn PullRequestRepository>,
    pub health: Arc<dyn StorageHealth>,
}

impl Repositories {
    /// Repositories backed by PostgreSQL
    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self {
            teams: store.clone(),
            users: store.clone(),
            pull_requests: store.clone(),
            health: store,
        }
    }

    /// Repositories backed by a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::from_memory(Arc::new(InMemoryStore::new()))
    }

    /// Repositories sharing an existing in-memory store
    pub fn from_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            teams: store.clone(),
            users: store.clone(),
            pull_requests: store.clone(),
            health: store,
        }
    }
}
