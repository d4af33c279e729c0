//! In-memory implementation of the persistence port.
//!
//! All data sits behind a single `RwLock`, so every operation is atomic
//! with respect to the others. State is lost on restart.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{
    PullRequestRepository, StorageError, StorageHealth, StorageResult, TeamRepository,
    UserRepository,
};
use crate::models::{
    PullRequest, PullRequestStatus, Team, TeamId, TeamMember, User, MAX_REVIEWERS,
};

#[derive(Debug, Clone)]
struct StoredUser {
    username: String,
    is_active: bool,
    team_id: TeamId,
}

#[derive(Default)]
struct MemoryState {
    /// Team name by ID
    teams: BTreeMap<TeamId, String>,
    next_team_id: TeamId,
    users: BTreeMap<String, StoredUser>,
    pull_requests: BTreeMap<String, PullRequest>,
}

impl MemoryState {
    fn team_name(&self, id: TeamId) -> Option<&String> {
        self.teams.get(&id)
    }

    fn to_user(&self, id: &str, stored: &StoredUser) -> Option<User> {
        let team_name = self.team_name(stored.team_id)?;
        Some(User {
            id: id.to_string(),
            username: stored.username.clone(),
            is_active: stored.is_active,
            team_id: stored.team_id,
            team_name: team_name.clone(),
        })
    }
}

/// In-memory store implementing every repository trait.
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
    /// Operations that fail with `StorageError::Unavailable`.
    failing: Mutex<HashSet<&'static str>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState {
                next_team_id: 1,
                ..Default::default()
            }),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Makes every later call to `operation` (trait method name) fail.
    pub fn fail_operation(&self, operation: &'static str) {
        self.failing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(operation);
    }

    /// Clears all injected failures.
    pub fn clear_failures(&self) {
        self.failing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    fn check(&self, operation: &'static str) -> StorageResult<()> {
        let failing = self
            .failing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if failing.contains(operation) {
            return Err(StorageError::Unavailable(format!(
                "injected failure in {}",
                operation
            )));
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TeamRepository for InMemoryStore {
    async fn exists(&self, name: &str) -> StorageResult<bool> {
        self.check("exists")?;
        let state = self.state.read().await;
        Ok(state.teams.values().any(|n| n == name))
    }

    async fn create(&self, name: &str) -> StorageResult<TeamId> {
        self.check("create_team")?;
        let mut state = self.state.write().await;
        if state.teams.values().any(|n| n == name) {
            return Err(StorageError::UniqueViolation("teams_name_key".to_string()));
        }
        let id = state.next_team_id;
        state.next_team_id += 1;
        state.teams.insert(id, name.to_string());
        Ok(id)
    }

    async fn get_by_name(&self, name: &str) -> StorageResult<Option<Team>> {
        self.check("get_by_name")?;
        let state = self.state.read().await;
        let Some((&id, _)) = state.teams.iter().find(|(_, n)| n.as_str() == name) else {
            return Ok(None);
        };

        let mut team = Team::new(id, name);
        team.members = state
            .users
            .iter()
            .filter(|(_, u)| u.team_id == id)
            .map(|(user_id, u)| TeamMember::new(user_id.clone(), u.username.clone(), u.is_active))
            .collect();
        Ok(Some(team))
    }

    async fn get_by_id(&self, id: TeamId) -> StorageResult<Option<Team>> {
        self.check("get_team_by_id")?;
        let state = self.state.read().await;
        Ok(state.team_name(id).map(|name| Team::new(id, name.clone())))
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn upsert_many(&self, team_id: TeamId, members: &[TeamMember]) -> StorageResult<()> {
        self.check("upsert_many")?;
        let mut state = self.state.write().await;
        for member in members {
            state.users.insert(
                member.user_id.clone(),
                StoredUser {
                    username: member.username.clone(),
                    is_active: member.is_active,
                    team_id,
                },
            );
        }
        Ok(())
    }

    async fn get_active_in_team_excluding(
        &self,
        team_id: TeamId,
        exclude_id: &str,
    ) -> StorageResult<Vec<User>> {
        self.check("get_active_in_team_excluding")?;
        let state = self.state.read().await;
        Ok(state
            .users
            .iter()
            .filter(|(id, u)| u.team_id == team_id && u.is_active && id.as_str() != exclude_id)
            .filter_map(|(id, u)| state.to_user(id, u))
            .collect())
    }

    async fn get_team_id_by_user(&self, user_id: &str) -> StorageResult<Option<TeamId>> {
        self.check("get_team_id_by_user")?;
        let state = self.state.read().await;
        Ok(state.users.get(user_id).map(|u| u.team_id))
    }

    async fn get_team_by_user(&self, user_id: &str) -> StorageResult<Option<Team>> {
        self.check("get_team_by_user")?;
        let state = self.state.read().await;
        Ok(state.users.get(user_id).and_then(|u| {
            state
                .team_name(u.team_id)
                .map(|name| Team::new(u.team_id, name.clone()))
        }))
    }

    async fn deactivate_many(&self, user_ids: &[String]) -> StorageResult<u64> {
        self.check("deactivate_many")?;
        let mut state = self.state.write().await;
        let mut changed = 0;
        for id in user_ids {
            if let Some(user) = state.users.get_mut(id) {
                user.is_active = false;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn set_active(&self, user_id: &str, is_active: bool) -> StorageResult<bool> {
        self.check("set_active")?;
        let mut state = self.state.write().await;
        match state.users.get_mut(user_id) {
            Some(user) => {
                user.is_active = is_active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_by_id(&self, user_id: &str) -> StorageResult<Option<User>> {
        self.check("get_user_by_id")?;
        let state = self.state.read().await;
        Ok(state
            .users
            .get(user_id)
            .and_then(|u| state.to_user(user_id, u)))
    }
}

#[async_trait]
impl PullRequestRepository for InMemoryStore {
    async fn create(&self, pr: &PullRequest) -> StorageResult<()> {
        self.check("create_pull_request")?;
        let mut state = self.state.write().await;
        if state.pull_requests.contains_key(&pr.id) {
            return Err(StorageError::UniqueViolation("pull_requests_pkey".to_string()));
        }
        let mut row = pr.clone();
        row.assigned_reviewers.clear();
        state.pull_requests.insert(pr.id.clone(), row);
        Ok(())
    }

    async fn create_with_reviewers(&self, pr: &PullRequest) -> StorageResult<()> {
        // Either injected failure aborts the whole write
        self.check("create_pull_request")?;
        self.check("assign_reviewers")?;
        let mut state = self.state.write().await;
        if state.pull_requests.contains_key(&pr.id) {
            return Err(StorageError::UniqueViolation("pull_requests_pkey".to_string()));
        }
        let mut row = pr.clone();
        row.assigned_reviewers.truncate(MAX_REVIEWERS);
        state.pull_requests.insert(pr.id.clone(), row);
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> StorageResult<Option<PullRequest>> {
        self.check("get_pull_request")?;
        let state = self.state.read().await;
        Ok(state.pull_requests.get(id).cloned())
    }

    async fn assign_reviewers(&self, pr_id: &str, reviewer_ids: &[String]) -> StorageResult<()> {
        self.check("assign_reviewers")?;
        let mut state = self.state.write().await;
        if let Some(pr) = state.pull_requests.get_mut(pr_id) {
            pr.assigned_reviewers = reviewer_ids.iter().take(MAX_REVIEWERS).cloned().collect();
        }
        Ok(())
    }

    async fn merge(&self, pr_id: &str, merged_at: DateTime<Utc>) -> StorageResult<bool> {
        self.check("merge")?;
        let mut state = self.state.write().await;
        match state.pull_requests.get_mut(pr_id) {
            Some(pr) if pr.status == PullRequestStatus::Open => {
                pr.status = PullRequestStatus::Merged;
                pr.merged_at = Some(merged_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_reviewers(&self, pr_id: &str) -> StorageResult<Vec<String>> {
        self.check("get_reviewers")?;
        let state = self.state.read().await;
        Ok(state
            .pull_requests
            .get(pr_id)
            .map(|pr| pr.assigned_reviewers.clone())
            .unwrap_or_default())
    }

    async fn replace_reviewer(
        &self,
        pr_id: &str,
        old_id: &str,
        new_id: &str,
    ) -> StorageResult<bool> {
        self.check("replace_reviewer")?;
        let mut state = self.state.write().await;
        let Some(pr) = state.pull_requests.get_mut(pr_id) else {
            return Ok(false);
        };
        if pr.is_merged() {
            return Ok(false);
        }
        if pr.has_reviewer(new_id) {
            return Err(StorageError::UniqueViolation("pr_reviewers_pkey".to_string()));
        }
        match pr.assigned_reviewers.iter_mut().find(|r| r.as_str() == old_id) {
            Some(slot) => {
                *slot = new_id.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_by_reviewer(&self, reviewer_id: &str) -> StorageResult<Vec<PullRequest>> {
        self.check("get_by_reviewer")?;
        let state = self.state.read().await;
        Ok(state
            .pull_requests
            .values()
            .filter(|pr| pr.has_reviewer(reviewer_id))
            .cloned()
            .collect())
    }

    async fn get_review_counts(&self) -> StorageResult<BTreeMap<String, i64>> {
        self.check("get_review_counts")?;
        let state = self.state.read().await;
        let mut counts = BTreeMap::new();
        for reviewer in state
            .pull_requests
            .values()
            .flat_map(|pr| pr.assigned_reviewers.iter())
        {
            *counts.entry(reviewer.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn get_open_by_reviewers(&self, user_ids: &[String]) -> StorageResult<Vec<PullRequest>> {
        self.check("get_open_by_reviewers")?;
        let state = self.state.read().await;
        Ok(state
            .pull_requests
            .values()
            .filter(|pr| pr.status == PullRequestStatus::Open)
            .filter(|pr| user_ids.iter().any(|id| pr.has_reviewer(id)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StorageHealth for InMemoryStore {
    async fn ping(&self) -> StorageResult<()> {
        self.check("ping")
    }
}
