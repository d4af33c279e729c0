//! Pull request lifecycle: creation with initial reviewers, merge and
//! reviewer reassignment.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use super::error::{ServiceError, ServiceResult};
use super::selection::ReviewerSelector;
use crate::models::{PullRequest, PullRequestStatus};
use crate::repository::{
    PullRequestRepository, Repositories, StorageError, TeamRepository, UserRepository,
};

/// Outcome of a successful reassignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reassignment {
    /// Reviewer that took over the slot
    pub new_reviewer_id: String,

    /// Pull request as stored after the swap
    pub pull_request: PullRequest,
}

/// Owns pull request state transitions
pub struct PullRequestService {
    teams: Arc<dyn TeamRepository>,
    users: Arc<dyn UserRepository>,
    pull_requests: Arc<dyn PullRequestRepository>,
    selector: ReviewerSelector,
}

impl PullRequestService {
    pub fn new(repositories: &Repositories, selector: ReviewerSelector) -> Self {
        Self {
            teams: repositories.teams.clone(),
            users: repositories.users.clone(),
            pull_requests: repositories.pull_requests.clone(),
            selector,
        }
    }

    /// Creates an open pull request and assigns up to two teammates of the
    /// author as reviewers.
    ///
    /// # Errors
    ///
    /// - `PullRequestExists` if the ID is taken (also on a storage race)
    /// - `AuthorNotFound` if the author is unknown
    pub async fn create_pull_request(
        &self,
        id: &str,
        title: &str,
        author_id: &str,
    ) -> ServiceResult<PullRequest> {
        if self.pull_requests.get_by_id(id).await?.is_some() {
            return Err(ServiceError::PullRequestExists(id.to_string()));
        }

        let team_id = self
            .users
            .get_team_id_by_user(author_id)
            .await?
            .ok_or_else(|| ServiceError::AuthorNotFound(author_id.to_string()))?;

        let candidates = self
            .users
            .get_active_in_team_excluding(team_id, author_id)
            .await?;
        let reviewers = self.selector.select_initial(&candidates);

        let pr = PullRequest::open(id, title, author_id, reviewers, Utc::now());

        self.pull_requests
            .create_with_reviewers(&pr)
            .await
            .map_err(|e| match e {
                StorageError::UniqueViolation(_) => {
                    ServiceError::PullRequestExists(id.to_string())
                }
                other => other.into(),
            })?;

        info!(
            pr_id = %pr.id,
            author = %pr.author_id,
            reviewers = ?pr.assigned_reviewers,
            "Pull request created"
        );
        Ok(pr)
    }

    /// Marks a pull request merged. Merging a merged pull request returns it
    /// unchanged.
    ///
    /// # Errors
    ///
    /// `PullRequestNotFound` if the ID is unknown.
    pub async fn merge_pull_request(&self, id: &str) -> ServiceResult<PullRequest> {
        let pr = self.find(id).await?;

        if !pr.status.can_transition_to(PullRequestStatus::Merged) {
            debug!(pr_id = %id, status = %pr.status, "Pull request already merged");
            return Ok(pr);
        }

        let merged = self.pull_requests.merge(id, Utc::now()).await?;
        if merged {
            info!(pr_id = %id, "Pull request merged");
        }

        self.find(id).await
    }

    /// Replaces `old_reviewer_id` with a random active teammate of theirs.
    ///
    /// The author and the other current reviewers are never picked.
    ///
    /// # Errors
    ///
    /// - `PullRequestNotFound` if the ID is unknown
    /// - `PullRequestMerged` if the pull request is merged
    /// - `NotAssigned` if `old_reviewer_id` is not a current reviewer
    /// - `NoCandidate` if nobody is left to pick
    pub async fn reassign_reviewer(
        &self,
        pr_id: &str,
        old_reviewer_id: &str,
    ) -> ServiceResult<Reassignment> {
        self.reassign_excluding(pr_id, old_reviewer_id, &HashSet::new())
            .await
    }

    /// Reassignment with extra users removed from the candidate pool.
    pub(crate) async fn reassign_excluding(
        &self,
        pr_id: &str,
        old_reviewer_id: &str,
        excluded: &HashSet<String>,
    ) -> ServiceResult<Reassignment> {
        let pr = self.find(pr_id).await?;

        if pr.is_merged() {
            return Err(ServiceError::PullRequestMerged(pr_id.to_string()));
        }

        let reviewers = self.pull_requests.get_reviewers(pr_id).await?;
        if !reviewers.iter().any(|r| r == old_reviewer_id) {
            return Err(not_assigned(pr_id, old_reviewer_id));
        }

        let team = self
            .users
            .get_team_by_user(old_reviewer_id)
            .await?
            .ok_or_else(|| ServiceError::UserNotFound(old_reviewer_id.to_string()))?;

        let candidates: Vec<_> = self
            .users
            .get_active_in_team_excluding(team.id, old_reviewer_id)
            .await?
            .into_iter()
            .filter(|user| user.id != pr.author_id)
            .filter(|user| !reviewers.contains(&user.id))
            .filter(|user| !excluded.contains(&user.id))
            .collect();

        let new_reviewer_id = self.selector.select_replacement(&candidates)?.id.clone();

        let replaced = self
            .pull_requests
            .replace_reviewer(pr_id, old_reviewer_id, &new_reviewer_id)
            .await?;
        if !replaced {
            // Another request merged the pull request or swapped the
            // reviewer out first
            let current = self.find(pr_id).await?;
            if current.is_merged() {
                return Err(ServiceError::PullRequestMerged(pr_id.to_string()));
            }
            return Err(not_assigned(pr_id, old_reviewer_id));
        }

        info!(
            pr_id = %pr_id,
            old_reviewer = %old_reviewer_id,
            new_reviewer = %new_reviewer_id,
            team = %team.name,
            "Reviewer reassigned"
        );

        let pull_request = self.find(pr_id).await?;
        Ok(Reassignment {
            new_reviewer_id,
            pull_request,
        })
    }

    /// Pull requests of any status where `user_id` is a reviewer.
    ///
    /// # Errors
    ///
    /// `UserNotFound` or `TeamNotFound` if the user or their team cannot be
    /// resolved.
    pub async fn get_review_prs(&self, user_id: &str) -> ServiceResult<Vec<PullRequest>> {
        let team_id = self
            .users
            .get_team_id_by_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::UserNotFound(user_id.to_string()))?;

        if self.teams.get_by_id(team_id).await?.is_none() {
            return Err(ServiceError::TeamNotFound(team_id.to_string()));
        }

        Ok(self.pull_requests.get_by_reviewer(user_id).await?)
    }

    /// Number of pull requests (any status) per reviewer.
    pub async fn get_review_stats(&self) -> ServiceResult<BTreeMap<String, i64>> {
        Ok(self.pull_requests.get_review_counts().await?)
    }

    async fn find(&self, id: &str) -> ServiceResult<PullRequest> {
        self.pull_requests
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::PullRequestNotFound(id.to_string()))
    }
}

fn not_assigned(pr_id: &str, reviewer_id: &str) -> ServiceError {
    ServiceError::NotAssigned {
        pr_id: pr_id.to_string(),
        reviewer_id: reviewer_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TeamMember;
    use crate::repository::InMemoryStore;
    use crate::service::selection::FixedSource;

    async fn setup(members: &[(&str, bool)]) -> (Repositories, PullRequestService) {
        let repos = Repositories::in_memory();
        let team_id = repos.teams.create("backend").await.unwrap();
        let members: Vec<TeamMember> = members
            .iter()
            .map(|(id, active)| TeamMember::new(*id, id.to_uppercase(), *active))
            .collect();
        repos.users.upsert_many(team_id, &members).await.unwrap();

        let service =
            PullRequestService::new(&repos, ReviewerSelector::new(Arc::new(FixedSource::new(0))));
        (repos, service)
    }

    #[tokio::test]
    async fn test_create_assigns_first_two_active_teammates() {
        let (_, service) =
            setup(&[("u1", true), ("u2", true), ("u3", false), ("u4", true), ("u5", true)]).await;

        let pr = service.create_pull_request("pr-1", "Add search", "u1").await.unwrap();

        assert_eq!(pr.status, PullRequestStatus::Open);
        assert_eq!(pr.assigned_reviewers, vec!["u2", "u4"]);
        assert!(pr.merged_at.is_none());
    }

    #[tokio::test]
    async fn test_create_with_no_teammates_has_no_reviewers() {
        let (_, service) = setup(&[("u1", true)]).await;

        let pr = service.create_pull_request("pr-1", "Solo", "u1").await.unwrap();
        assert!(pr.assigned_reviewers.is_empty());
    }

    #[tokio::test]
    async fn test_create_duplicate_and_unknown_author() {
        let (_, service) = setup(&[("u1", true), ("u2", true)]).await;
        service.create_pull_request("pr-1", "First", "u1").await.unwrap();

        let err = service.create_pull_request("pr-1", "Again", "u2").await.unwrap_err();
        assert!(matches!(err, ServiceError::PullRequestExists(_)));

        let err = service.create_pull_request("pr-2", "Ghost", "nobody").await.unwrap_err();
        assert!(matches!(err, ServiceError::AuthorNotFound(_)));
    }

    #[tokio::test]
    async fn test_failed_create_stores_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let repos = Repositories::from_memory(store.clone());
        let team_id = repos.teams.create("backend").await.unwrap();
        repos
            .users
            .upsert_many(
                team_id,
                &[TeamMember::new("u1", "A", true), TeamMember::new("u2", "B", true)],
            )
            .await
            .unwrap();
        let service =
            PullRequestService::new(&repos, ReviewerSelector::new(Arc::new(FixedSource::new(0))));

        store.fail_operation("assign_reviewers");
        let err = service.create_pull_request("pr-1", "Fix", "u1").await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
        assert!(repos.pull_requests.get_by_id("pr-1").await.unwrap().is_none());

        // The ID is still free once storage recovers
        store.clear_failures();
        let pr = service.create_pull_request("pr-1", "Fix", "u1").await.unwrap();
        assert_eq!(pr.assigned_reviewers, vec!["u2"]);

        let stored = repos.pull_requests.get_by_id("pr-1").await.unwrap().unwrap();
        assert_eq!(stored.assigned_reviewers, vec!["u2"]);
    }

    #[tokio::test]
    async fn test_merge_is_idempotent() {
        let (_, service) = setup(&[("u1", true), ("u2", true)]).await;
        service.create_pull_request("pr-1", "Fix", "u1").await.unwrap();

        let first = service.merge_pull_request("pr-1").await.unwrap();
        assert_eq!(first.status, PullRequestStatus::Merged);
        assert!(first.merged_at.is_some());

        let second = service.merge_pull_request("pr-1").await.unwrap();
        assert_eq!(second, first);

        let err = service.merge_pull_request("missing").await.unwrap_err();
        assert!(matches!(err, ServiceError::PullRequestNotFound(_)));
    }

    #[tokio::test]
    async fn test_reassign_skips_author_and_current_reviewers() {
        let (_, service) =
            setup(&[("u1", true), ("u2", true), ("u3", true), ("u4", true)]).await;
        service.create_pull_request("pr-1", "Refactor", "u2").await.unwrap();

        // Reviewers are u1 and u3; only u4 is eligible to replace u1.
        let result = service.reassign_reviewer("pr-1", "u1").await.unwrap();

        assert_eq!(result.new_reviewer_id, "u4");
        assert_eq!(result.pull_request.assigned_reviewers, vec!["u4", "u3"]);
    }

    #[tokio::test]
    async fn test_reassign_errors() {
        let (_, service) = setup(&[("u1", true), ("u2", true)]).await;
        service.create_pull_request("pr-1", "Docs", "u1").await.unwrap();

        let err = service.reassign_reviewer("pr-1", "u1").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotAssigned { .. }));

        let err = service.reassign_reviewer("pr-1", "u2").await.unwrap_err();
        assert!(matches!(err, ServiceError::NoCandidate));

        let err = service.reassign_reviewer("missing", "u2").await.unwrap_err();
        assert!(matches!(err, ServiceError::PullRequestNotFound(_)));

        service.merge_pull_request("pr-1").await.unwrap();
        let err = service.reassign_reviewer("pr-1", "u2").await.unwrap_err();
        assert!(matches!(err, ServiceError::PullRequestMerged(_)));

        // Merged wins over every other argument check
        for reviewer in ["u1", "nobody"] {
            let err = service.reassign_reviewer("pr-1", reviewer).await.unwrap_err();
            assert!(matches!(err, ServiceError::PullRequestMerged(_)), "{}", reviewer);
        }
    }

    #[tokio::test]
    async fn test_review_prs_and_stats() {
        let (_, service) = setup(&[("u1", true), ("u2", true), ("u3", true)]).await;
        service.create_pull_request("pr-1", "One", "u1").await.unwrap();
        service.create_pull_request("pr-2", "Two", "u3").await.unwrap();
        service.merge_pull_request("pr-1").await.unwrap();

        let prs = service.get_review_prs("u2").await.unwrap();
        let ids: Vec<&str> = prs.iter().map(|pr| pr.id.as_str()).collect();
        assert_eq!(ids, vec!["pr-1", "pr-2"]);

        let stats = service.get_review_stats().await.unwrap();
        assert_eq!(stats.get("u1"), Some(&1));
        assert_eq!(stats.get("u2"), Some(&2));
        assert_eq!(stats.get("u3"), Some(&1));

        let err = service.get_review_prs("nobody").await.unwrap_err();
        assert!(matches!(err, ServiceError::UserNotFound(_)));
    }
}
