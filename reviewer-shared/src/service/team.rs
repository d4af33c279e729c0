//! Team creation, lookup and cascading deactivation.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::{ServiceError, ServiceResult};
use super::pull_request::PullRequestService;
use crate::models::{Team, TeamMember};
use crate::repository::{
    PullRequestRepository, Repositories, StorageError, TeamRepository, UserRepository,
};

/// Reviewer slot moved to another user during deactivation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignedSlot {
    pub pr_id: String,
    pub old_reviewer_id: String,
    pub new_reviewer_id: String,
}

/// Reviewer slot left in place because no replacement was available
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreplacedSlot {
    pub pr_id: String,
    pub reviewer_id: String,
}

/// Result of `deactivate_users_and_reassign`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivationReport {
    /// Users marked inactive, deduplicated in request order
    pub deactivated: Vec<String>,
    pub reassigned: Vec<ReassignedSlot>,
    pub unreplaced: Vec<UnreplacedSlot>,
}

/// Owns teams and triggers reassignment when members leave
pub struct TeamService {
    teams: Arc<dyn TeamRepository>,
    users: Arc<dyn UserRepository>,
    pull_requests: Arc<dyn PullRequestRepository>,
    pr_service: Arc<PullRequestService>,
}

impl TeamService {
    pub fn new(repositories: &Repositories, pr_service: Arc<PullRequestService>) -> Self {
        Self {
            teams: repositories.teams.clone(),
            users: repositories.users.clone(),
            pull_requests: repositories.pull_requests.clone(),
            pr_service,
        }
    }

    /// Creates a team and upserts its members into it.
    ///
    /// Existing users are moved to the new team and their name and active
    /// flag overwritten.
    ///
    /// # Errors
    ///
    /// `TeamExists` if the name is taken (case-sensitive).
    pub async fn add_team(&self, name: &str, members: Vec<TeamMember>) -> ServiceResult<Team> {
        if self.teams.exists(name).await? {
            return Err(ServiceError::TeamExists(name.to_string()));
        }

        let id = self.teams.create(name).await.map_err(|e| match e {
            StorageError::UniqueViolation(_) => ServiceError::TeamExists(name.to_string()),
            other => other.into(),
        })?;

        self.users.upsert_many(id, &members).await?;

        info!(team = %name, team_id = id, members = members.len(), "Team created");

        let mut team = Team::new(id, name);
        team.members = members;
        Ok(team)
    }

    /// Team with its members as currently stored.
    ///
    /// # Errors
    ///
    /// `TeamNotFound` if the name is unknown.
    pub async fn get_team(&self, name: &str) -> ServiceResult<Team> {
        self.teams
            .get_by_name(name)
            .await?
            .ok_or_else(|| ServiceError::TeamNotFound(name.to_string()))
    }

    /// Moves the listed users off their open reviews, then marks them
    /// inactive.
    ///
    /// Users deactivated in the same call are never picked as replacements.
    /// A slot with no available replacement is left as is and reported in
    /// `unreplaced`. Any other failure aborts before anyone is deactivated;
    /// reassignments already made stay in place.
    ///
    /// # Errors
    ///
    /// `TeamNotFound` if `team_name` is unknown.
    pub async fn deactivate_users_and_reassign(
        &self,
        team_name: &str,
        user_ids: &[String],
    ) -> ServiceResult<DeactivationReport> {
        if !self.teams.exists(team_name).await? {
            return Err(ServiceError::TeamNotFound(team_name.to_string()));
        }

        let mut seen = HashSet::new();
        let departing: Vec<String> = user_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();
        let excluded: HashSet<String> = departing.iter().cloned().collect();

        let mut report = DeactivationReport::default();

        let open_prs = self.pull_requests.get_open_by_reviewers(&departing).await?;
        for pr in open_prs {
            let reviewers = self.pull_requests.get_reviewers(&pr.id).await?;

            for reviewer_id in reviewers.iter().filter(|r| excluded.contains(*r)) {
                match self
                    .pr_service
                    .reassign_excluding(&pr.id, reviewer_id, &excluded)
                    .await
                {
                    Ok(reassignment) => report.reassigned.push(ReassignedSlot {
                        pr_id: pr.id.clone(),
                        old_reviewer_id: reviewer_id.clone(),
                        new_reviewer_id: reassignment.new_reviewer_id,
                    }),
                    Err(ServiceError::NoCandidate) => {
                        warn!(
                            pr_id = %pr.id,
                            reviewer = %reviewer_id,
                            team = %team_name,
                            "No replacement reviewer available"
                        );
                        report.unreplaced.push(UnreplacedSlot {
                            pr_id: pr.id.clone(),
                            reviewer_id: reviewer_id.clone(),
                        });
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        self.users.deactivate_many(&departing).await?;

        info!(
            team = %team_name,
            deactivated = departing.len(),
            reassigned = report.reassigned.len(),
            unreplaced = report.unreplaced.len(),
            "Users deactivated"
        );

        report.deactivated = departing;
        Ok(report)
    }
}
