//! Pull request endpoints
//!
//! # Endpoints
//!
//! - `POST /pullRequest/create` - Create a pull request and assign reviewers
//! - `POST /pullRequest/merge` - Merge a pull request (idempotent)
//! - `POST /pullRequest/reassign` - Replace one reviewer with a teammate
//!
//! Every response embeds the pull request as:
//!
//! ```json
//! {
//!   "pull_request_id": "pr-1",
//!   "pull_request_name": "Add search",
//!   "author_id": "u1",
//!   "status": "OPEN",
//!   "assigned_reviewers": ["u2", "u3"],
//!   "createdAt": "2024-01-01T12:00:00Z",
//!   "mergedAt": null
//! }
//! ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use reviewer_shared::models::{PullRequest, PullRequestStatus};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Pull request as exposed over HTTP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequestView {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
    pub status: PullRequestStatus,
    pub assigned_reviewers: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "mergedAt")]
    pub merged_at: Option<DateTime<Utc>>,
}

impl From<PullRequest> for PullRequestView {
    fn from(pr: PullRequest) -> Self {
        Self {
            pull_request_id: pr.id,
            pull_request_name: pr.title,
            author_id: pr.author_id,
            status: pr.status,
            assigned_reviewers: pr.assigned_reviewers,
            created_at: pr.created_at,
            merged_at: pr.merged_at,
        }
    }
}

/// Create pull request request
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePullRequestRequest {
    #[validate(length(min = 1, message = "pull_request_id must not be empty"))]
    pub pull_request_id: String,

    #[validate(length(min = 1, message = "pull_request_name must not be empty"))]
    pub pull_request_name: String,

    #[validate(length(min = 1, message = "author_id must not be empty"))]
    pub author_id: String,
}

/// Merge pull request request
#[derive(Debug, Deserialize, Validate)]
pub struct MergePullRequestRequest {
    #[validate(length(min = 1, message = "pull_request_id must not be empty"))]
    pub pull_request_id: String,
}

/// Reassign reviewer request
#[derive(Debug, Deserialize, Validate)]
pub struct ReassignRequest {
    #[validate(length(min = 1, message = "pull_request_id must not be empty"))]
    pub pull_request_id: String,

    /// Reviewer to replace
    #[validate(length(min = 1, message = "old_user_id must not be empty"))]
    pub old_user_id: String,
}

/// Response wrapping a single pull request
#[derive(Debug, Serialize, Deserialize)]
pub struct PullRequestResponse {
    pub pr: PullRequestView,
}

/// Reassign response
#[derive(Debug, Serialize, Deserialize)]
pub struct ReassignResponse {
    pub pr: PullRequestView,

    /// Reviewer that took over the slot
    pub replaced_by: String,
}

/// Create a pull request
///
/// Up to two active teammates of the author are assigned as reviewers.
///
/// # Errors
///
/// - `404 not_found`: Author does not exist
/// - `409 pr_exists`: Pull request ID already taken
/// - `422 validation_error`: Empty fields
pub async fn create_pull_request(
    State(state): State<AppState>,
    Json(req): Json<CreatePullRequestRequest>,
) -> ApiResult<(StatusCode, Json<PullRequestResponse>)> {
    req.validate()?;

    let pr = state
        .services
        .pull_requests
        .create_pull_request(&req.pull_request_id, &req.pull_request_name, &req.author_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(PullRequestResponse { pr: pr.into() }),
    ))
}

/// Merge a pull request
///
/// Merging an already merged pull request returns it unchanged.
///
/// # Errors
///
/// - `404 not_found`: Pull request does not exist
pub async fn merge_pull_request(
    State(state): State<AppState>,
    Json(req): Json<MergePullRequestRequest>,
) -> ApiResult<Json<PullRequestResponse>> {
    req.validate()?;

    let pr = state
        .services
        .pull_requests
        .merge_pull_request(&req.pull_request_id)
        .await?;

    Ok(Json(PullRequestResponse { pr: pr.into() }))
}

/// Replace a reviewer with a random active teammate
///
/// # Errors
///
/// - `404 not_found`: Pull request does not exist
/// - `409 pr_merged`: Pull request is merged
/// - `409 not_assigned`: `old_user_id` is not a reviewer
/// - `409 no_candidate`: Nobody is available to take over
pub async fn reassign_reviewer(
    State(state): State<AppState>,
    Json(req): Json<ReassignRequest>,
) -> ApiResult<Json<ReassignResponse>> {
    req.validate()?;

    let reassignment = state
        .services
        .pull_requests
        .reassign_reviewer(&req.pull_request_id, &req.old_user_id)
        .await?;

    Ok(Json(ReassignResponse {
        pr: reassignment.pull_request.into(),
        replaced_by: reassignment.new_reviewer_id,
    }))
}
