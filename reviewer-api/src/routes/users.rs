//! User endpoints
//!
//! # Endpoints
//!
//! - `POST /users/setIsActive` - Toggle a user's active flag
//! - `GET /users/getReview?user_id=` - Pull requests the user reviews

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::pull_requests::PullRequestView,
};
use axum::{
    extract::{Query, State},
    Json,
};
use reviewer_shared::models::User;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Set active flag request
#[derive(Debug, Deserialize, Validate)]
pub struct SetIsActiveRequest {
    #[validate(length(min = 1, message = "user_id must not be empty"))]
    pub user_id: String,

    pub is_active: bool,
}

/// User as exposed over HTTP
#[derive(Debug, Serialize, Deserialize)]
pub struct UserView {
    pub user_id: String,
    pub username: String,
    pub team_name: String,
    pub is_active: bool,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            team_name: user.team_name,
            is_active: user.is_active,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: UserView,
}

#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub user_id: String,
    pub pull_requests: Vec<PullRequestView>,
}

/// Set a user's active flag
///
/// Open reviews are left untouched; use `/team/deactivateUsers` to move
/// them.
///
/// # Errors
///
/// - `404 not_found`: User does not exist
pub async fn set_is_active(
    State(state): State<AppState>,
    Json(req): Json<SetIsActiveRequest>,
) -> ApiResult<Json<UserResponse>> {
    req.validate()?;

    let user = state
        .services
        .users
        .set_user_active(&req.user_id, req.is_active)
        .await?;

    Ok(Json(UserResponse { user: user.into() }))
}

/// List pull requests (any status) where the user is a reviewer
///
/// # Errors
///
/// - `400 bad_request`: `user_id` missing
/// - `404 not_found`: User does not exist
pub async fn get_review(
    State(state): State<AppState>,
    Query(query): Query<ReviewQuery>,
) -> ApiResult<Json<ReviewResponse>> {
    let user_id = query
        .user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("user_id is required".to_string()))?;

    let prs = state.services.pull_requests.get_review_prs(&user_id).await?;

    Ok(Json(ReviewResponse {
        user_id,
        pull_requests: prs.into_iter().map(PullRequestView::from).collect(),
    }))
}
