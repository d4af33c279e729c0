//! Team endpoints
//!
//! # Endpoints
//!
//! - `POST /team/add` - Create a team and upsert its members
//! - `GET /team/get?team_name=` - Team with its current members
//! - `POST /team/deactivateUsers` - Deactivate users, moving their open reviews

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use reviewer_shared::models::{Team, TeamMember};
use reviewer_shared::service::{ReassignedSlot, UnreplacedSlot};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Team member in a create request
#[derive(Debug, Deserialize, Validate)]
pub struct MemberRequest {
    #[validate(length(min = 1, message = "user_id must not be empty"))]
    pub user_id: String,

    pub username: String,

    pub is_active: bool,
}

impl From<MemberRequest> for TeamMember {
    fn from(member: MemberRequest) -> Self {
        TeamMember::new(member.user_id, member.username, member.is_active)
    }
}

/// Add team request
#[derive(Debug, Deserialize, Validate)]
pub struct AddTeamRequest {
    #[validate(length(min = 1, message = "team_name must not be empty"))]
    pub team_name: String,

    #[serde(default)]
    #[validate(nested)]
    pub members: Vec<MemberRequest>,
}

/// Team as exposed over HTTP
#[derive(Debug, Serialize, Deserialize)]
pub struct TeamView {
    pub team_name: String,
    pub members: Vec<TeamMember>,
}

impl From<Team> for TeamView {
    fn from(team: Team) -> Self {
        Self {
            team_name: team.name,
            members: team.members,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddTeamResponse {
    pub team: TeamView,
}

#[derive(Debug, Deserialize)]
pub struct TeamQuery {
    pub team_name: Option<String>,
}

/// Deactivate users request
#[derive(Debug, Deserialize)]
pub struct DeactivateUsersRequest {
    #[serde(default)]
    pub team_name: String,

    #[serde(default)]
    pub user_ids: Vec<String>,
}

/// Deactivate users response
#[derive(Debug, Serialize, Deserialize)]
pub struct DeactivateUsersResponse {
    pub status: String,
    pub deactivated: Vec<String>,
    pub reassigned: Vec<ReassignedSlot>,
    pub unreplaced: Vec<UnreplacedSlot>,
}

/// Create a team
///
/// Members that already exist are moved into the new team.
///
/// # Errors
///
/// - `409 team_exists`: Team name already taken
/// - `422 validation_error`: Empty team name or user ID
pub async fn add_team(
    State(state): State<AppState>,
    Json(req): Json<AddTeamRequest>,
) -> ApiResult<(StatusCode, Json<AddTeamResponse>)> {
    req.validate()?;

    let members: Vec<TeamMember> = req.members.into_iter().map(TeamMember::from).collect();
    let team = state.services.teams.add_team(&req.team_name, members).await?;

    Ok((
        StatusCode::CREATED,
        Json(AddTeamResponse { team: team.into() }),
    ))
}

/// Get a team with its members
///
/// # Errors
///
/// - `400 bad_request`: `team_name` missing
/// - `404 not_found`: Team does not exist
pub async fn get_team(
    State(state): State<AppState>,
    Query(query): Query<TeamQuery>,
) -> ApiResult<Json<TeamView>> {
    let team_name = query
        .team_name
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::BadRequest("team_name is required".to_string()))?;

    let team = state.services.teams.get_team(&team_name).await?;
    Ok(Json(team.into()))
}

/// Deactivate users and move their open reviews to teammates
///
/// Slots with nobody left to take over are reported in `unreplaced`.
///
/// # Errors
///
/// - `400 bad_request`: `team_name` or `user_ids` missing
/// - `404 not_found`: Team does not exist
pub async fn deactivate_users(
    State(state): State<AppState>,
    Json(req): Json<DeactivateUsersRequest>,
) -> ApiResult<Json<DeactivateUsersResponse>> {
    if req.team_name.is_empty() || req.user_ids.is_empty() {
        return Err(ApiError::BadRequest(
            "team_name and user_ids are required".to_string(),
        ));
    }

    let report = state
        .services
        .teams
        .deactivate_users_and_reassign(&req.team_name, &req.user_ids)
        .await?;

    Ok(Json(DeactivateUsersResponse {
        status: "ok".to_string(),
        deactivated: report.deactivated,
        reassigned: report.reassigned,
        unreplaced: report.unreplaced,
    }))
}
