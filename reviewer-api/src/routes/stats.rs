//! Review statistics endpoint
//!
//! ```text
//! GET /stats/reviews
//! ```
//!
//! ```json
//! { "review_assignments": { "u1": 3, "u2": 1 } }
//! ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Deserialize)]
pub struct ReviewStatsResponse {
    /// Pull requests (any status) per assigned reviewer
    pub review_assignments: BTreeMap<String, i64>,
}

pub async fn review_stats(State(state): State<AppState>) -> ApiResult<Json<ReviewStatsResponse>> {
    let review_assignments = state.services.pull_requests.get_review_stats().await?;
    Ok(Json(ReviewStatsResponse { review_assignments }))
}
