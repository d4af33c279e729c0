//! Application state and router builder
//!
//! This module defines the shared application state and provides
//! a function to build the Axum router with all routes and middleware.
//!
//! # Example
//!
//! ```no_run
//! use reviewer_api::{app::AppState, config::Config};
//! use reviewer_shared::repository::Repositories;
//! use reviewer_shared::service::ReviewerSelector;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let state = AppState::new(Repositories::in_memory(), ReviewerSelector::entropy(), config);
//! let app = reviewer_api::app::build_router(state);
//! # Ok(())
//! # }
//! ```

use crate::config::Config;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use reviewer_shared::repository::{Repositories, StorageHealth};
use reviewer_shared::service::{ReviewerSelector, Services};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Assignment engine
    pub services: Services,

    /// Storage liveness probe
    pub storage: Arc<dyn StorageHealth>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(repositories: Repositories, selector: ReviewerSelector, config: Config) -> Self {
        Self {
            services: Services::new(&repositories, selector),
            storage: repositories.health.clone(),
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health
/// ├── /team/
/// │   ├── POST /add
/// │   ├── GET  /get?team_name=
/// │   └── POST /deactivateUsers
/// ├── /users/
/// │   ├── POST /setIsActive
/// │   └── GET  /getReview?user_id=
/// ├── /pullRequest/
/// │   ├── POST /create
/// │   ├── POST /merge
/// │   └── POST /reassign
/// └── GET  /stats/reviews
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let team_routes = Router::new()
        .route("/add", post(routes::teams::add_team))
        .route("/get", get(routes::teams::get_team))
        .route("/deactivateUsers", post(routes::teams::deactivate_users));

    let user_routes = Router::new()
        .route("/setIsActive", post(routes::users::set_is_active))
        .route("/getReview", get(routes::users::get_review));

    let pull_request_routes = Router::new()
        .route("/create", post(routes::pull_requests::create_pull_request))
        .route("/merge", post(routes::pull_requests::merge_pull_request))
        .route("/reassign", post(routes::pull_requests::reassign_reviewer));

    let cors = cors_layer(&state.config.api.cors_origins);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/stats/reviews", get(routes::stats::review_stats))
        .nest("/team", team_routes)
        .nest("/users", user_routes)
        .nest("/pullRequest", pull_request_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}
