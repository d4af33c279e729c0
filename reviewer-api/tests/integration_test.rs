//! Integration tests for the Reviewer Service API
//!
//! These tests drive the full router end-to-end against the in-memory
//! store:
//! - Team creation and lookup
//! - Pull request lifecycle (create → reassign → merge)
//! - Cascading deactivation
//! - Error responses and status codes

mod common;

use axum::http::StatusCode;
use common::TestContext;
use serde_json::json;

async fn seed_team(ctx: &TestContext, name: &str, ids: &[&str]) {
    let members: Vec<_> = ids
        .iter()
        .map(|id| json!({ "user_id": id, "username": format!("User {}", id), "is_active": true }))
        .collect();

    let (status, _) = ctx
        .post("/team/add", json!({ "team_name": name, "members": members }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new();

    let (status, body) = ctx.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "reviewer_service");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_health_degraded_when_storage_down() {
    let ctx = TestContext::new();
    ctx.store.fail_operation("ping");

    let (status, body) = ctx.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "disconnected");
}

#[tokio::test]
async fn test_add_and_get_team() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .post(
            "/team/add",
            json!({
                "team_name": "backend",
                "members": [
                    { "user_id": "u1", "username": "Alice", "is_active": true },
                    { "user_id": "u2", "username": "Bob", "is_active": false }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["team"]["team_name"], "backend");
    assert_eq!(body["team"]["members"].as_array().unwrap().len(), 2);

    let (status, body) = ctx.get("/team/get?team_name=backend").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["members"][1]["user_id"], "u2");
    assert_eq!(body["members"][1]["is_active"], false);

    let (status, body) = ctx
        .post("/team/add", json!({ "team_name": "backend", "members": [] }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "team_exists");

    let (status, body) = ctx.get("/team/get?team_name=frontend").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = ctx.get("/team/get").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_add_team_validation() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .post(
            "/team/add",
            json!({
                "team_name": "",
                "members": [{ "user_id": "", "username": "Nobody", "is_active": true }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    assert!(!body["details"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_pull_request_lifecycle() {
    let ctx = TestContext::new();
    seed_team(&ctx, "backend", &["u1", "u2", "u3", "u4"]).await;

    let (status, body) = ctx
        .post(
            "/pullRequest/create",
            json!({ "pull_request_id": "pr-1", "pull_request_name": "Add search", "author_id": "u1" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["pr"]["status"], "OPEN");
    assert_eq!(body["pr"]["assigned_reviewers"], json!(["u2", "u3"]));
    assert!(body["pr"]["mergedAt"].is_null());

    let (status, body) = ctx
        .post(
            "/pullRequest/reassign",
            json!({ "pull_request_id": "pr-1", "old_user_id": "u2" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["replaced_by"], "u4");
    assert_eq!(body["pr"]["assigned_reviewers"], json!(["u4", "u3"]));

    let (status, body) = ctx
        .post("/pullRequest/merge", json!({ "pull_request_id": "pr-1" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pr"]["status"], "MERGED");
    let merged_at = body["pr"]["mergedAt"].clone();
    assert!(merged_at.is_string());

    let (status, body) = ctx
        .post("/pullRequest/merge", json!({ "pull_request_id": "pr-1" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pr"]["mergedAt"], merged_at);

    let (status, body) = ctx
        .post(
            "/pullRequest/reassign",
            json!({ "pull_request_id": "pr-1", "old_user_id": "u3" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "pr_merged");
}

#[tokio::test]
async fn test_pull_request_errors() {
    let ctx = TestContext::new();
    seed_team(&ctx, "backend", &["u1", "u2"]).await;

    let create = json!({ "pull_request_id": "pr-1", "pull_request_name": "Fix", "author_id": "u1" });
    let (status, _) = ctx.post("/pullRequest/create", create.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = ctx.post("/pullRequest/create", create).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "pr_exists");

    let (status, body) = ctx
        .post(
            "/pullRequest/create",
            json!({ "pull_request_id": "pr-2", "pull_request_name": "Fix", "author_id": "ghost" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = ctx
        .post(
            "/pullRequest/reassign",
            json!({ "pull_request_id": "pr-1", "old_user_id": "u1" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "not_assigned");

    let (status, body) = ctx
        .post(
            "/pullRequest/reassign",
            json!({ "pull_request_id": "pr-1", "old_user_id": "u2" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "no_candidate");

    let (status, _) = ctx
        .post("/pullRequest/merge", json!({ "pull_request_id": "pr-404" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_users_and_stats() {
    let ctx = TestContext::new();
    seed_team(&ctx, "backend", &["u1", "u2", "u3"]).await;

    for (id, author) in [("pr-1", "u1"), ("pr-2", "u3")] {
        let (status, _) = ctx
            .post(
                "/pullRequest/create",
                json!({ "pull_request_id": id, "pull_request_name": "Work", "author_id": author }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = ctx.get("/users/getReview?user_id=u2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "u2");
    assert_eq!(body["pull_requests"].as_array().unwrap().len(), 2);
    assert_eq!(body["pull_requests"][0]["pull_request_id"], "pr-1");

    let (status, _) = ctx.get("/users/getReview").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx.get("/users/getReview?user_id=ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = ctx.get("/stats/reviews").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["review_assignments"], json!({ "u1": 1, "u2": 2, "u3": 1 }));

    let (status, body) = ctx
        .post("/users/setIsActive", json!({ "user_id": "u3", "is_active": false }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["team_name"], "backend");
    assert_eq!(body["user"]["is_active"], false);

    let (status, _) = ctx
        .post("/users/setIsActive", json!({ "user_id": "ghost", "is_active": true }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deactivate_users() {
    let ctx = TestContext::new();
    seed_team(&ctx, "backend", &["u1", "u2", "u3", "u4"]).await;

    let (status, _) = ctx
        .post(
            "/pullRequest/create",
            json!({ "pull_request_id": "pr-1", "pull_request_name": "Cache", "author_id": "u1" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = ctx
        .post(
            "/team/deactivateUsers",
            json!({ "team_name": "backend", "user_ids": ["u2", "u2"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["deactivated"], json!(["u2"]));
    assert_eq!(
        body["reassigned"],
        json!([{ "pr_id": "pr-1", "old_reviewer_id": "u2", "new_reviewer_id": "u4" }])
    );
    assert_eq!(body["unreplaced"], json!([]));

    let (_, team) = ctx.get("/team/get?team_name=backend").await;
    assert_eq!(team["members"][1]["user_id"], "u2");
    assert_eq!(team["members"][1]["is_active"], false);

    let (status, _) = ctx
        .post("/team/deactivateUsers", json!({ "team_name": "backend", "user_ids": [] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .post("/team/deactivateUsers", json!({ "team_name": "ghosts", "user_ids": ["u1"] }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_storage_failure_is_internal_error() {
    let ctx = TestContext::new();
    ctx.store.fail_operation("get_review_counts");

    let (status, body) = ctx.get("/stats/reviews").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal_error");
    assert_eq!(body["message"], "An internal error occurred");
}
