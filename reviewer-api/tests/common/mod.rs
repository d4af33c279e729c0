//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - An app wired to the in-memory store with deterministic reviewer picks
//! - JSON request helpers

use axum::body::Body;
use axum::http::{Request, StatusCode};
use reviewer_api::app::{build_router, AppState};
use reviewer_api::config::{ApiConfig, Config, DatabaseConfig};
use reviewer_shared::repository::{InMemoryStore, Repositories};
use reviewer_shared::service::{FixedSource, ReviewerSelector};
use serde_json::Value;
use std::sync::Arc;
use tower::Service as _;

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<InMemoryStore>,
    pub app: axum::Router,
}

impl TestContext {
    /// Creates a new test context with an empty store
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let repositories = Repositories::from_memory(store.clone());
        let selector = ReviewerSelector::new(Arc::new(FixedSource::new(0)));

        let state = AppState::new(repositories, selector, test_config());
        let app = build_router(state);

        TestContext { store, app }
    }

    /// Sends a GET request and returns status and JSON body
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Sends a POST request with a JSON body and returns status and JSON body
    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);

        (status, json)
    }
}

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            shutdown_timeout_secs: 5,
        },
        database: DatabaseConfig {
            url: "postgresql://unused".to_string(),
            max_connections: 1,
            connect_attempts: 1,
        },
    }
}
