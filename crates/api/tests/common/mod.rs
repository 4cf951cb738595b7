//! Shared harness for the HTTP integration suites.
//!
//! Builds the production router over the in-memory repositories and the
//! in-process search index, so the suites run without PostgreSQL or a
//! search provider.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use appflow_api::auth::jwt::{issue_service_token, JwtConfig};
use appflow_api::config::ServerConfig;
use appflow_api::router::build_app_router;
use appflow_api::state::AppState;
use appflow_core::types::DbId;
use appflow_db::memory::MemoryStore;
use appflow_db::models::user::CreateUser;
use appflow_search::memory::MemorySearchClient;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-that-is-long-enough";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        search_sync_interval_secs: 30,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            service_token_ttl_mins: 15,
        },
    }
}

/// A router plus handles on its backing stores for assertions.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: MemoryStore,
    pub search: MemorySearchClient,
}

impl TestApp {
    /// Fresh router sharing this app's stores.
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Provision an active user with `roles` and return a bearer token for it.
    pub async fn token_with_roles(&self, username: &str, roles: &[&str]) -> String {
        let user = self
            .state
            .repos
            .users
            .create(&CreateUser {
                username: username.to_string(),
                email: format!("{username}@test.com"),
                roles: roles.iter().map(|r| r.to_string()).collect(),
            })
            .await
            .expect("user creation should succeed");
        token_for(user.user.id)
    }
}

/// Build the full application router with all middleware layers.
pub fn build_test_app() -> TestApp {
    let store = MemoryStore::new();
    let search = MemorySearchClient::new();
    let state = AppState::new(test_config(), store.repositories(), &search);
    let router = build_app_router(state.clone());
    TestApp {
        router,
        state,
        store,
        search,
    }
}

/// Sign a token for `user_id` with the test secret.
pub fn token_for(user_id: DbId) -> String {
    issue_service_token(user_id, &test_config().jwt).expect("token generation should succeed")
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

/// Send an unauthenticated GET request.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

/// Send a GET request with a Bearer token.
pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

/// Send an unauthenticated POST request with a JSON body.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, None, Some(body)).await
}

/// Send a POST request with a JSON body and a Bearer token.
pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

/// Send a POST request without a body and with a Bearer token.
pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), None).await
}

/// Send a PUT request with a JSON body and a Bearer token.
pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

/// Send a DELETE request with a Bearer token.
pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
