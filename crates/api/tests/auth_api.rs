//! Authentication, role policy and admin endpoint tests.

mod common;

use appflow_core::roles::{ROLE_ADMIN, ROLE_EDIT_APPS, ROLE_USER};
use appflow_core::search::{INDEX_APPS, INDEX_FLOWS};
use appflow_db::models::app::CreateApp;
use axum::http::StatusCode;
use common::{
    body_json, get, get_auth, post_auth, post_json, post_json_auth, put_json_auth, token_for,
};
use serde_json::json;

#[tokio::test]
async fn missing_token_is_401() {
    let app = common::build_test_app();

    let response = get(app.app(), "/api/v1/apps").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");

    let response = post_json(app.app(), "/api/v1/apps", json!({"name": "CRM"})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_token_is_401() {
    let app = common::build_test_app();

    let response = get_auth(app.app(), "/api/v1/apps", "not-a-jwt").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_for_unknown_user_is_401() {
    let app = common::build_test_app();

    let response = get_auth(app.app(), "/api/v1/apps", &token_for(9_999)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_returns_roles_from_the_database() {
    let app = common::build_test_app();
    let token = app
        .token_with_roles("alice", &[ROLE_USER, ROLE_EDIT_APPS])
        .await;

    let response = get_auth(app.app(), "/api/v1/auth/me", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["username"], "alice");
    assert_eq!(me["roles"], json!([ROLE_EDIT_APPS, ROLE_USER]));
}

#[tokio::test]
async fn reader_cannot_write_apps() {
    let app = common::build_test_app();
    let token = app.token_with_roles("reader", &[ROLE_USER]).await;

    let response = post_json_auth(app.app(), "/api/v1/apps", json!({"name": "CRM"}), &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");
}

#[tokio::test]
async fn user_without_any_role_cannot_read() {
    let app = common::build_test_app();
    let token = app.token_with_roles("nobody", &[]).await;

    let response = get_auth(app.app(), "/api/v1/apps", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_satisfies_every_role() {
    let app = common::build_test_app();
    let token = app.token_with_roles("root", &[ROLE_ADMIN]).await;

    let response = post_json_auth(app.app(), "/api/v1/apps", json!({"name": "CRM"}), &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = get_auth(app.app(), "/api/v1/apps", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn non_admin_cannot_reach_admin_routes() {
    let app = common::build_test_app();
    let token = app
        .token_with_roles("editor", &[ROLE_USER, ROLE_EDIT_APPS])
        .await;

    let response = get_auth(app.app(), "/api/v1/admin/users", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = post_auth(app.app(), "/api/v1/admin/search/reindex", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_provisions_user_and_issues_token() {
    let app = common::build_test_app();
    let admin = app.token_with_roles("root", &[ROLE_ADMIN]).await;

    let response = post_json_auth(
        app.app(),
        "/api/v1/admin/users",
        json!({"username": "etl-bot", "email": "etl@corp.test", "roles": [ROLE_USER]}),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let user = body_json(response).await;
    assert_eq!(user["username"], "etl-bot");
    assert_eq!(user["isActive"], true);
    let user_id = user["id"].as_i64().unwrap();

    let response = post_auth(
        app.app(),
        &format!("/api/v1/admin/users/{user_id}/token"),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let issued = body_json(response).await;
    assert_eq!(issued["expiresIn"], 15 * 60);
    let bot_token = issued["accessToken"].as_str().unwrap().to_string();

    let response = get_auth(app.app(), "/api/v1/auth/me", &bot_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["username"], "etl-bot");

    let response = get_auth(app.app(), "/api/v1/admin/users", &admin).await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_role_is_rejected() {
    let app = common::build_test_app();
    let admin = app.token_with_roles("root", &[ROLE_ADMIN]).await;

    let response = post_json_auth(
        app.app(),
        "/api/v1/admin/users",
        json!({"username": "bob", "email": "bob@corp.test", "roles": ["ROLE_GOD"]}),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deactivated_user_is_401() {
    let app = common::build_test_app();
    let admin = app.token_with_roles("root", &[ROLE_ADMIN]).await;
    let reader = app.token_with_roles("reader", &[ROLE_USER]).await;

    let response = get_auth(app.app(), "/api/v1/auth/me", &reader).await;
    let reader_id = body_json(response).await["id"].as_i64().unwrap();

    let response = put_json_auth(
        app.app(),
        &format!("/api/v1/admin/users/{reader_id}/active"),
        json!({"isActive": false}),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get_auth(app.app(), "/api/v1/apps", &reader).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_auth(
        app.app(),
        &format!("/api/v1/admin/users/{reader_id}/token"),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_cannot_deactivate_itself() {
    let app = common::build_test_app();
    let admin = app.token_with_roles("root", &[ROLE_ADMIN]).await;
    let response = get_auth(app.app(), "/api/v1/auth/me", &admin).await;
    let admin_id = body_json(response).await["id"].as_i64().unwrap();

    let response = put_json_auth(
        app.app(),
        &format!("/api/v1/admin/users/{admin_id}/active"),
        json!({"isActive": false}),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = put_json_auth(
        app.app(),
        "/api/v1/admin/users/777/active",
        json!({"isActive": true}),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reindex_rebuilds_from_the_database() {
    let app = common::build_test_app();
    let admin = app.token_with_roles("root", &[ROLE_ADMIN]).await;
    for name in ["CRM", "ESB"] {
        app.state
            .repos
            .apps
            .create(&CreateApp {
                name: name.into(),
                description: None,
            })
            .await
            .unwrap();
    }
    assert!(app.search.index(INDEX_APPS).is_empty());

    let response = post_auth(app.app(), "/api/v1/admin/search/reindex", &admin).await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report[INDEX_APPS], 2);
    assert_eq!(report[INDEX_FLOWS], 0);
    assert_eq!(app.search.index(INDEX_APPS).len(), 2);

    let response = post_auth(
        app.app(),
        &format!("/api/v1/admin/search/reindex?index={INDEX_APPS}"),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report[INDEX_APPS], 2);
    assert!(report.get(INDEX_FLOWS).is_none());

    let response = post_auth(
        app.app(),
        "/api/v1/admin/search/reindex?index=bogus",
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reconcile_replays_parked_writes() {
    let app = common::build_test_app();
    let admin = app.token_with_roles("root", &[ROLE_ADMIN]).await;

    app.search.index(INDEX_APPS).set_unavailable(true);
    let response = post_json_auth(app.app(), "/api/v1/apps", json!({"name": "CRM"}), &admin).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_auth(app.app(), "/api/v1/admin/search/reconcile", &admin).await;
    let report = body_json(response).await;
    assert_eq!(report["replayed"], 0);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["pending"], 1);

    app.search.index(INDEX_APPS).set_unavailable(false);
    let response = post_auth(app.app(), "/api/v1/admin/search/reconcile?limit=10", &admin).await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["replayed"], 1);
    assert_eq!(report["pending"], 0);
    assert_eq!(app.search.index(INDEX_APPS).len(), 1);
}
