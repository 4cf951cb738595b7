use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`. Every route requires `ROLE_ADMIN`.
///
/// ```text
/// GET    /users               -> list_users
/// POST   /users               -> create_user
/// PUT    /users/{id}/active   -> set_user_active
/// POST   /users/{id}/token    -> issue_token
/// POST   /search/reindex      -> reindex
/// POST   /search/reconcile    -> reconcile
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route("/users/{id}/active", put(admin::set_user_active))
        .route("/users/{id}/token", post(admin::issue_token))
        .route("/search/reindex", post(admin::reindex))
        .route("/search/reconcile", post(admin::reconcile))
}
