pub mod admin;
pub mod apps;
pub mod auth;
pub mod flows;
pub mod health;
pub mod technos;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Role requirements are enforced by the extractor each handler takes
/// (see [`crate::middleware::rbac`]).
///
/// ```text
/// /auth/me                                 current user (authenticated)
///
/// /apps                                    list, create
/// /apps/search?query=                      index search
/// /apps/{id}                               get, update, delete
///
/// /flows                                   list, create
/// /flows/search?query=                     index search
/// /flows/{id}                              get, update, delete
///
/// /technos                                 list, create-or-reuse
///
/// /admin/users                             list, create (admin only)
/// /admin/users/{id}/active                 activate / deactivate
/// /admin/users/{id}/token                  issue access token
/// /admin/search/reindex                    rebuild indexes
/// /admin/search/reconcile                  replay search outbox
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/apps", apps::router())
        .nest("/flows", flows::router())
        .nest("/technos", technos::router())
        .nest("/admin", admin::router())
}
