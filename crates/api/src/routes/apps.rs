//! Route definitions for the `/apps` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::apps;
use crate::state::AppState;

/// Routes mounted at `/apps`.
///
/// ```text
/// GET    /                -> list_apps      (ROLE_USER)
/// POST   /                -> create_app     (ROLE_EDIT_APPS)
/// GET    /search?query=   -> search_apps    (ROLE_USER)
/// GET    /{id}            -> get_app        (ROLE_USER)
/// PUT    /{id}            -> update_app     (ROLE_EDIT_APPS)
/// DELETE /{id}            -> delete_app     (ROLE_EDIT_APPS)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(apps::list_apps).post(apps::create_app))
        .route("/search", get(apps::search_apps))
        .route(
            "/{id}",
            get(apps::get_app)
                .put(apps::update_app)
                .delete(apps::delete_app),
        )
}
