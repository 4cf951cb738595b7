//! Route definitions for the `/flows` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::flows;
use crate::state::AppState;

/// Routes mounted at `/flows`.
///
/// ```text
/// GET    /                -> list_flows     (ROLE_USER)
/// POST   /                -> create_flow    (ROLE_EDIT_FLOWS)
/// GET    /search?query=   -> search_flows   (ROLE_USER)
/// GET    /{id}            -> get_flow       (ROLE_USER)
/// PUT    /{id}            -> update_flow    (ROLE_EDIT_FLOWS)
/// DELETE /{id}            -> delete_flow    (ROLE_EDIT_FLOWS)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(flows::list_flows).post(flows::create_flow))
        .route("/search", get(flows::search_flows))
        .route(
            "/{id}",
            get(flows::get_flow)
                .put(flows::update_flow)
                .delete(flows::delete_flow),
        )
}
