use axum::routing::get;
use axum::Router;

use crate::handlers::technos;
use crate::state::AppState;

/// Routes mounted at `/technos`.
///
/// ```text
/// GET    /    -> list_technos    (ROLE_USER)
/// POST   /    -> create_techno   (ROLE_EDIT_FLOWS)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(technos::list_technos).post(technos::create_techno))
}
