//! Handlers for the `/technos` resource.

use appflow_db::models::techno::CreateTechno;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::middleware::rbac::{RequireFlowEditor, RequireUser};
use crate::state::AppState;

/// GET /api/v1/technos
pub async fn list_technos(
    _user: RequireUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let technos = state.technos.get_all().await?;
    Ok(Json(technos))
}

/// POST /api/v1/technos
///
/// Returns the existing row when a techno with the same name exists.
pub async fn create_techno(
    _editor: RequireFlowEditor,
    State(state): State<AppState>,
    Json(input): Json<CreateTechno>,
) -> AppResult<impl IntoResponse> {
    let techno = state.technos.save_new_techno(&input).await?;
    Ok((StatusCode::CREATED, Json(techno)))
}
