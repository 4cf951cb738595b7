//! Handlers for the `/apps` resource.

use appflow_core::error::CoreError;
use appflow_core::types::DbId;
use appflow_db::models::app::{CreateApp, UpdateApp};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireAppEditor, RequireUser};
use crate::query::SearchParams;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "App", id })
}

/// GET /api/v1/apps
pub async fn list_apps(
    _user: RequireUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let apps = state.apps.get_all().await?;
    Ok(Json(apps))
}

/// GET /api/v1/apps/search?query=
///
/// Served by the search index, not the database.
pub async fn search_apps(
    _user: RequireUser,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<impl IntoResponse> {
    let hits = state.apps.find(&params.query).await?;
    Ok(Json(hits))
}

/// GET /api/v1/apps/{id}
pub async fn get_app(
    _user: RequireUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let app = state.apps.get_one_by_id(id).await?.ok_or_else(|| not_found(id))?;
    Ok(Json(app))
}

/// POST /api/v1/apps
pub async fn create_app(
    RequireAppEditor(editor): RequireAppEditor,
    State(state): State<AppState>,
    Json(input): Json<CreateApp>,
) -> AppResult<impl IntoResponse> {
    let app = state.apps.save_new_app(input).await?;
    tracing::debug!(app_id = app.id, user_id = editor.user_id, "create_app");
    Ok((StatusCode::CREATED, Json(app)))
}

/// PUT /api/v1/apps/{id}
pub async fn update_app(
    _editor: RequireAppEditor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateApp>,
) -> AppResult<impl IntoResponse> {
    let app = state.apps.update(id, input).await?.ok_or_else(|| not_found(id))?;
    Ok(Json(app))
}

/// DELETE /api/v1/apps/{id}
///
/// 409 while any flow references the app.
pub async fn delete_app(
    RequireAppEditor(editor): RequireAppEditor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if !state.apps.delete(id).await? {
        return Err(not_found(id));
    }
    tracing::debug!(app_id = id, user_id = editor.user_id, "delete_app");
    Ok(StatusCode::NO_CONTENT)
}
