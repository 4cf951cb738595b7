//! Handlers for the `/flows` resource.
//!
//! Every response is a [`FlowDto`](appflow_db::models::flow::FlowDto): both
//! apps inlined and the chain flattened to technos in position order.

use appflow_core::error::CoreError;
use appflow_core::types::DbId;
use appflow_db::models::flow::{CreateFlow, UpdateFlow};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::{RequireFlowEditor, RequireUser};
use crate::query::SearchParams;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Flow", id })
}

/// GET /api/v1/flows
pub async fn list_flows(
    _user: RequireUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let flows = state.flows.get_all_with_dto().await?;
    Ok(Json(flows))
}

/// GET /api/v1/flows/search?query=
pub async fn search_flows(
    _user: RequireUser,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<impl IntoResponse> {
    let hits = state.flows.find(&params.query).await?;
    Ok(Json(hits))
}

/// GET /api/v1/flows/{id}
pub async fn get_flow(
    _user: RequireUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let flow = state
        .flows
        .get_one_with_dto(id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(flow))
}

/// POST /api/v1/flows
///
/// 400 when either app does not exist or both ends are the same app.
pub async fn create_flow(
    RequireFlowEditor(editor): RequireFlowEditor,
    State(state): State<AppState>,
    Json(input): Json<CreateFlow>,
) -> AppResult<impl IntoResponse> {
    let flow = state.flows.save_new_flow(input).await?;
    tracing::debug!(flow_id = flow.id, user_id = editor.user_id, "create_flow");
    Ok((StatusCode::CREATED, Json(flow)))
}

/// PUT /api/v1/flows/{id}
pub async fn update_flow(
    _editor: RequireFlowEditor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateFlow>,
) -> AppResult<impl IntoResponse> {
    let flow = state
        .flows
        .update(id, input)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(flow))
}

/// DELETE /api/v1/flows/{id}
pub async fn delete_flow(
    RequireFlowEditor(editor): RequireFlowEditor,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if !state.flows.delete(id).await? {
        return Err(not_found(id));
    }
    tracing::debug!(flow_id = id, user_id = editor.user_id, "delete_flow");
    Ok(StatusCode::NO_CONTENT)
}
