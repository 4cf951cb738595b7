//! Admin-only handlers: user provisioning and search index maintenance.

use std::collections::BTreeMap;

use appflow_core::error::CoreError;
use appflow_core::search::is_known_index;
use appflow_core::types::DbId;
use appflow_core::validation::validate_input;
use appflow_db::models::user::CreateUser;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::jwt::issue_service_token;
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::state::AppState;

/// Largest batch replayed by one manual reconcile call.
const MAX_RECONCILE_BATCH: i64 = 500;

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// GET /api/v1/admin/users
pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let users = state.repos.users.list_with_roles().await?;
    Ok(Json(users))
}

/// POST /api/v1/admin/users
///
/// Every requested role must exist.
pub async fn create_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateUser>,
) -> AppResult<impl IntoResponse> {
    validate_input(&input)?;

    let known = state.repos.users.list_roles().await?;
    if let Some(unknown) = input
        .roles
        .iter()
        .find(|r| !known.iter().any(|k| &k.name == *r))
    {
        return Err(AppError::BadRequest(format!("Unknown role: {unknown}")));
    }

    let user = state.repos.users.create(&input).await?;
    tracing::info!(
        user_id = user.user.id,
        username = %user.user.username,
        admin_id = admin.user_id,
        "User provisioned"
    );
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveRequest {
    pub is_active: bool,
}

/// PUT /api/v1/admin/users/{id}/active
///
/// Deactivated users are rejected with 401 on their next request.
pub async fn set_user_active(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
    Json(input): Json<SetActiveRequest>,
) -> AppResult<impl IntoResponse> {
    if user_id == admin.user_id && !input.is_active {
        return Err(AppError::BadRequest("Cannot deactivate yourself".into()));
    }
    if !state.repos.users.set_active(user_id, input.is_active).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: user_id,
        }));
    }
    tracing::info!(
        user_id,
        is_active = input.is_active,
        admin_id = admin.user_id,
        "User activation changed"
    );
    Ok(StatusCode::NO_CONTENT)
}

/// Response body for `POST /admin/users/{id}/token`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
}

/// POST /api/v1/admin/users/{id}/token
///
/// Mint an access token for a service account.
pub async fn issue_token(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let user = state
        .repos
        .users
        .find_with_roles(user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: user_id,
        }))?;
    if !user.user.is_active {
        return Err(AppError::BadRequest(format!("User {user_id} is inactive")));
    }

    let access_token = issue_service_token(user_id, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation failed: {e}")))?;

    tracing::info!(user_id, admin_id = admin.user_id, "Access token issued");
    Ok(Json(TokenResponse {
        access_token,
        expires_in: state.config.jwt.service_token_ttl_secs(),
    }))
}

// ---------------------------------------------------------------------------
// Search maintenance
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ReindexParams {
    /// Restrict the rebuild to one index.
    pub index: Option<String>,
}

/// POST /api/v1/admin/search/reindex[?index=apps]
///
/// Rebuild the search indexes from the database. Returns object counts
/// keyed by index name.
pub async fn reindex(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ReindexParams>,
) -> AppResult<impl IntoResponse> {
    let report: BTreeMap<String, usize> = match params.index.as_deref() {
        Some(name) if !is_known_index(name) => {
            return Err(AppError::BadRequest(format!("Unknown search index: {name}")));
        }
        Some(name) => {
            let count = state.search_sync.reindex(name).await?;
            [(name.to_string(), count)].into_iter().collect()
        }
        None => state.search_sync.reindex_all().await?,
    };

    tracing::info!(admin_id = admin.user_id, ?report, "Reindex requested");
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct ReconcileParams {
    pub limit: Option<i64>,
}

/// POST /api/v1/admin/search/reconcile[?limit=]
///
/// Replay pending search outbox entries now instead of waiting for the
/// background reconciler.
pub async fn reconcile(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ReconcileParams>,
) -> AppResult<impl IntoResponse> {
    let limit = params.limit.unwrap_or(100).clamp(1, MAX_RECONCILE_BATCH);
    let report = state.search_sync.reconcile_pending(limit).await?;
    let pending = state.repos.outbox.count().await?;
    Ok(Json(serde_json::json!({
        "replayed": report.replayed,
        "failed": report.failed,
        "pending": pending,
    })))
}
