//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose roles do not
//! satisfy the requirement, so a handler's signature states the role its
//! route needs. `ROLE_ADMIN` satisfies every requirement.

use appflow_core::error::CoreError;
use appflow_core::roles::{ROLE_ADMIN, ROLE_EDIT_APPS, ROLE_EDIT_FLOWS, ROLE_USER};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticate the request and require `role`.
///
/// 401 when the request is not authenticated, 403 when the role is missing.
pub async fn require_role(
    parts: &mut Parts,
    state: &AppState,
    role: &str,
) -> Result<AuthUser, AppError> {
    let user = AuthUser::from_request_parts(parts, state).await?;
    if !user.has_role(role) {
        tracing::debug!(user_id = user.user_id, required = role, "Role check failed");
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "{role} required"
        ))));
    }
    Ok(user)
}

/// Requires `ROLE_USER` (read access).
///
/// ```ignore
/// async fn list(RequireUser(user): RequireUser) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireUser(pub AuthUser);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, ROLE_USER).await.map(RequireUser)
    }
}

/// Requires `ROLE_EDIT_APPS`.
pub struct RequireAppEditor(pub AuthUser);

impl FromRequestParts<AppState> for RequireAppEditor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, ROLE_EDIT_APPS)
            .await
            .map(RequireAppEditor)
    }
}

/// Requires `ROLE_EDIT_FLOWS`. Also gates technology creation.
pub struct RequireFlowEditor(pub AuthUser);

impl FromRequestParts<AppState> for RequireFlowEditor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, ROLE_EDIT_FLOWS)
            .await
            .map(RequireFlowEditor)
    }
}

/// Requires `ROLE_ADMIN`.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require_role(parts, state, ROLE_ADMIN).await.map(RequireAdmin)
    }
}
