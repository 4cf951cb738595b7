//! JWT-based authentication extractor for Axum handlers.

use appflow_core::error::CoreError;
use appflow_core::roles::has_role;
use appflow_core::types::DbId;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::jwt::verify_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from a JWT Bearer token in the
/// `Authorization` header.
///
/// The token only identifies the user; the account and its roles are loaded
/// from the database, so a deactivated user or a revoked role is rejected on
/// the next request.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's internal database id (from `claims.sub`).
    pub user_id: DbId,
    pub username: String,
    /// Granted role names, e.g. `ROLE_USER`.
    pub roles: Vec<String>,
}

impl AuthUser {
    /// Whether the user satisfies `role` (`ROLE_ADMIN` satisfies all).
    pub fn has_role(&self, role: &str) -> bool {
        has_role(&self.roles, role)
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = verify_token(token, &state.config.jwt).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        let user = state
            .repos
            .users
            .find_with_roles(claims.sub)
            .await?
            .filter(|u| u.user.is_active)
            .ok_or_else(|| {
                tracing::debug!(user_id = claims.sub, "Token subject is unknown or inactive");
                AppError::Core(CoreError::Unauthorized("Unknown or inactive user".into()))
            })?;

        Ok(AuthUser {
            user_id: user.user.id,
            username: user.user.username,
            roles: user.roles,
        })
    }
}
