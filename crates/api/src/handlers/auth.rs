//! Handlers for the `/auth` resource.
//!
//! Sign-in happens at the identity provider; this API only reports who the
//! bearer of a token is.

use appflow_core::types::DbId;
use axum::Json;
use serde::Serialize;

use crate::middleware::auth::AuthUser;

/// Response body for `GET /auth/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: DbId,
    pub username: String,
    pub roles: Vec<String>,
}

/// GET /api/v1/auth/me
pub async fn me(user: AuthUser) -> Json<MeResponse> {
    Json(MeResponse {
        id: user.user_id,
        username: user.username,
        roles: user.roles,
    })
}
