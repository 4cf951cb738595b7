//! User entity model and DTOs.
//!
//! Users authenticate through an external identity provider; this table only
//! records who they are and which roles they hold.

use appflow_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `users` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A user together with the names of the roles granted to it.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct UserWithRoles {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub user: User,
    /// Role names sorted alphabetically.
    pub roles: Vec<String>,
}

/// DTO for provisioning a user.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(length(min = 1, max = 100))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
}
