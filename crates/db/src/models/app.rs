//! App entity model and DTOs.

use appflow_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `apps` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a new app.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateApp {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
}

/// DTO for updating an existing app. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateApp {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
}
