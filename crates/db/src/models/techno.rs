//! Technology (pipeline step) model and DTOs.

use appflow_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `technos` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Techno {
    pub id: DbId,
    /// Unique reuse key, stored normalized.
    pub name: String,
    /// Free-form descriptive metadata (e.g. a connector type).
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for the `create_or_get` operation.
///
/// Also used as the technology descriptor inside a flow payload.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTechno {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
}
