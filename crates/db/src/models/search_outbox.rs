//! Pending search-index writes.

use appflow_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// What the reconciler must do with an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchOperation {
    /// Re-read the row and write its record to the index.
    Upsert,
    /// Remove the object from the index.
    Delete,
}

impl SearchOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upsert => "upsert",
            Self::Delete => "delete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "upsert" => Some(Self::Upsert),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// A row from the `search_outbox` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutboxEntry {
    pub id: DbId,
    pub index_name: String,
    pub object_id: String,
    /// `upsert` or `delete`; see [`SearchOperation`].
    pub operation: String,
    /// Bumped on every re-enqueue of the same object.
    pub revision: i32,
    pub attempts: i32,
    pub last_error: Option<String>,
    /// Set while a reconciler holds the entry.
    pub claimed_until: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl SearchOutboxEntry {
    pub fn operation(&self) -> Option<SearchOperation> {
        SearchOperation::parse(&self.operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_names_round_trip() {
        for op in [SearchOperation::Upsert, SearchOperation::Delete] {
            assert_eq!(SearchOperation::parse(op.as_str()), Some(op));
        }
        assert_eq!(SearchOperation::parse("merge"), None);
    }
}
