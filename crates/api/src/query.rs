//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Free-text search parameters (`?query=`). A missing query matches
/// everything.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
}
