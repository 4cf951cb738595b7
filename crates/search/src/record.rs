use serde::{Deserialize, Serialize};

/// Denormalized projection of a row, as stored in the search index.
///
/// Hits returned by the provider carry extra fields (highlighting, ranking
/// info); they are ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRecord {
    #[serde(rename = "objectID")]
    pub object_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl SearchRecord {
    /// Case-insensitive match of every whitespace-separated query term
    /// against the name or description.
    pub fn matches(&self, query: &str) -> bool {
        let name = self.name.to_lowercase();
        let description = self
            .description
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_default();
        query
            .split_whitespace()
            .map(str::to_lowercase)
            .all(|term| name.contains(&term) || description.contains(&term))
    }
}
