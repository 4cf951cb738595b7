//! Search index naming and object-id helpers.
//!
//! Each searchable entity type has its own index on the hosted provider.
//! Object ids are the stringified database id of the mirrored row.

use crate::types::DbId;

/// Index holding one record per app.
pub const INDEX_APPS: &str = "apps";

/// Index holding one record per flow.
pub const INDEX_FLOWS: &str = "flows";

/// Every index the server writes to. Used by reindex and the reconciler.
pub const SEARCH_INDEXES: &[&str] = &[INDEX_APPS, INDEX_FLOWS];

/// Check whether an index name is one the server manages.
pub fn is_known_index(name: &str) -> bool {
    SEARCH_INDEXES.contains(&name)
}

/// Build the object id under which a row is mirrored.
pub fn object_id(id: DbId) -> String {
    id.to_string()
}

/// Parse a hit's object id back into a row id.
///
/// Returns `None` for ids that were not written by this server (the index
/// is shared infrastructure and may contain foreign objects).
pub fn parse_object_id(object_id: &str) -> Option<DbId> {
    object_id.trim().parse::<DbId>().ok().filter(|id| *id > 0)
}

/// Prefix an index name with the deployment namespace, if any.
///
/// ```
/// use appflow_core::search::prefixed_index_name;
/// assert_eq!(prefixed_index_name("", "apps"), "apps");
/// assert_eq!(prefixed_index_name("staging", "apps"), "staging_apps");
/// ```
pub fn prefixed_index_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}_{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_id_round_trips() {
        assert_eq!(parse_object_id(&object_id(42)), Some(42));
    }

    #[test]
    fn foreign_object_ids_are_rejected() {
        assert_eq!(parse_object_id("abc"), None);
        assert_eq!(parse_object_id(""), None);
        assert_eq!(parse_object_id("0"), None);
        assert_eq!(parse_object_id("-3"), None);
    }

    #[test]
    fn known_indexes() {
        assert!(is_known_index(INDEX_APPS));
        assert!(is_known_index(INDEX_FLOWS));
        assert!(!is_known_index("users"));
    }
}
