//! Flow pipeline rules.
//!
//! A flow connects a source app to a destination app through an ordered
//! chain of technologies. Positions are 0-based and contiguous when a chain
//! is written.

use crate::error::CoreError;
use crate::types::DbId;

/// Upper bound on the number of technologies in a single flow chain.
pub const MAX_CHAIN_LENGTH: usize = 64;

/// Reject a flow whose source and destination are the same app.
pub fn validate_endpoints(source_app_id: DbId, dest_app_id: DbId) -> Result<(), CoreError> {
    if source_app_id == dest_app_id {
        return Err(CoreError::BadRequest(format!(
            "source and destination app must differ, both are {source_app_id}"
        )));
    }
    Ok(())
}

/// Reject chains longer than [`MAX_CHAIN_LENGTH`].
pub fn validate_chain_length(len: usize) -> Result<(), CoreError> {
    if len > MAX_CHAIN_LENGTH {
        return Err(CoreError::Validation(format!(
            "a flow may hold at most {MAX_CHAIN_LENGTH} technologies, got {len}"
        )));
    }
    Ok(())
}

/// Pair each item with its position in the chain, preserving input order.
///
/// ```
/// use appflow_core::flow::assign_positions;
/// assert_eq!(assign_positions(vec!["kafka", "s3"]), vec![(0, "kafka"), (1, "s3")]);
/// ```
pub fn assign_positions<T>(items: Vec<T>) -> Vec<(i32, T)> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| (i as i32, item))
        .collect()
}

/// Check that positions form exactly `0..len` once sorted.
pub fn is_contiguous(positions: &[i32]) -> bool {
    let mut sorted = positions.to_vec();
    sorted.sort_unstable();
    sorted.iter().enumerate().all(|(i, p)| *p == i as i32)
}

/// Normalize a technology name into its reuse key.
///
/// Surrounding whitespace is dropped and inner whitespace runs collapse to
/// a single space; casing is preserved.
pub fn normalize_techno_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn distinct_endpoints_are_accepted() {
        assert!(validate_endpoints(1, 2).is_ok());
    }

    #[test]
    fn same_app_on_both_ends_is_rejected() {
        assert_matches!(validate_endpoints(7, 7), Err(CoreError::BadRequest(_)));
    }

    #[test]
    fn chain_length_limit() {
        assert!(validate_chain_length(0).is_ok());
        assert!(validate_chain_length(MAX_CHAIN_LENGTH).is_ok());
        assert_matches!(
            validate_chain_length(MAX_CHAIN_LENGTH + 1),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn positions_follow_input_order() {
        let chain = assign_positions(vec!["a", "b", "c"]);
        let positions: Vec<i32> = chain.iter().map(|(p, _)| *p).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert_eq!(chain[2].1, "c");
    }

    #[test]
    fn contiguity() {
        assert!(is_contiguous(&[]));
        assert!(is_contiguous(&[2, 0, 1]));
        assert!(!is_contiguous(&[0, 2]));
        assert!(!is_contiguous(&[1, 2]));
        assert!(!is_contiguous(&[0, 0, 1]));
    }

    #[test]
    fn techno_names_are_normalized() {
        assert_eq!(normalize_techno_name("  Apache   Kafka "), "Apache Kafka");
        assert_eq!(normalize_techno_name("SFTP"), "SFTP");
    }
}
