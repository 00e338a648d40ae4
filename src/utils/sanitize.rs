//! Input validation for subject ids and graph node identifiers.
//!
//! Subject ids are the isolation key for caches, graph partitions and the
//! long-term store, so a missing one is rejected before any work starts.

use crate::MnemosError;

/// Sentinel for an empty node identifier. Never materialized as a node.
pub const EMPTY_NODE: &str = "_empty";

/// Validate that `subject_id` is present.
///
/// Returns the trimmed id. Whitespace-only ids count as missing.
pub fn validate_subject_id(subject_id: &str) -> Result<&str, MnemosError> {
    let trimmed = subject_id.trim();
    if trimmed.is_empty() {
        return Err(MnemosError::Validation(
            "subject_id is required to keep memories of different subjects apart".to_string(),
        ));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(MnemosError::Validation(format!(
            "Invalid subject_id '{}': control characters are not allowed",
            trimmed.escape_debug()
        )));
    }
    Ok(trimmed)
}

/// Normalize a raw entity/value string into a node id.
///
/// Trims whitespace; empty input maps to [`EMPTY_NODE`].
pub fn normalize_node_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        EMPTY_NODE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Whether a normalized id may become a real node.
pub fn is_materializable(node_id: &str) -> bool {
    node_id != EMPTY_NODE
}
