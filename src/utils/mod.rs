pub mod recovery;
pub mod sanitize;

pub use recovery::{recover_json, repair_truncated_json, strip_code_fence, Recovery};
pub use sanitize::{normalize_node_id, validate_subject_id};
