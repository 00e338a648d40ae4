pub mod evidence;
pub mod fact;
pub mod graph;
pub mod inference;
pub mod insight;
pub mod turn;

pub use evidence::{EvidenceRecord, EVIDENCE_FIELDS};
pub use fact::{clamp_confidence, Fact, FactRecord, DEFAULT_CONFIDENCE};
pub use graph::{GraphEdge, GraphNode, GraphUpdate};
pub use inference::{CoreValue, Motivation, ProfileInference};
pub use insight::{Insight, BEHAVIORAL_DEVIATION};
pub use turn::{TurnContext, TurnInput, TurnMetadata, TurnOutput};
