//! Knowledge graph records and the update events emitted per turn.

use serde::{Deserialize, Serialize};

use crate::models::insight::Insight;

/// A node scoped to one subject. Identity is the normalized entity string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub subject_id: String,
    #[serde(default)]
    pub insights: Vec<Insight>,
}

/// A directed, typed, weighted edge scoped to one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "relation_type")]
    pub relation: String,
    pub subject_id: String,
    /// Always >= 1 and only ever increases.
    pub weight: u64,
}

/// One change applied to the graph during an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GraphUpdate {
    AddNode {
        id: String,
        subject_id: String,
    },
    /// Fact edge created or reinforced; `weight` is the weight after the update.
    AddEdge {
        source: String,
        target: String,
        relation_type: String,
        subject_id: String,
        weight: u64,
    },
    /// Symmetric co-occurrence reinforcement of one unordered pair.
    IncrementWeight {
        relation_type: String,
        pair: (String, String),
        subject_id: String,
    },
    AttachInsights {
        subject_id: String,
        nodes: Vec<String>,
        count: usize,
    },
}
