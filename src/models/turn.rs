//! Per-turn input and output of the coordinator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::models::fact::{Fact, FactRecord};
use crate::models::graph::GraphUpdate;
use crate::models::inference::ProfileInference;
use crate::models::insight::Insight;

/// One conversational message from one subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnInput {
    pub message: String,
    /// Isolation key. Required and non-empty.
    pub subject_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub context: Option<TurnContext>,
}

impl TurnInput {
    pub fn new(message: impl Into<String>, subject_id: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            subject_id: subject_id.into(),
            session_id: None,
            context: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_context(mut self, context: TurnContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Caller-supplied context for a turn.
///
/// `long_term_facts_override` replaces the long-term fact source for the
/// inference stage when non-empty (simulation and tests). Any other keys are
/// passed through untouched to the dialogue worker.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnContext {
    #[serde(default)]
    pub long_term_facts_override: Option<Vec<FactRecord>>,
    /// Routing-selected prompt variant for the dialogue worker.
    #[serde(default)]
    pub prompt_key: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TurnContext {
    pub fn with_long_term_facts(mut self, facts: Vec<FactRecord>) -> Self {
        self.long_term_facts_override = Some(facts);
        self
    }

    pub fn with_prompt_key(mut self, key: impl Into<String>) -> Self {
        self.prompt_key = Some(key.into());
        self
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Metadata stamped on every turn output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnMetadata {
    pub subject_id: String,
    pub timestamp: DateTime<Utc>,
    pub session_id: Option<String>,
}

/// Aggregated result of one turn.
///
/// Optional fields are `None` when their stage did not run or failed.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutput {
    pub reply: String,
    pub facts: Option<Vec<Fact>>,
    pub insights: Option<Vec<Insight>>,
    pub psychological_inference: Option<ProfileInference>,
    pub graph_updates: Option<Vec<GraphUpdate>>,
    pub metadata: TurnMetadata,
}

impl TurnOutput {
    /// Whether any insight of this turn flags a behavioral deviation.
    pub fn has_behavioral_deviation(&self) -> bool {
        self.insights
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(Insight::is_behavioral_deviation)
    }
}
