//! Collaborator contracts for the language-model-backed workers.
//!
//! The coordinator only sees these traits. Each role is optional: a missing
//! worker is handled exactly like a failed stage.

pub mod memory;
pub mod parse;
pub mod retry;
pub mod verifier;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::models::{Fact, FactRecord, Insight, ProfileInference};
use crate::MnemosError;

pub use memory::InMemoryLongTermStore;
pub use parse::{parse_facts, parse_inference, parse_insights};
pub use retry::{with_retry, RetryPolicy};
pub use verifier::{verify_and_maybe_abstain, Language, Verdict, Verifier};

/// Prompt variant used when the caller did not select one.
pub const DEFAULT_PROMPT_KEY: &str = "default";

/// Turns raw text into structured facts.
#[async_trait]
pub trait FactExtractor: Send + Sync {
    /// Transient upstream failures should come back as
    /// [`MnemosError::Upstream`] with `retryable: true`.
    async fn extract_facts(&self, text: &str, subject_id: &str)
        -> Result<Vec<Fact>, MnemosError>;
}

/// Derives higher-order insights from this turn's facts and the subject's
/// goal/plan history.
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    async fn generate_insights(
        &self,
        message: &str,
        subject_id: &str,
        facts: &[Fact],
        historical_facts: &[FactRecord],
    ) -> Result<Vec<Insight>, MnemosError>;
}

/// Infers core values and motivations from long-term facts.
#[async_trait]
pub trait ProfileInferrer: Send + Sync {
    async fn infer_profile(
        &self,
        subject_id: &str,
        long_term_facts: &[FactRecord],
        message: &str,
    ) -> Result<ProfileInference, MnemosError>;
}

/// Produces the user-facing reply.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate_reply(
        &self,
        message: &str,
        subject_id: &str,
        context: &DialogueContext,
    ) -> Result<String, MnemosError>;
}

/// Optional external long-term memory.
#[async_trait]
pub trait LongTermStore: Send + Sync {
    /// Whether credentials/endpoints are present. An unconfigured store is skipped.
    fn is_configured(&self) -> bool;

    async fn search(
        &self,
        subject_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<FactRecord>, MnemosError>;

    /// Returns the number of accepted records.
    async fn add_many(
        &self,
        facts: &[FactRecord],
        subject_id: &str,
        conversation_id: &str,
    ) -> Result<usize, MnemosError>;
}

/// Everything the dialogue worker gets besides the message itself.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DialogueContext {
    #[serde(default)]
    pub facts: Vec<Fact>,
    #[serde(default)]
    pub insights: Vec<Insight>,
    pub inference: Option<ProfileInference>,
    pub prompt_key: String,
    /// Caller-supplied context entries, passed through untouched.
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DialogueContext {
    /// Whether the reply should carry an empathetic note about a goal drift.
    pub fn has_behavioral_deviation(&self) -> bool {
        self.insights.iter().any(Insight::is_behavioral_deviation)
    }
}
