//! Higher-order observations produced by the reflection worker.

use serde::{Deserialize, Serialize};

/// Reserved tag marking an insight as a behavioral deviation signal
/// (recent behavior drifting away from a stated goal or plan).
pub const BEHAVIORAL_DEVIATION: &str = "behavioral_deviation";

/// Localized spelling of [`BEHAVIORAL_DEVIATION`] emitted by Chinese prompts.
const BEHAVIORAL_DEVIATION_ZH: &str = "潜在的行为偏离";

/// An insight attached to graph nodes. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(alias = "insight")]
    pub text: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub related_goals: Vec<String>,
}

impl Insight {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tag: None,
            related_goals: Vec::new(),
        }
    }

    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_goals<I, S>(mut self, goals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.related_goals.extend(goals.into_iter().map(Into::into));
        self
    }

    /// Whether this insight flags a behavioral deviation.
    pub fn is_behavioral_deviation(&self) -> bool {
        matches!(
            self.tag.as_deref(),
            Some(BEHAVIORAL_DEVIATION) | Some(BEHAVIORAL_DEVIATION_ZH)
        )
    }
}
