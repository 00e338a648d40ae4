//! Psychological inference: core values and behavioral motivations
//! inferred from a subject's long-term facts.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreValue {
    pub value: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motivation {
    pub motivation: String,
    #[serde(default)]
    pub supporting_summary: String,
    pub confidence: f64,
}

/// Inference record handed to the dialogue worker as tone context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileInference {
    #[serde(default)]
    pub core_values: Vec<CoreValue>,
    #[serde(default)]
    pub behavioral_motivations: Vec<Motivation>,
}

impl ProfileInference {
    pub fn is_empty(&self) -> bool {
        self.core_values.is_empty() && self.behavioral_motivations.is_empty()
    }

    /// Short textual rendering for prompt injection.
    pub fn describe(&self) -> String {
        let mut lines = Vec::new();
        if !self.core_values.is_empty() {
            let values: Vec<String> = self
                .core_values
                .iter()
                .map(|v| format!("{} ({:.1})", v.value, v.confidence))
                .collect();
            lines.push(format!("Core values: {}", values.join("; ")));
        }
        for m in &self.behavioral_motivations {
            if m.supporting_summary.is_empty() {
                lines.push(format!("Motivation: {}", m.motivation));
            } else {
                lines.push(format!(
                    "Motivation: {} ({})",
                    m.motivation, m.supporting_summary
                ));
            }
        }
        lines.join("\n")
    }
}
