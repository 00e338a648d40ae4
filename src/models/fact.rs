//! Structured facts produced by the extraction worker.
//!
//! A [`Fact`] is an (entity, attribute, value) triple with a confidence score
//! and situational context tags. Caches and the long-term store only keep the
//! reduced [`FactRecord`] form (no confidence).

use serde::{Deserialize, Serialize};

/// Default confidence when a worker omits one.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// A single extracted fact. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub entity: String,
    pub attribute: String,
    pub value: String,
    /// Situational tags, e.g. `#health`, `#family-trip`. Ordered, no duplicates.
    #[serde(default)]
    pub context_tags: Vec<String>,
    /// Confidence in `[0, 1]`.
    #[serde(default = "default_confidence", alias = "confidence_score")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

impl Fact {
    pub fn new(
        entity: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            entity: entity.into(),
            attribute: attribute.into(),
            value: value.into(),
            context_tags: Vec::new(),
            confidence: DEFAULT_CONFIDENCE,
        }
    }

    /// Set confidence, clamped to `[0, 1]`.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = clamp_confidence(confidence);
        self
    }

    /// Append tags, skipping blanks and tags already present.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            let tag: String = tag.into();
            let tag = tag.trim();
            if !tag.is_empty() && !self.context_tags.iter().any(|t| t == tag) {
                self.context_tags.push(tag.to_string());
            }
        }
        self
    }

    /// Reduced form kept in caches and sent to the long-term store.
    pub fn to_record(&self) -> FactRecord {
        FactRecord {
            entity: self.entity.clone(),
            attribute: self.attribute.clone(),
            value: self.value.clone(),
            context_tags: self.context_tags.clone(),
        }
    }
}

/// Clamp a confidence into `[0, 1]`; NaN becomes the default.
pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        DEFAULT_CONFIDENCE
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Reduced fact record: what the per-subject caches and the long-term store hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FactRecord {
    #[serde(default)]
    pub entity: String,
    #[serde(default)]
    pub attribute: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub context_tags: Vec<String>,
}

impl FactRecord {
    pub fn new(
        entity: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            entity: entity.into(),
            attribute: attribute.into(),
            value: value.into(),
            context_tags: Vec::new(),
        }
    }

    /// One-line rendering used in worker prompts and store payloads.
    pub fn summary(&self) -> String {
        let mut line = format!("{} {} {}", self.entity, self.attribute, self.value);
        if !self.context_tags.is_empty() {
            line.push_str(&format!(" [{}]", self.context_tags.join(", ")));
        }
        line
    }
}

impl From<&Fact> for FactRecord {
    fn from(fact: &Fact) -> Self {
        fact.to_record()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_tags_dedupes_and_skips_blank() {
        let fact = Fact::new("Ann", "goal", "run a marathon").with_tags([
            "#health",
            " ",
            "#health",
            " #sport ",
        ]);
        assert_eq!(fact.context_tags, vec!["#health", "#sport"]);
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(Fact::new("a", "b", "c").with_confidence(1.7).confidence, 1.0);
        assert_eq!(Fact::new("a", "b", "c").with_confidence(-0.2).confidence, 0.0);
        assert_eq!(
            Fact::new("a", "b", "c").with_confidence(f64::NAN).confidence,
            DEFAULT_CONFIDENCE
        );
    }

    #[test]
    fn test_confidence_score_alias_deserializes() {
        let fact: Fact = serde_json::from_str(
            r#"{"entity":"Ann","attribute":"likes","value":"tea","confidence_score":0.9}"#,
        )
        .unwrap();
        assert_eq!(fact.confidence, 0.9);
        assert!(fact.context_tags.is_empty());
    }

    #[test]
    fn test_record_summary() {
        let record = Fact::new("Ann", "plan", "visit Oslo")
            .with_tags(["#travel"])
            .to_record();
        assert_eq!(record.summary(), "Ann plan visit Oslo [#travel]");
    }
}
