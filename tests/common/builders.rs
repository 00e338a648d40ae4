//! Test data builders for facts and evidence records.
//!
//! Provides fluent API for creating test inputs with sensible defaults.

use mnemos::models::{EvidenceRecord, Fact};

/// Builder for creating test facts.
pub struct FactBuilder {
    entity: String,
    attribute: String,
    value: String,
    tags: Vec<String>,
    confidence: f64,
}

impl FactBuilder {
    /// Create a new fact builder for `entity`.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            attribute: "likes".to_string(),
            value: String::new(),
            tags: Vec::new(),
            confidence: 0.5,
        }
    }

    /// Set the attribute and value.
    pub fn says(mut self, attribute: impl Into<String>, value: impl Into<String>) -> Self {
        self.attribute = attribute.into();
        self.value = value.into();
        self
    }

    /// Add a situational tag.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Build the Fact.
    pub fn build(self) -> Fact {
        Fact::new(self.entity, self.attribute, self.value)
            .with_tags(self.tags)
            .with_confidence(self.confidence)
    }
}

/// `count` distinct goal-like facts for one entity, values `goal-0..`.
pub fn goal_facts(entity: &str, start: usize, count: usize) -> Vec<Fact> {
    (start..start + count)
        .map(|i| {
            FactBuilder::new(entity)
                .says("计划", format!("goal-{}", i))
                .build()
        })
        .collect()
}

/// Builder for creating test evidence records.
pub struct EvidenceBuilder {
    record: EvidenceRecord,
}

impl EvidenceBuilder {
    pub fn new(id: i64, timestamp: impl Into<String>) -> Self {
        Self {
            record: EvidenceRecord::new(id, timestamp),
        }
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.record = self.record.with_action(action);
        self
    }

    pub fn dialogue(mut self, dialogue: impl Into<String>) -> Self {
        self.record = self.record.with_dialogue(dialogue);
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.record = self.record.with_location(location);
        self
    }

    pub fn build(self) -> EvidenceRecord {
        self.record
    }
}

/// A small diary spanning 1969-1976, ids 1..=6, deliberately out of order.
pub fn diary() -> Vec<EvidenceRecord> {
    vec![
        EvidenceBuilder::new(1, "1975-11-20 09:00:00")
            .action("Mother packed the suitcases for the move to the city")
            .location("The old farmhouse")
            .build(),
        EvidenceBuilder::new(2, "1969-08-15 14:00:30")
            .action("The family walked along the gravel road to the farm")
            .build(),
        EvidenceBuilder::new(3, "1969-08-17")
            .dialogue("Father said the harvest would be late this year")
            .build(),
        EvidenceBuilder::new(4, "1976-01-05 18:30")
            .action("First winter in the city apartment, the radiator hissing")
            .location("City apartment")
            .build(),
        EvidenceBuilder::new(5, "")
            .dialogue("An undated note about the harvest and the farm")
            .build(),
        EvidenceBuilder::new(6, "August 30, 1969")
            .action("School started again after the harvest")
            .build(),
    ]
}
