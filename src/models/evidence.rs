//! Timestamped evidence records considered for relevance filtering.

use serde::{Deserialize, Serialize};

/// Text fields of a record, in rendering order.
pub const EVIDENCE_FIELDS: [&str; 6] = [
    "location",
    "action",
    "dialogue",
    "environment",
    "background",
    "inner_thought",
];

/// A unit of source text with a stable id and a free-form timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub id: i64,
    /// Free-form; parsed with `services::timeline::parse_timestamp`.
    #[serde(default, alias = "time")]
    pub timestamp: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub dialogue: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub inner_thought: Option<String>,
}

impl EvidenceRecord {
    pub fn new(id: i64, timestamp: impl Into<String>) -> Self {
        Self {
            id,
            timestamp: timestamp.into(),
            location: None,
            action: None,
            dialogue: None,
            environment: None,
            background: None,
            inner_thought: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_dialogue(mut self, dialogue: impl Into<String>) -> Self {
        self.dialogue = Some(dialogue.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_inner_thought(mut self, thought: impl Into<String>) -> Self {
        self.inner_thought = Some(thought.into());
        self
    }

    /// Field lookup by name, see [`EVIDENCE_FIELDS`].
    pub fn field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "location" => &self.location,
            "action" => &self.action,
            "dialogue" => &self.dialogue,
            "environment" => &self.environment,
            "background" => &self.background,
            "inner_thought" => &self.inner_thought,
            _ => return None,
        };
        value.as_deref()
    }

    /// Non-blank text fields, in rendering order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        EVIDENCE_FIELDS.iter().filter_map(move |name| {
            self.field(name)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (*name, v))
        })
    }

    /// All text fields concatenated and lower-cased, for keyword matching.
    pub fn searchable_text(&self) -> String {
        EVIDENCE_FIELDS
            .iter()
            .map(|name| self.field(name).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_alias_and_missing_fields() {
        let record: EvidenceRecord =
            serde_json::from_str(r#"{"id":7,"time":"1969-08-15","action":"Walked"}"#).unwrap();
        assert_eq!(record.timestamp, "1969-08-15");
        assert_eq!(record.action.as_deref(), Some("Walked"));
        assert!(record.dialogue.is_none());
    }

    #[test]
    fn test_fields_skip_blank_values() {
        let record = EvidenceRecord::new(1, "")
            .with_location("  ")
            .with_action("Walked home")
            .with_inner_thought("tired");
        let fields: Vec<_> = record.fields().collect();
        assert_eq!(
            fields,
            vec![("action", "Walked home"), ("inner_thought", "tired")]
        );
    }

    #[test]
    fn test_searchable_text_is_lowercase() {
        let record = EvidenceRecord::new(1, "")
            .with_action("Fed The Horses")
            .with_dialogue("Hello Dad");
        assert!(record.searchable_text().contains("fed the horses"));
        assert!(record.searchable_text().contains("hello dad"));
    }
}
