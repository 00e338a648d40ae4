//! Normalization of structured worker output into model types.
//!
//! Workers answer with loosely shaped JSON. These functions run it through
//! [`recover_json`], log the recovery outcome, and keep only well-formed
//! records. Malformed input never errors: it yields an empty result.

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::models::{
    clamp_confidence, CoreValue, Fact, Insight, Motivation, ProfileInference, DEFAULT_CONFIDENCE,
};
use crate::utils::recovery::{recover_json, Recovery};

/// Recover JSON from raw worker output, logging repairs and failures.
fn recover_logged(raw: &str, stage: &str) -> Option<Value> {
    match recover_json(raw) {
        Recovery::Clean(value) => Some(value),
        Recovery::Repaired(value) => {
            info!(stage, "Truncated worker output repaired, trailing records may be lost");
            Some(value)
        }
        Recovery::Empty => None,
        Recovery::Failed { error } => {
            let snippet: String = raw.chars().take(200).collect();
            warn!(stage, "Unparseable worker output: {} (snippet: {})", error, snippet);
            None
        }
    }
}

/// A list of objects, or a single object treated as a one-element list.
fn object_list(value: Value) -> Vec<Map<String, Value>> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        Value::Object(map) => vec![map],
        _ => Vec::new(),
    }
}

/// First non-blank string among `keys`, trimmed.
fn first_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match map.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Numeric confidence from the first present key; strings holding numbers count.
fn confidence_of(map: &Map<String, Value>, keys: &[&str]) -> f64 {
    let raw = keys.iter().find_map(|key| map.get(*key));
    let parsed = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    clamp_confidence(parsed.unwrap_or(DEFAULT_CONFIDENCE))
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Parse extraction output into facts.
///
/// `subject`/`predicate`/`object` are accepted as spellings of
/// `entity`/`attribute`/`value`. Records missing any of the three are dropped.
pub fn parse_facts(raw: &str) -> Vec<Fact> {
    let Some(value) = recover_logged(raw, "extraction") else {
        return Vec::new();
    };
    object_list(value)
        .iter()
        .filter_map(|map| {
            let entity = first_text(map, &["entity", "subject"])?;
            let attribute = first_text(map, &["attribute", "predicate"])?;
            let value = first_text(map, &["value", "object"])?;
            Some(
                Fact::new(entity, attribute, value)
                    .with_tags(string_list(map.get("context_tags")))
                    .with_confidence(confidence_of(map, &["confidence", "confidence_score"])),
            )
        })
        .collect()
}

/// Parse reflection output into insights. Blank records are dropped.
pub fn parse_insights(raw: &str) -> Vec<Insight> {
    let Some(value) = recover_logged(raw, "reflection") else {
        return Vec::new();
    };
    // Reflection prompts sometimes wrap the list as {"insights": [...]}.
    let value = match value {
        Value::Object(mut map) if map.get("insights").is_some_and(Value::is_array) => {
            map.remove("insights").unwrap_or(Value::Null)
        }
        other => other,
    };
    object_list(value)
        .iter()
        .filter_map(|map| {
            let text = first_text(map, &["insight", "text"])?;
            let mut insight = Insight::new(text).with_goals(string_list(map.get("related_goals")));
            if let Some(tag) = first_text(map, &["tag"]) {
                insight = insight.tagged(tag);
            }
            Some(insight)
        })
        .collect()
}

/// Parse inference output. Anything unusable becomes an empty inference.
pub fn parse_inference(raw: &str) -> ProfileInference {
    let Some(Value::Object(map)) = recover_logged(raw, "inference") else {
        return ProfileInference::default();
    };

    let core_values = match map.get("core_values") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(obj) => first_text(obj, &["value"]).map(|value| CoreValue {
                    value,
                    confidence: confidence_of(obj, &["confidence"]),
                }),
                Value::String(s) if !s.trim().is_empty() => Some(CoreValue {
                    value: s.trim().to_string(),
                    confidence: DEFAULT_CONFIDENCE,
                }),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    let behavioral_motivations = match map.get("behavioral_motivations") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|obj| {
                Some(Motivation {
                    motivation: first_text(obj, &["motivation"])?,
                    supporting_summary: first_text(obj, &["supporting_summary"])
                        .unwrap_or_default(),
                    confidence: confidence_of(obj, &["confidence"]),
                })
            })
            .collect(),
        _ => Vec::new(),
    };

    ProfileInference {
        core_values,
        behavioral_motivations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_facts_accepts_alternate_keys() {
        let raw = r##"```json
[
  {"entity":"Ann","attribute":"goal","value":"run a marathon","context_tags":["#health"," ",3],"confidence_score":0.9},
  {"subject":"Ann","predicate":"likes","object":"tea"},
  {"entity":"Ann","attribute":"","value":"dropped"}
]
```"##;
        let facts = parse_facts(raw);
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].confidence, 0.9);
        assert_eq!(facts[0].context_tags, vec!["#health"]);
        assert_eq!(facts[1].attribute, "likes");
        assert_eq!(facts[1].confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_parse_facts_clamps_and_reads_string_confidence() {
        let facts = parse_facts(
            r#"{"entity":"Bob","attribute":"age","value":"41","confidence":"1.4"}"#,
        );
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].confidence, 1.0);
    }

    #[test]
    fn test_parse_facts_from_truncated_output() {
        let raw = r#"[{"entity":"Ann","attribute":"plan","value":"Oslo"},{"entity":"Bo"#;
        let facts = parse_facts(raw);
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].value, "Oslo");
    }

    #[test]
    fn test_parse_facts_garbage_is_empty() {
        assert!(parse_facts("sorry, I cannot help").is_empty());
        assert!(parse_facts("").is_empty());
        assert!(parse_facts("42").is_empty());
    }

    #[test]
    fn test_parse_insights() {
        let raw = r#"{"insights":[
            {"insight":"skipping morning runs","tag":"behavioral_deviation","related_goals":["marathon"]},
            {"text":"values quiet evenings"},
            {"insight":"   "}
        ]}"#;
        let insights = parse_insights(raw);
        assert_eq!(insights.len(), 2);
        assert!(insights[0].is_behavioral_deviation());
        assert_eq!(insights[0].related_goals, vec!["marathon"]);
        assert_eq!(insights[1].tag, None);
    }

    #[test]
    fn test_parse_inference_mixed_shapes() {
        let raw = r#"{
            "core_values":[{"value":"family","confidence":0.9},"honesty",{"confidence":0.3}],
            "behavioral_motivations":[{"motivation":"seeks approval"},{"supporting_summary":"x"}]
        }"#;
        let inference = parse_inference(raw);
        assert_eq!(inference.core_values.len(), 2);
        assert_eq!(inference.core_values[1].value, "honesty");
        assert_eq!(inference.core_values[1].confidence, DEFAULT_CONFIDENCE);
        assert_eq!(inference.behavioral_motivations.len(), 1);
        assert_eq!(inference.behavioral_motivations[0].supporting_summary, "");
    }

    #[test]
    fn test_parse_inference_non_object_is_empty() {
        assert!(parse_inference("[1,2,3]").is_empty());
        assert!(parse_inference("not json").is_empty());
    }
}
