//! Query routing: choose a processing policy per request.
//!
//! An explicit task label always wins. Without one, the query text is
//! classified by keyword classes checked in a fixed priority order:
//! ordering, then temporal, then fact. Everything else is deep analysis.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::MnemosError;

static FACT_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(what\s+(is|was|were|did)|who\s+(is|was|did)|which|how\s+many|how\s+much|name\s+of|是什么|叫什么|谁是|哪个|几个|多少|specific(ally)?|exactly|brand|model|color|name)",
    )
    .expect("static fact pattern")
});

static TEMPORAL_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(how\s+long|duration|how\s+many\s+(minutes|hours|days|years)|before\s+or\s+after|earlier|later|between|多长时间|多久|之前还是之后|先后|时长)",
    )
    .expect("static temporal pattern")
});

static ORDERING_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(order|sequence|first.*then|chronolog|list.*events|arrange|排列|顺序|先后|时间线|事件排序)")
        .expect("static ordering pattern")
});

/// Routing categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
    FactExtraction,
    TemporalOrdering,
    AdversarialAbstention,
    TemporalReasoning,
    MnesticTrigger,
    DeepAnalysis,
}

impl QueryCategory {
    pub const ALL: [QueryCategory; 6] = [
        QueryCategory::FactExtraction,
        QueryCategory::TemporalOrdering,
        QueryCategory::AdversarialAbstention,
        QueryCategory::TemporalReasoning,
        QueryCategory::MnesticTrigger,
        QueryCategory::DeepAnalysis,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QueryCategory::FactExtraction => "fact_extraction",
            QueryCategory::TemporalOrdering => "temporal_ordering",
            QueryCategory::AdversarialAbstention => "adversarial_abstention",
            QueryCategory::TemporalReasoning => "temporal_reasoning",
            QueryCategory::MnesticTrigger => "mnestic_trigger",
            QueryCategory::DeepAnalysis => "deep_analysis",
        }
    }

    /// Map an external task-type label to a category.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Information Extraction" => Some(QueryCategory::FactExtraction),
            "Logical Event Ordering" => Some(QueryCategory::TemporalOrdering),
            "Adversarial Abstention" => Some(QueryCategory::AdversarialAbstention),
            "Temporal Reasoning" => Some(QueryCategory::TemporalReasoning),
            "Mnestic Trigger Analysis" => Some(QueryCategory::MnesticTrigger),
            "Mind-Body Interaction" | "Expert-Annotated Psychoanalysis" => {
                Some(QueryCategory::DeepAnalysis)
            }
            _ => None,
        }
    }
}

impl fmt::Display for QueryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryCategory {
    type Err = MnemosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        QueryCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| MnemosError::Validation(format!("Unknown query category '{}'", s)))
    }
}

/// Which stages to skip, which evidence shape and which prompt variant to use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub category: QueryCategory,
    pub skip_extraction: bool,
    pub skip_inference: bool,
    pub use_raw_source: bool,
    pub sort_by_timeline: bool,
    pub enable_self_consistency: bool,
    pub prompt_key: String,
}

/// The fixed decision for a category.
pub fn decision_for(category: QueryCategory) -> RoutingDecision {
    let raw = category != QueryCategory::DeepAnalysis;
    RoutingDecision {
        category,
        skip_extraction: raw,
        skip_inference: raw,
        use_raw_source: raw,
        sort_by_timeline: category == QueryCategory::TemporalOrdering,
        enable_self_consistency: category == QueryCategory::AdversarialAbstention,
        prompt_key: category.as_str().to_string(),
    }
}

/// Route by explicit label. Unknown labels default to deep analysis.
pub fn route_by_label(label: &str) -> RoutingDecision {
    decision_for(QueryCategory::from_label(label).unwrap_or(QueryCategory::DeepAnalysis))
}

/// Route by label if one is given and recognized, else by query keywords.
pub fn route_by_query(query: &str, label: Option<&str>) -> RoutingDecision {
    if let Some(category) = label.and_then(QueryCategory::from_label) {
        return decision_for(category);
    }
    decision_for(classify_query(query))
}

/// Keyword classification, first match wins.
pub fn classify_query(query: &str) -> QueryCategory {
    if ORDERING_KEYWORDS.is_match(query) {
        QueryCategory::TemporalOrdering
    } else if TEMPORAL_KEYWORDS.is_match(query) {
        QueryCategory::TemporalReasoning
    } else if FACT_KEYWORDS.is_match(query) {
        QueryCategory::FactExtraction
    } else {
        QueryCategory::DeepAnalysis
    }
}
