//! Evidence selection: turn a free-text query into the subset of records
//! worth handing to a worker.
//!
//! [`select_relevant`] runs a strict cascade and stops at the first stage
//! that yields anything:
//!
//! 1. explicit record ids resolvable against the index,
//! 2. records inside the date window of tokens found in the query,
//! 3. records matching at least `min_keyword_hits` query keywords,
//! 4. a bounded prefix of all records.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::EvidenceRecord;
use crate::services::timeline::{extract_date_tokens, parse_timestamp, within_period, DateToken};

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "was", "were", "are", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "shall", "can",
    "need", "dare", "ought", "to", "of", "in", "for", "on", "with", "at", "by", "from", "as",
    "into", "through", "during", "before", "after", "above", "below", "between", "out", "off",
    "over", "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "each", "every", "both", "few", "more", "most", "other", "some", "such", "no",
    "not", "only", "own", "same", "so", "than", "too", "very", "just", "because", "but", "and",
    "or", "if", "while", "about", "up", "down", "that", "this", "these", "those", "what",
    "which", "who", "whom", "it", "its", "he", "she", "they", "them", "his", "her", "their",
    "my", "your", "our", "i", "me", "we", "you", "him", "based", "rank", "events", "event",
    "list", "three", "following", "describe", "specific", "scene", "scenes", "sorted",
    "highest", "lowest", "least", "level", "degree", "stages", "key", "leading", "gradual",
    "escalation", "narrator", "text", "source",
];

/// Tuning for [`select_relevant`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionOptions {
    /// Days on either side of an exact date token.
    pub margin_days: u32,
    /// Cap for the date and keyword stages.
    pub max_records: usize,
    /// Prefix length for the fallback stage.
    pub fallback_max: usize,
    pub min_keyword_hits: usize,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            margin_days: 3,
            max_records: 800,
            fallback_max: 800,
            min_keyword_hits: 2,
        }
    }
}

/// Which cascade stage produced a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    ExplicitIds,
    DateWindow,
    Keywords,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub strategy: SelectionStrategy,
    pub records: Vec<EvidenceRecord>,
}

/// Index records by id. Later duplicates win.
pub fn build_id_index(records: &[EvidenceRecord]) -> HashMap<i64, EvidenceRecord> {
    records.iter().map(|r| (r.id, r.clone())).collect()
}

/// Lower-cased alphabetic words of 3+ letters, stop words removed, deduplicated.
pub fn extract_keywords(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    let mut keywords: Vec<String> = Vec::new();
    for word in lowered
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| w.len() >= 3)
    {
        if !STOP_WORDS.contains(&word) && !keywords.iter().any(|k| k == word) {
            keywords.push(word.to_string());
        }
    }
    keywords
}

/// Records whose timestamp falls in any token's window, in input order.
///
/// Exact days match within `margin_days` of the day's midnight. Month and year
/// tokens match by timestamp prefix or by the parsed calendar period.
pub fn filter_by_dates(
    records: &[EvidenceRecord],
    tokens: &[String],
    options: &SelectionOptions,
) -> Vec<EvidenceRecord> {
    let margin = Duration::days(i64::from(options.margin_days));
    let mut windows: Vec<(NaiveDateTime, NaiveDateTime)> = Vec::new();
    let mut periods: Vec<(String, DateToken)> = Vec::new();

    for raw in tokens {
        match DateToken::parse(raw) {
            Some(DateToken::Day(date)) => {
                let center = date.and_time(NaiveTime::MIN);
                let start = center.checked_sub_signed(margin).unwrap_or(NaiveDateTime::MIN);
                let end = center.checked_add_signed(margin).unwrap_or(NaiveDateTime::MAX);
                windows.push((start, end));
            }
            Some(token) => periods.push((raw.clone(), token)),
            None => {}
        }
    }
    if windows.is_empty() && periods.is_empty() {
        return Vec::new();
    }

    let mut selected = Vec::new();
    let mut seen: HashSet<i64> = HashSet::new();
    for record in records {
        let ts = record.timestamp.trim();
        if ts.is_empty() || seen.contains(&record.id) {
            continue;
        }
        let instant = parse_timestamp(ts);
        let in_period = periods.iter().any(|(prefix, token)| {
            ts.starts_with(prefix.as_str())
                || instant.as_ref().is_some_and(|i| within_period(i, token))
        });
        let in_window = || {
            instant
                .as_ref()
                .is_some_and(|i| windows.iter().any(|(start, end)| start <= i && i <= end))
        };
        if in_period || in_window() {
            seen.insert(record.id);
            selected.push(record.clone());
            if selected.len() >= options.max_records {
                break;
            }
        }
    }
    selected
}

/// Records whose text contains at least `min_keyword_hits` of `keywords`.
pub fn filter_by_keywords(
    records: &[EvidenceRecord],
    keywords: &[String],
    options: &SelectionOptions,
) -> Vec<EvidenceRecord> {
    if keywords.is_empty() {
        return Vec::new();
    }
    let mut selected = Vec::new();
    let mut seen: HashSet<i64> = HashSet::new();
    for record in records {
        if seen.contains(&record.id) {
            continue;
        }
        let text = record.searchable_text();
        let hits = keywords.iter().filter(|k| text.contains(k.as_str())).count();
        if hits >= options.min_keyword_hits {
            seen.insert(record.id);
            selected.push(record.clone());
            if selected.len() >= options.max_records {
                break;
            }
        }
    }
    selected
}

/// Run the selection cascade. See the module docs for the stage order.
pub fn select_relevant(
    query: &str,
    records: &[EvidenceRecord],
    explicit_ids: &[i64],
    id_index: &HashMap<i64, EvidenceRecord>,
    options: &SelectionOptions,
) -> Selection {
    let by_id: Vec<EvidenceRecord> = explicit_ids
        .iter()
        .filter_map(|id| id_index.get(id).cloned())
        .collect();
    if !by_id.is_empty() {
        return Selection {
            strategy: SelectionStrategy::ExplicitIds,
            records: by_id,
        };
    }

    let tokens = extract_date_tokens(query);
    if !tokens.is_empty() {
        let dated = filter_by_dates(records, &tokens, options);
        debug!(tokens = ?tokens, count = dated.len(), "Date window selection");
        if !dated.is_empty() {
            return Selection {
                strategy: SelectionStrategy::DateWindow,
                records: dated,
            };
        }
    }

    let keywords = extract_keywords(query);
    if !keywords.is_empty() {
        let matched = filter_by_keywords(records, &keywords, options);
        debug!(keywords = ?keywords, count = matched.len(), "Keyword selection");
        if !matched.is_empty() {
            return Selection {
                strategy: SelectionStrategy::Keywords,
                records: matched,
            };
        }
    }

    Selection {
        strategy: SelectionStrategy::Fallback,
        records: records.iter().take(options.fallback_max).cloned().collect(),
    }
}

fn clip(text: &str, max_chars: Option<usize>) -> String {
    match max_chars.and_then(|max| text.char_indices().nth(max)) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

/// Full-text rendering for raw-source routing: one block per record,
/// blocks separated by `---`. Records without any text are skipped.
pub fn render_raw_source(
    records: &[EvidenceRecord],
    max_records: usize,
    max_chars_per_field: Option<usize>,
) -> String {
    let blocks: Vec<String> = records
        .iter()
        .take(max_records)
        .filter_map(|record| {
            let fields: Vec<String> = record
                .fields()
                .map(|(name, value)| format!("  {}: {}", name, clip(value, max_chars_per_field)))
                .collect();
            if fields.is_empty() {
                return None;
            }
            let ts = record.timestamp.trim();
            let body = fields.join("\n");
            Some(if ts.is_empty() {
                body
            } else {
                format!("[{}]\n{}", ts, body)
            })
        })
        .collect();
    blocks.join("\n\n---\n\n")
}
