//! Bounded per-subject fact caches.
//!
//! The coordinator keeps two of these: one for goal/plan facts fed back to
//! the reflection stage, one for long-term facts fed to profile inference.
//! Each subject gets its own queue; when a queue exceeds the bound the oldest
//! entries are evicted first.

use std::collections::{HashMap, VecDeque};
use std::sync::{LazyLock, Mutex};

use regex::Regex;

use crate::models::FactRecord;

/// Attribute words that mark a fact as a goal or plan.
pub const GOAL_VOCABULARY: &[&str] = &[
    "目标", "计划", "希望", "打算", "想要", "约定", "goal", "plan", "hope", "intend", "want",
    "promise",
];

/// Query sent to the long-term store when gathering historical goals.
pub const GOAL_QUERY: &str = "目标 计划 想要 打算 希望 约定";

/// English vocabulary words as whole words, allowing an `s`, `d` or `ed` suffix.
static ENGLISH_GOAL_WORDS: LazyLock<Regex> = LazyLock::new(|| {
    let words: Vec<&str> = GOAL_VOCABULARY
        .iter()
        .copied()
        .filter(|w| w.is_ascii())
        .collect();
    Regex::new(&format!(
        r"(?i)(?:^|[^a-z])(?:{})(?:s|d|ed)?(?:[^a-z]|$)",
        words.join("|")
    ))
    .expect("static goal pattern")
});

/// Whether `attribute` names a goal, plan or commitment.
///
/// Chinese words match anywhere in the attribute. English words must stand
/// alone, so `travel_plan` counts and `explanation` does not.
pub fn is_goal_like(attribute: &str) -> bool {
    let attribute = attribute.trim();
    if attribute.is_empty() {
        return false;
    }
    GOAL_VOCABULARY
        .iter()
        .filter(|w| !w.is_ascii())
        .any(|word| attribute.contains(word))
        || ENGLISH_GOAL_WORDS.is_match(attribute)
}

/// Per-subject FIFO of fact records with a fixed upper bound.
#[derive(Debug)]
pub struct SubjectCache {
    bound: usize,
    entries: Mutex<HashMap<String, VecDeque<FactRecord>>>,
}

impl SubjectCache {
    pub fn new(bound: usize) -> Self {
        Self {
            bound,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Append records for `subject_id`, evicting the oldest past the bound.
    pub fn push_all<I>(&self, subject_id: &str, records: I)
    where
        I: IntoIterator<Item = FactRecord>,
    {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let queue = entries.entry(subject_id.to_string()).or_default();
        queue.extend(records);
        while queue.len() > self.bound {
            queue.pop_front();
        }
    }

    /// Copy of the subject's entries, oldest first.
    pub fn snapshot(&self, subject_id: &str) -> Vec<FactRecord> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .get(subject_id)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, subject_id: &str) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(subject_id).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self, subject_id: &str) -> bool {
        self.len(subject_id) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: &str) -> FactRecord {
        FactRecord::new("Ann", "计划", value)
    }

    #[test]
    fn test_goal_vocabulary() {
        assert!(is_goal_like("计划"));
        assert!(is_goal_like("旅行计划"));
        assert!(is_goal_like(" Goal "));
        assert!(is_goal_like("wants_to"));
        assert!(!is_goal_like("likes"));
        assert!(!is_goal_like("  "));
    }

    #[test]
    fn test_english_goal_words_need_word_boundaries() {
        assert!(is_goal_like("travel_plan"));
        assert!(is_goal_like("Plans"));
        assert!(is_goal_like("long-term goals"));
        assert!(is_goal_like("promised"));
        assert!(is_goal_like("intended"));

        for attribute in ["explanation", "airplane", "goalkeeper", "hopeful", "wanton"] {
            assert!(!is_goal_like(attribute), "{}", attribute);
        }
    }

    #[test]
    fn test_oldest_entries_are_evicted() {
        let cache = SubjectCache::new(3);
        cache.push_all("s1", ["a", "b"].map(record));
        cache.push_all("s1", ["c", "d"].map(record));

        let values: Vec<String> = cache.snapshot("s1").into_iter().map(|r| r.value).collect();
        assert_eq!(values, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_subjects_are_isolated() {
        let cache = SubjectCache::new(5);
        cache.push_all("s1", [record("a")]);
        assert_eq!(cache.len("s1"), 1);
        assert!(cache.is_empty("s2"));
        assert!(cache.snapshot("s2").is_empty());
    }

    #[test]
    fn test_zero_bound_keeps_nothing() {
        let cache = SubjectCache::new(0);
        cache.push_all("s1", [record("a")]);
        assert!(cache.is_empty("s1"));
    }

    mod prop_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_cache_never_exceeds_bound(
                bound in 0usize..30,
                batches in proptest::collection::vec(0usize..20, 0..10),
            ) {
                let cache = SubjectCache::new(bound);
                let mut total = 0usize;
                for (i, size) in batches.iter().enumerate() {
                    let records = (0..*size).map(|j| record(&format!("{}-{}", i, j)));
                    cache.push_all("s", records);
                    total += size;
                    prop_assert!(cache.len("s") <= bound);
                    prop_assert_eq!(cache.len("s"), total.min(bound));
                }
            }

            #[test]
            fn prop_cache_keeps_newest(values in proptest::collection::vec("[a-z]{1,6}", 1..40)) {
                let cache = SubjectCache::new(10);
                cache.push_all("s", values.iter().map(|v| record(v)));
                let kept: Vec<String> = cache.snapshot("s").into_iter().map(|r| r.value).collect();
                let start = values.len().saturating_sub(10);
                prop_assert_eq!(kept, values[start..].to_vec());
            }
        }
    }
}
