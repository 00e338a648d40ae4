//! In-process long-term store, for tests and local runs without a memory cloud.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use crate::models::FactRecord;
use crate::workers::LongTermStore;
use crate::MnemosError;

/// Per-subject append log implementing [`LongTermStore`].
#[derive(Debug)]
pub struct InMemoryLongTermStore {
    configured: bool,
    records: RwLock<HashMap<String, Vec<FactRecord>>>,
}

impl Default for InMemoryLongTermStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLongTermStore {
    pub fn new() -> Self {
        Self {
            configured: true,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// A store that reports itself as unconfigured and is skipped by the coordinator.
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    /// Records stored for `subject_id`, oldest first.
    pub fn records_for(&self, subject_id: &str) -> Vec<FactRecord> {
        let map = self.records.read().unwrap_or_else(|e| e.into_inner());
        map.get(subject_id).cloned().unwrap_or_default()
    }
}

fn matches_any(record: &FactRecord, terms: &[String]) -> bool {
    let haystack = format!(
        "{} {} {} {}",
        record.entity,
        record.attribute,
        record.value,
        record.context_tags.join(" ")
    )
    .to_lowercase();
    terms.iter().any(|t| haystack.contains(t.as_str()))
}

#[async_trait]
impl LongTermStore for InMemoryLongTermStore {
    fn is_configured(&self) -> bool {
        self.configured
    }

    /// Empty query: the most recent `limit` records. Otherwise records where any
    /// whitespace-separated term appears in a field or tag, most recent first.
    async fn search(
        &self,
        subject_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<FactRecord>, MnemosError> {
        let map = self.records.read().unwrap_or_else(|e| e.into_inner());
        let Some(records) = map.get(subject_id) else {
            return Ok(Vec::new());
        };
        let terms: Vec<String> = query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
        let found: Vec<FactRecord> = records
            .iter()
            .rev()
            .filter(|r| terms.is_empty() || matches_any(r, &terms))
            .take(limit)
            .cloned()
            .collect();
        debug!(subject_id, query, count = found.len(), "In-memory store search");
        Ok(found)
    }

    async fn add_many(
        &self,
        facts: &[FactRecord],
        subject_id: &str,
        conversation_id: &str,
    ) -> Result<usize, MnemosError> {
        if !self.configured {
            return Err(MnemosError::Store(
                "long-term store is not configured".to_string(),
            ));
        }
        let mut map = self.records.write().unwrap_or_else(|e| e.into_inner());
        map.entry(subject_id.to_string())
            .or_default()
            .extend(facts.iter().cloned());
        debug!(subject_id, conversation_id, count = facts.len(), "Stored facts");
        Ok(facts.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(entity: &str, attribute: &str, value: &str) -> FactRecord {
        FactRecord::new(entity, attribute, value)
    }

    #[tokio::test]
    async fn test_add_and_search_are_subject_scoped() {
        let store = InMemoryLongTermStore::new();
        store
            .add_many(&[record("Ann", "plan", "visit Oslo")], "ann", "c1")
            .await
            .unwrap();
        store
            .add_many(&[record("Bob", "plan", "learn piano")], "bob", "c1")
            .await
            .unwrap();

        let ann = store.search("ann", "", 10).await.unwrap();
        assert_eq!(ann, vec![record("Ann", "plan", "visit Oslo")]);
        assert!(store.search("carol", "", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_terms_match_any_field() {
        let store = InMemoryLongTermStore::new();
        let mut tagged = record("Ann", "likes", "tea");
        tagged.context_tags.push("#morning".into());
        store
            .add_many(
                &[record("Ann", "goal", "run"), tagged, record("Ann", "age", "30")],
                "ann",
                "c1",
            )
            .await
            .unwrap();

        let hits = store.search("ann", "goal #MORNING", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        // most recent first
        assert_eq!(hits[0].attribute, "likes");

        let limited = store.search("ann", "", 1).await.unwrap();
        assert_eq!(limited, vec![record("Ann", "age", "30")]);
    }

    #[tokio::test]
    async fn test_unconfigured_store_rejects_writes() {
        let store = InMemoryLongTermStore::unconfigured();
        assert!(!store.is_configured());
        assert!(store.add_many(&[], "ann", "c1").await.is_err());
    }
}
