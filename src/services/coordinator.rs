//! Per-turn orchestration of the cognitive workers.
//!
//! One [`Coordinator`] is shared by every concurrent turn in the process. For a
//! single turn it runs, in fixed order:
//!
//! 1. fact extraction (awaited, retried on transient failures)
//! 2. detached persistence of the facts to the long-term store
//! 3. historical goal/plan gathering, then the goal cache update
//! 4. reflection, when a fact is confident enough
//! 5. long-term fact resolution and profile inference
//! 6. the long-term cache update
//! 7. reply generation
//! 8. the knowledge graph update
//!
//! Every stage after validation is fail-soft: errors are logged and the stage
//! contributes nothing. Turns for the same subject are serialized; turns for
//! different subjects run concurrently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::models::{
    Fact, FactRecord, Insight, ProfileInference, TurnInput, TurnMetadata, TurnOutput,
};
use crate::services::background::BackgroundTasks;
use crate::services::cache::{is_goal_like, SubjectCache, GOAL_QUERY};
use crate::services::graph::KnowledgeGraph;
use crate::utils::validate_subject_id;
use crate::workers::{
    with_retry, DialogueContext, FactExtractor, InsightGenerator, LongTermStore, ProfileInferrer,
    ReplyGenerator, RetryPolicy, DEFAULT_PROMPT_KEY,
};
use crate::MnemosError;

/// Tunables for [`Coordinator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub goal_cache_bound: usize,
    pub long_term_cache_bound: usize,
    /// Cap on historical goal/plan records handed to reflection.
    pub historical_cap: usize,
    pub goal_search_limit: usize,
    pub long_term_search_limit: usize,
    /// Reflection runs when any fact's confidence is strictly above this.
    pub reflection_threshold: f64,
    /// Inference runs when at least this many long-term facts are available.
    pub inference_min_facts: usize,
    pub fallback_reply: String,
    /// Conversation id for persisted facts when the turn has no session id.
    pub conversation_id: String,
    pub extraction_retry: RetryPolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            goal_cache_bound: 20,
            long_term_cache_bound: 80,
            historical_cap: 15,
            goal_search_limit: 10,
            long_term_search_limit: 30,
            reflection_threshold: 0.8,
            inference_min_facts: 5,
            fallback_reply: "Sorry, something went wrong while preparing a reply. Please try again."
                .to_string(),
            conversation_id: "mnemos_facts".to_string(),
            extraction_retry: RetryPolicy::no_retry(),
        }
    }
}

pub struct Coordinator {
    config: CoordinatorConfig,
    extractor: Option<Arc<dyn FactExtractor>>,
    insight_generator: Option<Arc<dyn InsightGenerator>>,
    profile_inferrer: Option<Arc<dyn ProfileInferrer>>,
    reply_generator: Option<Arc<dyn ReplyGenerator>>,
    store: Option<Arc<dyn LongTermStore>>,
    graph: Arc<KnowledgeGraph>,
    goal_cache: SubjectCache,
    long_term_cache: SubjectCache,
    background: BackgroundTasks,
    subject_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl Coordinator {
    /// A coordinator with no workers, no store and a fresh graph.
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            goal_cache: SubjectCache::new(config.goal_cache_bound),
            long_term_cache: SubjectCache::new(config.long_term_cache_bound),
            config,
            extractor: None,
            insight_generator: None,
            profile_inferrer: None,
            reply_generator: None,
            store: None,
            graph: Arc::new(KnowledgeGraph::new()),
            background: BackgroundTasks::new(),
            subject_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn FactExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_insight_generator(mut self, generator: Arc<dyn InsightGenerator>) -> Self {
        self.insight_generator = Some(generator);
        self
    }

    pub fn with_profile_inferrer(mut self, inferrer: Arc<dyn ProfileInferrer>) -> Self {
        self.profile_inferrer = Some(inferrer);
        self
    }

    pub fn with_reply_generator(mut self, generator: Arc<dyn ReplyGenerator>) -> Self {
        self.reply_generator = Some(generator);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn LongTermStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_graph(mut self, graph: Arc<KnowledgeGraph>) -> Self {
        self.graph = graph;
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn graph(&self) -> &Arc<KnowledgeGraph> {
        &self.graph
    }

    pub fn goal_cache(&self) -> &SubjectCache {
        &self.goal_cache
    }

    pub fn long_term_cache(&self) -> &SubjectCache {
        &self.long_term_cache
    }

    /// Number of detached tasks that have not finished yet.
    pub fn pending_background(&self) -> usize {
        self.background.pending()
    }

    /// Await all detached work. Call before the process exits.
    pub async fn shutdown(&self) {
        let completed = self.background.drain().await;
        info!(completed, "Coordinator background work drained");
    }

    /// Run one conversational turn.
    ///
    /// Only a missing subject id is an error; it is rejected before any
    /// worker runs or any state changes.
    pub async fn process(&self, input: TurnInput) -> Result<TurnOutput, MnemosError> {
        let subject_id = validate_subject_id(&input.subject_id)?.to_string();

        let _slot = self.acquire_subject(&subject_id).await;

        let facts = self.extract_facts(&input.message, &subject_id).await;
        let turn_facts: &[Fact] = facts.as_deref().unwrap_or_default();

        if !turn_facts.is_empty() {
            self.schedule_persistence(turn_facts, &subject_id, input.session_id.as_deref());
        }

        let historical = self.historical_goals(&subject_id).await;
        self.goal_cache.push_all(
            &subject_id,
            turn_facts
                .iter()
                .filter(|f| is_goal_like(&f.attribute))
                .map(Fact::to_record),
        );

        let insights = if self.should_reflect(turn_facts) {
            self.reflect(&input.message, &subject_id, turn_facts, &historical)
                .await
        } else {
            None
        };

        let long_term = self.long_term_facts(&input, &subject_id).await;
        let inference = if long_term.len() >= self.config.inference_min_facts {
            self.infer(&subject_id, &long_term, &input.message).await
        } else {
            None
        };

        self.long_term_cache
            .push_all(&subject_id, turn_facts.iter().map(Fact::to_record));

        let context = self.dialogue_context(&input, turn_facts, insights.as_deref(), &inference);
        let reply = self.reply(&input.message, &subject_id, &context).await;

        let graph_updates = match self.graph.update(
            turn_facts,
            insights.as_deref().unwrap_or_default(),
            &subject_id,
        ) {
            Ok(updates) => Some(updates),
            Err(e) => {
                warn!(subject_id = %subject_id, stage = "graph", "Graph update failed: {}", e);
                None
            }
        };

        Ok(TurnOutput {
            reply,
            facts,
            insights,
            psychological_inference: inference,
            graph_updates,
            metadata: TurnMetadata {
                subject_id,
                timestamp: Utc::now(),
                session_id: input.session_id,
            },
        })
    }

    /// Number of subjects with a turn in flight or waiting.
    pub fn active_subjects(&self) -> usize {
        self.subject_locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    async fn acquire_subject(&self, subject_id: &str) -> SubjectSlot<'_> {
        let lock = {
            let mut locks = self.subject_locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(locks.entry(subject_id.to_string()).or_default())
        };
        SubjectSlot {
            locks: &self.subject_locks,
            subject_id: subject_id.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    async fn extract_facts(&self, message: &str, subject_id: &str) -> Option<Vec<Fact>> {
        let extractor = self.extractor.as_ref()?;
        let result = with_retry(&self.config.extraction_retry, "extraction", || {
            extractor.extract_facts(message, subject_id)
        })
        .await;
        match result {
            Ok(facts) => {
                debug!(subject_id, count = facts.len(), "Facts extracted");
                Some(facts)
            }
            Err(e) => {
                warn!(subject_id, stage = "extraction", "Fact extraction failed: {}", e);
                None
            }
        }
    }

    fn schedule_persistence(&self, facts: &[Fact], subject_id: &str, session_id: Option<&str>) {
        let Some(store) = self.store.as_ref().filter(|s| s.is_configured()) else {
            return;
        };
        let store = Arc::clone(store);
        let records: Vec<FactRecord> = facts.iter().map(Fact::to_record).collect();
        let subject_id = subject_id.to_string();
        let conversation_id = session_id
            .map(str::to_string)
            .unwrap_or_else(|| self.config.conversation_id.clone());

        self.background.spawn("persist_facts", async move {
            match store.add_many(&records, &subject_id, &conversation_id).await {
                Ok(count) => debug!(subject_id = %subject_id, count, "Facts persisted"),
                Err(e) => warn!(
                    subject_id = %subject_id,
                    stage = "persistence",
                    "Fact persistence failed: {}",
                    e
                ),
            }
        });
    }

    /// Best-effort store lookup. Failures are logged at debug and yield nothing.
    async fn search_store(&self, subject_id: &str, query: &str, limit: usize) -> Vec<FactRecord> {
        let Some(store) = self.store.as_ref().filter(|s| s.is_configured()) else {
            return Vec::new();
        };
        match store.search(subject_id, query, limit).await {
            Ok(records) => records,
            Err(e) => {
                debug!(subject_id, query, "Long-term store search failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn historical_goals(&self, subject_id: &str) -> Vec<FactRecord> {
        let from_store = self
            .search_store(subject_id, GOAL_QUERY, self.config.goal_search_limit)
            .await;
        merge_capped(
            from_store,
            self.goal_cache.snapshot(subject_id),
            self.config.historical_cap,
        )
    }

    fn should_reflect(&self, facts: &[Fact]) -> bool {
        facts
            .iter()
            .any(|f| f.confidence > self.config.reflection_threshold)
    }

    async fn reflect(
        &self,
        message: &str,
        subject_id: &str,
        facts: &[Fact],
        historical: &[FactRecord],
    ) -> Option<Vec<Insight>> {
        let generator = self.insight_generator.as_ref()?;
        match generator
            .generate_insights(message, subject_id, facts, historical)
            .await
        {
            Ok(insights) => Some(insights),
            Err(e) => {
                warn!(subject_id, stage = "reflection", "Insight generation failed: {}", e);
                None
            }
        }
    }

    async fn long_term_facts(&self, input: &TurnInput, subject_id: &str) -> Vec<FactRecord> {
        let supplied = input
            .context
            .as_ref()
            .and_then(|c| c.long_term_facts_override.as_ref())
            .filter(|facts| !facts.is_empty());
        if let Some(facts) = supplied {
            return facts.clone();
        }

        let from_store = self
            .search_store(subject_id, "", self.config.long_term_search_limit)
            .await;
        merge_capped(
            from_store,
            self.long_term_cache.snapshot(subject_id),
            self.config.long_term_cache_bound,
        )
    }

    async fn infer(
        &self,
        subject_id: &str,
        long_term: &[FactRecord],
        message: &str,
    ) -> Option<ProfileInference> {
        let inferrer = self.profile_inferrer.as_ref()?;
        match inferrer.infer_profile(subject_id, long_term, message).await {
            Ok(inference) => Some(inference),
            Err(e) => {
                warn!(subject_id, stage = "inference", "Profile inference failed: {}", e);
                None
            }
        }
    }

    fn dialogue_context(
        &self,
        input: &TurnInput,
        facts: &[Fact],
        insights: Option<&[Insight]>,
        inference: &Option<ProfileInference>,
    ) -> DialogueContext {
        let context = input.context.as_ref();
        DialogueContext {
            facts: facts.to_vec(),
            insights: insights.map(<[Insight]>::to_vec).unwrap_or_default(),
            inference: inference.clone(),
            prompt_key: context
                .and_then(|c| c.prompt_key.clone())
                .unwrap_or_else(|| DEFAULT_PROMPT_KEY.to_string()),
            extra: context.map(|c| c.extra.clone()).unwrap_or_default(),
        }
    }

    async fn reply(&self, message: &str, subject_id: &str, context: &DialogueContext) -> String {
        let Some(generator) = self.reply_generator.as_ref() else {
            warn!(subject_id, stage = "dialogue", "No reply generator configured");
            return self.config.fallback_reply.clone();
        };
        match generator.generate_reply(message, subject_id, context).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(subject_id, stage = "dialogue", "Reply generation failed: {}", e);
                self.config.fallback_reply.clone()
            }
        }
    }
}

/// Store results first, then cache entries not already present, capped.
fn merge_capped(
    mut primary: Vec<FactRecord>,
    secondary: Vec<FactRecord>,
    cap: usize,
) -> Vec<FactRecord> {
    for record in secondary {
        if !primary.contains(&record) {
            primary.push(record);
        }
    }
    primary.truncate(cap);
    primary
}

/// Holds a subject's turn lock; releasing it drops the map entry once no
/// other turn holds or awaits it.
struct SubjectSlot<'a> {
    locks: &'a Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    subject_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SubjectSlot<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks
            .get(&self.subject_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.subject_id);
        }
    }
}
