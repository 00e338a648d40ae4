//! Test harness for coordinator workflows.
//!
//! Provides scripted mock workers with call counters and a harness that wires
//! them into a [`Coordinator`] over an isolated temp directory.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use mnemos::models::{Fact, FactRecord, Insight, ProfileInference};
use mnemos::services::{Coordinator, CoordinatorConfig, KnowledgeGraph};
use mnemos::workers::{
    DialogueContext, FactExtractor, InMemoryLongTermStore, InsightGenerator, LongTermStore,
    ProfileInferrer, ReplyGenerator,
};
use mnemos::MnemosError;

// ============================================================================
// SCRIPTED WORKERS
// ============================================================================

/// Fact extractor returning scripted batches in order, then `fallback`.
pub struct ScriptedExtractor {
    script: Mutex<VecDeque<Result<Vec<Fact>, MnemosError>>>,
    fallback: Vec<Fact>,
    pub calls: AtomicUsize,
}

impl ScriptedExtractor {
    /// Always returns `facts`.
    pub fn returning(facts: Vec<Fact>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: facts,
            calls: AtomicUsize::new(0),
        })
    }

    /// Plays `script` once, then returns empty batches.
    pub fn scripted(script: Vec<Result<Vec<Fact>, MnemosError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback: Vec::new(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FactExtractor for ScriptedExtractor {
    async fn extract_facts(&self, _text: &str, _subject_id: &str) -> Result<Vec<Fact>, MnemosError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

/// Insight generator recording the historical context it was handed.
pub struct RecordingReflector {
    insights: Vec<Insight>,
    fail: bool,
    pub calls: AtomicUsize,
    pub last_historical: Mutex<Vec<FactRecord>>,
}

impl RecordingReflector {
    pub fn returning(insights: Vec<Insight>) -> Arc<Self> {
        Arc::new(Self {
            insights,
            fail: false,
            calls: AtomicUsize::new(0),
            last_historical: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            insights: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
            last_historical: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InsightGenerator for RecordingReflector {
    async fn generate_insights(
        &self,
        _message: &str,
        _subject_id: &str,
        _facts: &[Fact],
        historical_facts: &[FactRecord],
    ) -> Result<Vec<Insight>, MnemosError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_historical.lock().unwrap() = historical_facts.to_vec();
        if self.fail {
            return Err(MnemosError::upstream("reflection", "model unavailable"));
        }
        Ok(self.insights.clone())
    }
}

/// Profile inferrer recording how many long-term facts it saw.
pub struct RecordingInferrer {
    fail: bool,
    pub calls: AtomicUsize,
    pub last_fact_count: AtomicUsize,
}

impl RecordingInferrer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            calls: AtomicUsize::new(0),
            last_fact_count: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            calls: AtomicUsize::new(0),
            last_fact_count: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileInferrer for RecordingInferrer {
    async fn infer_profile(
        &self,
        _subject_id: &str,
        long_term_facts: &[FactRecord],
        _message: &str,
    ) -> Result<ProfileInference, MnemosError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_fact_count
            .store(long_term_facts.len(), Ordering::SeqCst);
        if self.fail {
            return Err(MnemosError::upstream("inference", "model unavailable"));
        }
        Ok(ProfileInference::default())
    }
}

/// Reply generator echoing the message and remembering the last context.
pub struct RecordingReply {
    fail: bool,
    pub calls: AtomicUsize,
    pub last_context: Mutex<Option<DialogueContext>>,
}

impl RecordingReply {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            calls: AtomicUsize::new(0),
            last_context: Mutex::new(None),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            calls: AtomicUsize::new(0),
            last_context: Mutex::new(None),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn context(&self) -> DialogueContext {
        self.last_context.lock().unwrap().clone().expect("reply was generated")
    }
}

#[async_trait]
impl ReplyGenerator for RecordingReply {
    async fn generate_reply(
        &self,
        message: &str,
        _subject_id: &str,
        context: &DialogueContext,
    ) -> Result<String, MnemosError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_context.lock().unwrap() = Some(context.clone());
        if self.fail {
            return Err(MnemosError::upstream("dialogue", "timeout"));
        }
        Ok(format!("echo: {}", message))
    }
}

/// Long-term store wrapper that can slow writes down or fail searches.
pub struct SlowStore {
    pub inner: InMemoryLongTermStore,
    write_delay: Duration,
    fail_search: bool,
    pub searches: AtomicUsize,
}

impl SlowStore {
    pub fn new(write_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryLongTermStore::new(),
            write_delay,
            fail_search: false,
            searches: AtomicUsize::new(0),
        })
    }

    pub fn failing_search() -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryLongTermStore::new(),
            write_delay: Duration::ZERO,
            fail_search: true,
            searches: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LongTermStore for SlowStore {
    fn is_configured(&self) -> bool {
        true
    }

    async fn search(
        &self,
        subject_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<FactRecord>, MnemosError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.fail_search {
            return Err(MnemosError::Store("search endpoint down".to_string()));
        }
        self.inner.search(subject_id, query, limit).await
    }

    async fn add_many(
        &self,
        facts: &[FactRecord],
        subject_id: &str,
        conversation_id: &str,
    ) -> Result<usize, MnemosError> {
        tokio::time::sleep(self.write_delay).await;
        self.inner.add_many(facts, subject_id, conversation_id).await
    }
}

// ============================================================================
// HARNESS
// ============================================================================

/// Isolated temp directory plus a shared graph.
pub struct TestHarness {
    pub graph: Arc<KnowledgeGraph>,
    /// Temporary directory (kept alive while harness exists)
    pub temp_dir: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            graph: Arc::new(KnowledgeGraph::new()),
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn temp_path(&self) -> &std::path::Path {
        self.temp_dir.path()
    }

    /// A coordinator with default config over this harness's graph.
    pub fn coordinator(&self) -> Coordinator {
        Coordinator::new(CoordinatorConfig::default()).with_graph(self.graph.clone())
    }
}
