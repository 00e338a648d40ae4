//! Shared initialization for the CLI.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{load_config, MnemosConfig};
use crate::services::{GraphFormat, KnowledgeGraph};

/// File the knowledge graph is persisted to inside the data directory.
pub const GRAPH_FILE: &str = "graph.json";

/// Application context holding the loaded config and graph.
pub struct AppContext {
    pub data_path: PathBuf,
    pub config: MnemosConfig,
    pub graph: Arc<KnowledgeGraph>,
}

impl AppContext {
    /// Initialize application context.
    ///
    /// Data path priority: explicit path > MNEMOS_DATA_PATH env > ./.mnemos (if exists) > ~/.mnemos
    pub async fn new(explicit_path: Option<PathBuf>) -> Result<Self> {
        let data_path = resolve_data_path(explicit_path);
        tracing::info!("Using data path: {}", data_path.display());

        let config = load_config(&data_path);

        let graph = Arc::new(KnowledgeGraph::new());
        let graph_path = data_path.join(GRAPH_FILE);
        if graph_path.exists() {
            let summary = graph.load(&graph_path, GraphFormat::Json)?;
            tracing::info!(
                subjects = summary.subjects,
                nodes = summary.nodes,
                edges = summary.edges,
                "Graph loaded"
            );
        }

        Ok(Self {
            data_path,
            config,
            graph,
        })
    }

    pub fn graph_path(&self) -> PathBuf {
        self.data_path.join(GRAPH_FILE)
    }

    /// Persist the graph to its default location.
    pub fn save_graph(&self) -> Result<()> {
        self.graph.save(&self.graph_path(), GraphFormat::Json)?;
        Ok(())
    }
}

fn resolve_data_path(explicit_path: Option<PathBuf>) -> PathBuf {
    explicit_path
        .or_else(|| std::env::var("MNEMOS_DATA_PATH").ok().map(PathBuf::from))
        .or_else(|| {
            let local_path = Path::new(".mnemos");
            if local_path.exists() && local_path.is_dir() {
                Some(local_path.to_path_buf())
            } else {
                None
            }
        })
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".mnemos"))
                .unwrap_or_else(|| PathBuf::from(".mnemos"))
        })
}
