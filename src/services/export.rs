//! Graph interchange document and writer.
//!
//! The document is a node-link list: every node and every edge carries its
//! owning subject, so one file round-trips all partitions.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{GraphEdge, GraphNode};
use crate::MnemosError;

/// Interchange format for graph persistence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphFormat {
    #[default]
    Json,
    Yaml,
}

impl GraphFormat {
    /// Guess the format from a file extension, defaulting to JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => GraphFormat::Yaml,
            _ => GraphFormat::Json,
        }
    }
}

impl fmt::Display for GraphFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphFormat::Json => f.write_str("json"),
            GraphFormat::Yaml => f.write_str("yaml"),
        }
    }
}

impl FromStr for GraphFormat {
    type Err = MnemosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(GraphFormat::Json),
            "yaml" | "yml" => Ok(GraphFormat::Yaml),
            other => Err(MnemosError::Validation(format!(
                "Unknown graph format '{}' (expected json or yaml)",
                other
            ))),
        }
    }
}

/// Node-link document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default = "default_true")]
    pub directed: bool,
    #[serde(default = "default_true")]
    pub multigraph: bool,
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default, alias = "edges")]
    pub links: Vec<GraphEdge>,
}

fn default_true() -> bool {
    true
}

impl GraphDocument {
    pub fn new(nodes: Vec<GraphNode>, links: Vec<GraphEdge>) -> Self {
        Self {
            directed: true,
            multigraph: true,
            nodes,
            links,
        }
    }

    pub fn render(&self, format: GraphFormat) -> Result<String, MnemosError> {
        Ok(match format {
            GraphFormat::Json => serde_json::to_string_pretty(self)?,
            GraphFormat::Yaml => serde_yaml_ng::to_string(self)?,
        })
    }
}

/// Write `document` to `path`, creating parent directories.
pub fn write_document(
    document: &GraphDocument,
    path: &Path,
    format: GraphFormat,
) -> Result<(), MnemosError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, document.render(format)?)?;
    Ok(())
}
