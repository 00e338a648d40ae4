//! Graph document reader and validation.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Serialize;

use crate::services::export::{GraphDocument, GraphFormat};
use crate::services::graph::Partition;
use crate::MnemosError;

/// Counts of what a load brought in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub subjects: usize,
    pub nodes: usize,
    pub edges: usize,
    pub insights: usize,
}

/// Read a document from `path`. A missing file is [`MnemosError::NotFound`].
pub fn read_document(path: &Path, format: GraphFormat) -> Result<GraphDocument, MnemosError> {
    if !path.exists() {
        return Err(MnemosError::NotFound {
            entity_type: "graph file".to_string(),
            id: path.display().to_string(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    Ok(match format {
        GraphFormat::Json => serde_json::from_str(&content)?,
        GraphFormat::Yaml => serde_yaml_ng::from_str(&content)?,
    })
}

/// Check a document and split it into subject partitions.
///
/// Rejects blank ids or subjects, duplicate nodes, zero weights, self-loops,
/// edges whose endpoints are missing from their subject's partition, and
/// duplicate (source, target, relation) edges within a subject.
pub(crate) fn validate_document(
    document: GraphDocument,
) -> Result<(BTreeMap<String, Partition>, ImportSummary), MnemosError> {
    let mut partitions: BTreeMap<String, Partition> = BTreeMap::new();
    let mut summary = ImportSummary::default();

    for node in document.nodes {
        if node.id.trim().is_empty() || node.subject_id.trim().is_empty() {
            return Err(MnemosError::Persistence(format!(
                "Node with blank id or subject: '{}' / '{}'",
                node.id, node.subject_id
            )));
        }
        let partition = partitions.entry(node.subject_id.clone()).or_default();
        if partition.nodes.contains_key(&node.id) {
            return Err(MnemosError::Persistence(format!(
                "Duplicate node '{}' for subject '{}'",
                node.id, node.subject_id
            )));
        }
        summary.insights += node.insights.len();
        partition.nodes.insert(node.id.clone(), node);
    }

    let mut seen: HashSet<(String, String, String, String)> = HashSet::new();
    for edge in document.links {
        if edge.weight < 1 {
            return Err(MnemosError::Persistence(format!(
                "Edge {} -[{}]-> {} has weight 0",
                edge.source, edge.relation, edge.target
            )));
        }
        if edge.source == edge.target {
            return Err(MnemosError::Persistence(format!(
                "Self-loop on '{}' is not allowed",
                edge.source
            )));
        }
        let partition = partitions.get_mut(&edge.subject_id).ok_or_else(|| {
            MnemosError::Persistence(format!(
                "Edge {} -> {} references unknown subject '{}'",
                edge.source, edge.target, edge.subject_id
            ))
        })?;
        if !partition.nodes.contains_key(&edge.source) || !partition.nodes.contains_key(&edge.target)
        {
            return Err(MnemosError::Persistence(format!(
                "Edge {} -> {} has an endpoint outside subject '{}'",
                edge.source, edge.target, edge.subject_id
            )));
        }
        let identity = (
            edge.subject_id.clone(),
            edge.source.clone(),
            edge.target.clone(),
            edge.relation.clone(),
        );
        if !seen.insert(identity) {
            return Err(MnemosError::Persistence(format!(
                "Duplicate edge {} -[{}]-> {} for subject '{}'",
                edge.source, edge.relation, edge.target, edge.subject_id
            )));
        }
        partition.edges.insert(
            (edge.source.clone(), edge.target.clone(), edge.relation.clone()),
            edge,
        );
    }

    summary.subjects = partitions.len();
    summary.nodes = partitions.values().map(|p| p.nodes.len()).sum();
    summary.edges = partitions.values().map(|p| p.edges.len()).sum();
    Ok((partitions, summary))
}
