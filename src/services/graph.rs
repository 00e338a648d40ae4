//! Multi-relational knowledge graph with reinforcement semantics.
//!
//! Nodes are entity strings and are partitioned by subject: the same entity
//! under two subjects is two unrelated nodes. Edges are directed and typed;
//! at most one edge exists per (source, target, relation) in a partition and
//! repeated observations increase its weight.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use crate::models::{Fact, GraphEdge, GraphNode, GraphUpdate, Insight};
use crate::services::export::{write_document, GraphDocument, GraphFormat};
use crate::services::import::{read_document, validate_document, ImportSummary};
use crate::utils::sanitize::{is_materializable, normalize_node_id, validate_subject_id};
use crate::MnemosError;

/// Relation label for facts with an empty attribute.
pub const DEFAULT_RELATION: &str = "related_to";
/// Reserved relation label for co-occurrence reinforcement.
pub const CO_OCCURRENCE: &str = "co_occurrence";

type EdgeKey = (String, String, String);

/// One subject's slice of the graph.
#[derive(Debug, Default, Clone)]
pub(crate) struct Partition {
    pub(crate) nodes: BTreeMap<String, GraphNode>,
    pub(crate) edges: BTreeMap<EdgeKey, GraphEdge>,
}

impl Partition {
    fn ensure_node(&mut self, id: &str, subject_id: &str, updates: &mut Vec<GraphUpdate>) {
        if !self.nodes.contains_key(id) {
            self.nodes.insert(
                id.to_string(),
                GraphNode {
                    id: id.to_string(),
                    subject_id: subject_id.to_string(),
                    insights: Vec::new(),
                },
            );
            updates.push(GraphUpdate::AddNode {
                id: id.to_string(),
                subject_id: subject_id.to_string(),
            });
        }
    }

    /// Add an edge with weight 1 or bump the existing one. Returns the new weight.
    ///
    /// Self-loops, sentinel endpoints and endpoints without a node are ignored.
    fn add_or_increment(
        &mut self,
        source: &str,
        target: &str,
        relation: &str,
        subject_id: &str,
    ) -> Option<u64> {
        if source == target || !is_materializable(source) || !is_materializable(target) {
            return None;
        }
        if !self.nodes.contains_key(source) || !self.nodes.contains_key(target) {
            return None;
        }
        let key = (source.to_string(), target.to_string(), relation.to_string());
        let edge = self.edges.entry(key).or_insert_with(|| GraphEdge {
            source: source.to_string(),
            target: target.to_string(),
            relation: relation.to_string(),
            subject_id: subject_id.to_string(),
            weight: 0,
        });
        edge.weight += 1;
        Some(edge.weight)
    }

    /// Symmetric co-occurrence bump for every unordered pair in `members`.
    fn reinforce(
        &mut self,
        members: &BTreeSet<String>,
        subject_id: &str,
        updates: &mut Vec<GraphUpdate>,
    ) {
        let members: Vec<&String> = members.iter().filter(|m| is_materializable(m)).collect();
        for (i, a) in members.iter().enumerate() {
            for b in &members[i + 1..] {
                let forward = self.add_or_increment(a, b, CO_OCCURRENCE, subject_id);
                let backward = self.add_or_increment(b, a, CO_OCCURRENCE, subject_id);
                if forward.is_some() || backward.is_some() {
                    updates.push(GraphUpdate::IncrementWeight {
                        relation_type: CO_OCCURRENCE.to_string(),
                        pair: ((*a).clone(), (*b).clone()),
                        subject_id: subject_id.to_string(),
                    });
                }
            }
        }
    }
}

/// Process-wide knowledge graph.
#[derive(Debug, Default)]
pub struct KnowledgeGraph {
    partitions: RwLock<BTreeMap<String, Partition>>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Partition>> {
        self.partitions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Partition>> {
        self.partitions.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Weave one turn's facts and insights into `subject_id`'s partition.
    ///
    /// Every fact with an entity yields an entity node; a distinct non-empty
    /// value yields a value node and an `entity -[attribute]-> value` edge.
    /// All nodes touched this turn are then pairwise reinforced with
    /// co-occurrence edges, and again within each context tag group. The two
    /// passes are additive. Finally the turn's insights are appended to every
    /// touched node.
    pub fn update(
        &self,
        facts: &[Fact],
        insights: &[Insight],
        subject_id: &str,
    ) -> Result<Vec<GraphUpdate>, MnemosError> {
        let subject_id = validate_subject_id(subject_id)?;
        let mut updates = Vec::new();
        let mut touched: BTreeSet<String> = BTreeSet::new();
        let mut tag_groups: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        let mut partitions = self.write();
        let partition = partitions.entry(subject_id.to_string()).or_default();

        for fact in facts {
            let entity = normalize_node_id(&fact.entity);
            if !is_materializable(&entity) {
                continue;
            }
            let value = normalize_node_id(&fact.value);
            let relation = match fact.attribute.trim() {
                "" => DEFAULT_RELATION,
                attr => attr,
            };

            partition.ensure_node(&entity, subject_id, &mut updates);
            touched.insert(entity.clone());

            let has_value = is_materializable(&value) && value != entity;
            if has_value {
                partition.ensure_node(&value, subject_id, &mut updates);
                touched.insert(value.clone());
                if let Some(weight) =
                    partition.add_or_increment(&entity, &value, relation, subject_id)
                {
                    updates.push(GraphUpdate::AddEdge {
                        source: entity.clone(),
                        target: value.clone(),
                        relation_type: relation.to_string(),
                        subject_id: subject_id.to_string(),
                        weight,
                    });
                }
            }

            for tag in fact.context_tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
                let group = tag_groups.entry(tag.to_string()).or_default();
                group.insert(entity.clone());
                if has_value {
                    group.insert(value.clone());
                }
            }
        }

        partition.reinforce(&touched, subject_id, &mut updates);
        for members in tag_groups.values() {
            partition.reinforce(members, subject_id, &mut updates);
        }

        if !insights.is_empty() && !touched.is_empty() {
            let records: Vec<Insight> = insights
                .iter()
                .filter(|i| !i.text.trim().is_empty())
                .cloned()
                .collect();
            for id in &touched {
                if let Some(node) = partition.nodes.get_mut(id) {
                    node.insights.extend(records.iter().cloned());
                }
            }
            updates.push(GraphUpdate::AttachInsights {
                subject_id: subject_id.to_string(),
                nodes: touched.iter().cloned().collect(),
                count: records.len(),
            });
        }

        if !updates.is_empty() {
            debug!(
                subject_id,
                facts = facts.len(),
                nodes_touched = touched.len(),
                "Graph updated"
            );
        }
        Ok(updates)
    }

    /// Node count, optionally for one subject only.
    pub fn node_count(&self, subject_id: Option<&str>) -> usize {
        let partitions = self.read();
        match subject_id {
            Some(s) => partitions.get(s).map_or(0, |p| p.nodes.len()),
            None => partitions.values().map(|p| p.nodes.len()).sum(),
        }
    }

    /// Edge count, optionally for one subject only.
    pub fn edge_count(&self, subject_id: Option<&str>) -> usize {
        let partitions = self.read();
        match subject_id {
            Some(s) => partitions.get(s).map_or(0, |p| p.edges.len()),
            None => partitions.values().map(|p| p.edges.len()).sum(),
        }
    }

    pub fn node(&self, subject_id: &str, id: &str) -> Option<GraphNode> {
        self.read()
            .get(subject_id)
            .and_then(|p| p.nodes.get(id.trim()))
            .cloned()
    }

    pub fn edge(
        &self,
        subject_id: &str,
        source: &str,
        target: &str,
        relation: &str,
    ) -> Option<GraphEdge> {
        let key = (
            source.trim().to_string(),
            target.trim().to_string(),
            relation.to_string(),
        );
        self.read()
            .get(subject_id)
            .and_then(|p| p.edges.get(&key))
            .cloned()
    }

    /// Outgoing edges of `id`, heaviest first.
    pub fn neighbors(&self, subject_id: &str, id: &str) -> Vec<GraphEdge> {
        let id = id.trim();
        let mut edges: Vec<GraphEdge> = self
            .read()
            .get(subject_id)
            .map(|p| {
                p.edges
                    .values()
                    .filter(|e| e.source == id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        edges.sort_by(|a, b| b.weight.cmp(&a.weight));
        edges
    }

    /// Subjects that own at least one node.
    pub fn subjects(&self) -> Vec<String> {
        self.read()
            .iter()
            .filter(|(_, p)| !p.nodes.is_empty())
            .map(|(s, _)| s.clone())
            .collect()
    }

    /// Snapshot as an interchange document.
    pub fn to_document(&self) -> GraphDocument {
        let partitions = self.read();
        GraphDocument::new(
            partitions
                .values()
                .flat_map(|p| p.nodes.values().cloned())
                .collect(),
            partitions
                .values()
                .flat_map(|p| p.edges.values().cloned())
                .collect(),
        )
    }

    /// Replace the whole graph with a validated document.
    pub fn replace_with(&self, document: GraphDocument) -> Result<ImportSummary, MnemosError> {
        let (partitions, summary) = validate_document(document)?;
        *self.write() = partitions;
        Ok(summary)
    }

    pub fn save(&self, path: &Path, format: GraphFormat) -> Result<(), MnemosError> {
        let document = self.to_document();
        write_document(&document, path, format)?;
        info!(
            path = %path.display(),
            nodes = document.nodes.len(),
            edges = document.links.len(),
            "Graph saved"
        );
        Ok(())
    }

    /// Load from `path`, replacing current content. A missing file is `NotFound`.
    pub fn load(&self, path: &Path, format: GraphFormat) -> Result<ImportSummary, MnemosError> {
        let document = read_document(path, format)?;
        let summary = self.replace_with(document)?;
        info!(
            path = %path.display(),
            nodes = summary.nodes,
            edges = summary.edges,
            "Graph loaded"
        );
        Ok(summary)
    }
}
