//! In-process graph backend.
//!
//! Exists so the system runs locally with no database file and backs most
//! engine tests. Data is NOT persisted.

use async_trait::async_trait;
use engram_types::error::{EngramError, EngramResult};
use engram_types::graph::{
    canon, canon_id, label, rel, Edge, ExportEdge, ExportNode, GraphExport, Node,
};
use engram_types::llm::ExtractedEntity;
use engram_types::store::{
    GraphStore, ImportTrace, NodeFilter, ScoreUpdate, StoreCapabilities,
};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::traverse::enumerate_paths;

#[derive(Default)]
struct GraphData {
    nodes: HashMap<String, Node>,
    edges: HashMap<String, Edge>,
}

/// In-process graph store with full capabilities.
#[derive(Default)]
pub struct MemoryGraph {
    data: Mutex<GraphData>,
}

impl MemoryGraph {
    /// Create an empty in-process store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> EngramResult<std::sync::MutexGuard<'_, GraphData>> {
        self.data
            .lock()
            .map_err(|e| EngramError::Internal(e.to_string()))
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Merge an incoming node into the stored one: props override per key,
/// scores set by housekeeping are preserved.
fn merge_node(existing: &mut Node, incoming: &Node) {
    existing.label = incoming.label.clone();
    for (key, value) in &incoming.props {
        existing.props.insert(key.clone(), value.clone());
    }
    existing.confidence = incoming.confidence;
    existing.source = incoming.source.clone();
    existing.updated_at_ms = incoming.updated_at_ms;
}

#[async_trait]
impl GraphStore for MemoryGraph {
    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities {
            traversal: true,
            conflict_lookup: true,
            aggregates: true,
        }
    }

    async fn ensure_schema(&self) -> EngramResult<()> {
        Ok(())
    }

    async fn upsert_entities(
        &self,
        entities: &[ExtractedEntity],
        source: &str,
    ) -> EngramResult<()> {
        let now = now_ms();
        let source_id = format!("source:{source}");
        let mut data = self.lock()?;
        data.nodes
            .entry(source_id.clone())
            .and_modify(|n| n.updated_at_ms = now)
            .or_insert_with(|| {
                Node::new(
                    label::SOURCE,
                    source_id.clone(),
                    HashMap::from([("id".to_string(), serde_json::json!(source))]),
                    1.0,
                    source,
                    now,
                )
            });
        for entity in entities {
            let name = canon(&entity.name);
            if name.is_empty() {
                continue;
            }
            let id = canon_id("entity", &name);
            let node = Node::new(
                label::ENTITY,
                id.clone(),
                HashMap::from([
                    ("name".to_string(), serde_json::json!(name)),
                    ("type".to_string(), serde_json::json!(entity.entity_type)),
                ]),
                1.0,
                source,
                now,
            );
            match data.nodes.entry(id.clone()) {
                Entry::Occupied(mut existing) => merge_node(existing.get_mut(), &node),
                Entry::Vacant(slot) => {
                    slot.insert(node);
                }
            }
            let edge = Edge::new(
                id,
                rel::MENTIONED_IN,
                source_id.clone(),
                HashMap::new(),
                source,
                now,
            );
            data.edges.entry(edge.id.clone()).or_insert(edge);
        }
        Ok(())
    }

    async fn fetch_context(&self, limit: usize) -> EngramResult<String> {
        let data = self.lock()?;
        let mut nodes: Vec<&Node> = data
            .nodes
            .values()
            .filter(|n| !n.archived && n.label != label::SOURCE)
            .collect();
        nodes.sort_by(|a, b| b.updated_at_ms.cmp(&a.updated_at_ms).then(a.id.cmp(&b.id)));
        Ok(nodes
            .iter()
            .take(limit)
            .map(|n| n.context_line())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn upsert_nodes_edges(&self, nodes: &[Node], edges: &[Edge]) -> EngramResult<()> {
        let mut data = self.lock()?;
        for node in nodes {
            match data.nodes.entry(node.id.clone()) {
                Entry::Occupied(mut existing) => merge_node(existing.get_mut(), node),
                Entry::Vacant(slot) => {
                    slot.insert(node.clone());
                }
            }
        }
        for edge in edges {
            data.edges
                .entry(edge.id.clone())
                .or_insert_with(|| edge.clone());
        }
        Ok(())
    }

    async fn export_graph(&self, limit_nodes: usize) -> EngramResult<GraphExport> {
        let data = self.lock()?;
        let mut nodes: Vec<&Node> = data.nodes.values().collect();
        nodes.sort_by(|a, b| b.updated_at_ms.cmp(&a.updated_at_ms).then(a.id.cmp(&b.id)));
        let exported: Vec<ExportNode> = nodes
            .iter()
            .take(limit_nodes)
            .map(|n| ExportNode {
                id: n.id.clone(),
                label: n.title().to_string(),
                node_type: n.label.clone(),
                props: n.props.clone(),
                updated_at_ms: n.updated_at_ms,
            })
            .collect();
        let ids: HashSet<&str> = exported.iter().map(|n| n.id.as_str()).collect();
        let mut edges: Vec<&Edge> = data
            .edges
            .values()
            .filter(|e| ids.contains(e.src.as_str()) && ids.contains(e.dst.as_str()))
            .collect();
        edges.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms).then(a.id.cmp(&b.id)));
        let edges = edges
            .iter()
            .take(5000)
            .map(|e| ExportEdge {
                id: e.id.clone(),
                from: e.src.clone(),
                to: e.dst.clone(),
                label: e.rel.clone(),
                props: e.props.clone(),
                created_at_ms: e.created_at_ms,
            })
            .collect();
        Ok(GraphExport {
            nodes: exported,
            edges,
        })
    }

    async fn traverse_imports(
        &self,
        start_path: &str,
        hops: u32,
        limit: usize,
    ) -> EngramResult<ImportTrace> {
        let data = self.lock()?;
        let path_of = |id: &str| -> Option<String> {
            data.nodes
                .get(id)
                .and_then(|n| n.prop_str("path").map(str::to_string))
        };
        let start_exists = data
            .nodes
            .values()
            .any(|n| n.label == label::FILE && n.prop_str("path") == Some(start_path));
        if !start_exists {
            return Ok(ImportTrace::empty(start_path, hops));
        }
        let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
        for edge in data.edges.values() {
            if edge.rel != rel::IMPORTS {
                continue;
            }
            if let (Some(from), Some(to)) = (path_of(&edge.src), path_of(&edge.dst)) {
                adjacency.entry(from).or_default().push(to);
            }
        }
        for targets in adjacency.values_mut() {
            targets.sort();
        }
        Ok(ImportTrace {
            start: start_path.to_string(),
            hops,
            paths: enumerate_paths(&adjacency, start_path, hops, limit),
        })
    }

    async fn get_nodes(&self, ids: &[String]) -> EngramResult<Vec<Node>> {
        let data = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| data.nodes.get(id).cloned())
            .collect())
    }

    async fn scan_nodes(&self) -> EngramResult<Vec<Node>> {
        let data = self.lock()?;
        Ok(data.nodes.values().cloned().collect())
    }

    async fn node_degrees(&self, ids: &[String]) -> EngramResult<HashMap<String, u64>> {
        let data = self.lock()?;
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut degrees: HashMap<String, u64> = HashMap::new();
        for edge in data.edges.values() {
            if wanted.contains(edge.src.as_str()) {
                *degrees.entry(edge.src.clone()).or_default() += 1;
            }
            if wanted.contains(edge.dst.as_str()) {
                *degrees.entry(edge.dst.clone()).or_default() += 1;
            }
        }
        Ok(degrees)
    }

    async fn apply_scores(&self, updates: &[ScoreUpdate]) -> EngramResult<()> {
        let mut data = self.lock()?;
        for update in updates {
            if let Some(node) = data.nodes.get_mut(&update.id) {
                node.decay = Some(update.decay);
                node.importance = Some(update.importance);
                node.archived = update.archived;
            }
        }
        Ok(())
    }

    async fn recent_nodes(&self, filter: &NodeFilter, limit: usize) -> EngramResult<Vec<Node>> {
        let data = self.lock()?;
        let mut nodes: Vec<&Node> = data
            .nodes
            .values()
            .filter(|n| {
                (filter.include_archived || !n.archived)
                    && filter.label.as_deref().map_or(true, |l| n.label == l)
                    && !filter.exclude_labels.iter().any(|l| n.label == *l)
            })
            .collect();
        nodes.sort_by(|a, b| b.updated_at_ms.cmp(&a.updated_at_ms).then(a.id.cmp(&b.id)));
        Ok(nodes.into_iter().take(limit).cloned().collect())
    }
}
