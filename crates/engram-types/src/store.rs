//! The graph store contract and its capability descriptor.
//!
//! Three interchangeable backends implement this trait (in-process memory,
//! SQLite, remote HTTP). Optional capabilities are declared up front by
//! [`StoreCapabilities`] rather than probed at runtime; callers branch on
//! the descriptor and the default method bodies return empty results.

use crate::error::EngramResult;
use crate::graph::{Edge, GraphExport, Node};
use crate::llm::ExtractedEntity;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What a store implementation supports beyond the required contract.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StoreCapabilities {
    /// Import-graph traversal (`traverse_imports`).
    pub traversal: bool,
    /// Batch node lookup by id (`get_nodes`); without it, conflict
    /// resolution is skipped entirely.
    pub conflict_lookup: bool,
    /// Raw aggregate access (`scan_nodes`, `node_degrees`, `apply_scores`,
    /// `recent_nodes`); used by the housekeeper and policy checker.
    pub aggregates: bool,
}

/// Filter for `recent_nodes` queries.
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    /// Only nodes with this label.
    pub label: Option<String>,
    /// Exclude nodes with these labels.
    pub exclude_labels: Vec<String>,
    /// Include archived nodes (excluded by default).
    pub include_archived: bool,
}

impl NodeFilter {
    /// Non-archived nodes of one label.
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    /// Non-archived nodes excluding the given labels.
    pub fn excluding(labels: &[&str]) -> Self {
        Self {
            exclude_labels: labels.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }
}

/// Housekeeping score write-back for one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreUpdate {
    /// The node to update.
    pub id: String,
    /// Recency discount factor.
    pub decay: f64,
    /// Composite value score.
    pub importance: f64,
    /// Whether the node is now archived.
    pub archived: bool,
}

/// Result of an import-graph traversal.
///
/// `paths` holds forward paths from the start file, each path a list of
/// file paths including the start node. Empty when traversal is
/// unsupported or the start node is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportTrace {
    /// The path traversal started from.
    pub start: String,
    /// Maximum hops requested.
    pub hops: u32,
    /// Discovered forward paths.
    pub paths: Vec<Vec<String>>,
}

impl ImportTrace {
    /// An empty trace for unsupported traversal or an absent start node.
    pub fn empty(start: impl Into<String>, hops: u32) -> Self {
        Self {
            start: start.into(),
            hops,
            paths: Vec::new(),
        }
    }
}

/// The persistence boundary for the memory engine.
///
/// All durable state lives behind this trait; engine components are
/// stateless transforms over batches passed to and from the store.
/// Upserts are idempotent by id.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// What this backend supports beyond the required contract.
    fn capabilities(&self) -> StoreCapabilities;

    /// Idempotent schema setup; a no-op is allowed.
    async fn ensure_schema(&self) -> EngramResult<()>;

    /// Upsert extracted entities with provenance (legacy chat path).
    async fn upsert_entities(
        &self,
        entities: &[ExtractedEntity],
        source: &str,
    ) -> EngramResult<()>;

    /// Human-readable recency snapshot of the brain.
    async fn fetch_context(&self, limit: usize) -> EngramResult<String>;

    /// Upsert a batch of canonical nodes and edges, idempotent by id.
    async fn upsert_nodes_edges(&self, nodes: &[Node], edges: &[Edge]) -> EngramResult<()>;

    /// Bounded export of the stored graph, most recently updated first.
    /// Edges with an endpoint outside the exported node set are dropped.
    async fn export_graph(&self, limit_nodes: usize) -> EngramResult<GraphExport>;

    // -- Optional: traversal --

    /// Forward paths through the `IMPORTS` graph from `start_path`, up to
    /// `hops` hops, at most `limit` paths. Must not raise when the start
    /// node is absent; returns an empty trace instead.
    async fn traverse_imports(
        &self,
        start_path: &str,
        hops: u32,
        limit: usize,
    ) -> EngramResult<ImportTrace> {
        let _ = limit;
        Ok(ImportTrace::empty(start_path, hops))
    }

    // -- Optional: conflict lookup --

    /// Fetch stored nodes by id; missing ids are simply absent from the
    /// result.
    async fn get_nodes(&self, ids: &[String]) -> EngramResult<Vec<Node>> {
        let _ = ids;
        Ok(Vec::new())
    }

    // -- Optional: raw aggregate access --

    /// Every stored node. Housekeeping operates over the full population.
    async fn scan_nodes(&self) -> EngramResult<Vec<Node>> {
        Ok(Vec::new())
    }

    /// Incident-edge counts for the given node ids.
    async fn node_degrees(&self, ids: &[String]) -> EngramResult<HashMap<String, u64>> {
        let _ = ids;
        Ok(HashMap::new())
    }

    /// Bulk write-back of housekeeping scores.
    async fn apply_scores(&self, updates: &[ScoreUpdate]) -> EngramResult<()> {
        let _ = updates;
        Ok(())
    }

    /// Recent nodes matching a filter, ordered by `updated_at_ms`
    /// descending.
    async fn recent_nodes(&self, filter: &NodeFilter, limit: usize) -> EngramResult<Vec<Node>> {
        let _ = (filter, limit);
        Ok(Vec::new())
    }
}
