//! Conflict resolver / versioner.
//!
//! Compares candidate nodes against stored nodes with the same id. A
//! key-field mismatch mints a revision node (`<id>::rev:<ms>`) that
//! replaces the candidate in the batch; edges are rewritten to point at
//! the revision and an EVOLVED_FROM edge records the lineage. The stored
//! original is never touched.
//!
//! This is a best-effort read-then-decide pass: two concurrent ingestions
//! of the same id can both miss the conflict and last-write-wins. That
//! gap is documented behavior, not something this module tries to hide.

use crate::clock::Clock;
use engram_types::error::EngramResult;
use engram_types::graph::{label, rel, Edge, Node};
use engram_types::store::GraphStore;
use serde_json::Value;
use std::collections::HashMap;
use tracing::info;

/// Fields whose disagreement constitutes a conflict, per label.
fn key_fields(node_label: &str) -> &'static [&'static str] {
    match node_label {
        label::DECISION => &["what", "why"],
        label::PREFERENCE => &["name", "category"],
        label::PATTERN => &["name", "type"],
        label::NEGATIVE_SIGNAL => &["kind", "hash", "reason"],
        label::COMMIT => &["hash", "message"],
        label::FILE => &["path"],
        _ => &["name", "path", "what"],
    }
}

/// A comparable string rendering of a prop value. Null and empty strings
/// count as absent: unknown data cannot conflict.
fn comparable(node: &Node, field: &str) -> Option<String> {
    match node.props.get(field)? {
        Value::Null => None,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        }
        other => Some(other.to_string()),
    }
}

/// True when any key field present on both sides disagrees.
fn conflicts(stored: &Node, candidate: &Node) -> bool {
    key_fields(&candidate.label).iter().any(|field| {
        match (comparable(stored, field), comparable(candidate, field)) {
            (Some(a), Some(b)) => a != b,
            _ => false,
        }
    })
}

/// Resolve conflicts for a candidate batch against the store.
///
/// Returns the rewritten batch. Callers must skip this pass when the
/// store lacks the `conflict_lookup` capability.
pub async fn resolve_conflicts(
    store: &dyn GraphStore,
    clock: &dyn Clock,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
) -> EngramResult<(Vec<Node>, Vec<Edge>)> {
    let ids: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
    let stored = store.get_nodes(&ids).await?;
    let stored_by_id: HashMap<&str, &Node> =
        stored.iter().map(|n| (n.id.as_str(), n)).collect();

    let now = clock.now_ms();
    let mut remap: HashMap<String, String> = HashMap::new();
    let mut out_nodes = Vec::with_capacity(nodes.len());
    let mut lineage_edges = Vec::new();

    for node in nodes {
        let Some(existing) = stored_by_id.get(node.id.as_str()).copied() else {
            out_nodes.push(node);
            continue;
        };
        if !conflicts(existing, &node) {
            out_nodes.push(node);
            continue;
        }

        let old_id = node.id.clone();
        let new_id = format!("{old_id}::rev:{now}");
        info!(id = %old_id, revision = %new_id, "key-field conflict, minting revision");

        let mut revision = node;
        revision.id = new_id.clone();
        revision
            .props
            .insert("base_id".to_string(), Value::String(old_id.clone()));
        lineage_edges.push(Edge::new(
            new_id.clone(),
            rel::EVOLVED_FROM,
            old_id.clone(),
            HashMap::from([(
                "reason".to_string(),
                Value::String("conflict_detected".to_string()),
            )]),
            revision.source.clone(),
            now,
        ));
        out_nodes.push(revision);
        remap.insert(old_id, new_id);
    }

    let mut out_edges: Vec<Edge> = edges
        .into_iter()
        .map(|edge| {
            if !remap.contains_key(&edge.src) && !remap.contains_key(&edge.dst) {
                return edge;
            }
            let src = remap.get(&edge.src).cloned().unwrap_or(edge.src);
            let dst = remap.get(&edge.dst).cloned().unwrap_or(edge.dst);
            // Regenerate the id from the rewritten endpoints.
            Edge::new(src, edge.rel, dst, edge.props, edge.source, edge.created_at_ms)
        })
        .collect();
    out_edges.extend(lineage_edges);

    Ok((out_nodes, out_edges))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use engram_store::MemoryGraph;
    use serde_json::json;

    fn decision(id: &str, what: &str, why: Option<&str>) -> Node {
        let mut props = HashMap::from([("what".to_string(), json!(what))]);
        if let Some(why) = why {
            props.insert("why".to_string(), json!(why));
        }
        Node::new(label::DECISION, id, props, 0.9, "cli", 1_000)
    }

    #[tokio::test]
    async fn test_conflict_mints_revision() {
        let store = MemoryGraph::new();
        store
            .upsert_nodes_edges(&[decision("decision:ship it", "ship it", Some("deadline"))], &[])
            .await
            .unwrap();

        let clock = FixedClock(1_700_000_000_000);
        let incoming = decision("decision:ship it", "ship it", Some("customer request"));
        let provenance = Edge::new(
            "decision:ship it",
            rel::MENTIONED_IN,
            "source:cli",
            HashMap::new(),
            "cli",
            1_000,
        );
        let (nodes, edges) =
            resolve_conflicts(&store, &clock, vec![incoming], vec![provenance])
                .await
                .unwrap();

        assert_eq!(nodes.len(), 1);
        let revision = &nodes[0];
        assert_eq!(revision.id, "decision:ship it::rev:1700000000000");
        assert_eq!(revision.prop_str("base_id"), Some("decision:ship it"));
        assert_eq!(revision.prop_str("why"), Some("customer request"));

        // The batch no longer writes to the original id.
        assert!(!nodes.iter().any(|n| n.id == "decision:ship it"));

        let evolved = edges
            .iter()
            .find(|e| e.rel == rel::EVOLVED_FROM)
            .expect("lineage edge");
        assert_eq!(evolved.src, revision.id);
        assert_eq!(evolved.dst, "decision:ship it");
        assert_eq!(evolved.props.get("reason"), Some(&json!("conflict_detected")));

        // The provenance edge was rewritten and its id regenerated.
        let mentioned = edges
            .iter()
            .find(|e| e.rel == rel::MENTIONED_IN)
            .expect("provenance edge");
        assert_eq!(mentioned.src, revision.id);
        assert_eq!(
            mentioned.id,
            format!("{}::MENTIONED_IN::source:cli", revision.id)
        );
    }

    #[tokio::test]
    async fn test_matching_node_passes_through() {
        let store = MemoryGraph::new();
        store
            .upsert_nodes_edges(&[decision("decision:ship it", "ship it", Some("deadline"))], &[])
            .await
            .unwrap();
        let clock = FixedClock(42);
        let incoming = decision("decision:ship it", "ship it", Some("deadline"));
        let (nodes, edges) = resolve_conflicts(&store, &clock, vec![incoming], vec![])
            .await
            .unwrap();
        assert_eq!(nodes[0].id, "decision:ship it");
        assert!(edges.is_empty());
    }

    #[tokio::test]
    async fn test_absent_fields_do_not_conflict() {
        let store = MemoryGraph::new();
        store
            .upsert_nodes_edges(&[decision("decision:ship it", "ship it", None)], &[])
            .await
            .unwrap();
        let clock = FixedClock(42);
        // Stored node has no `why`; incoming does. Unknown data cannot
        // conflict.
        let incoming = decision("decision:ship it", "ship it", Some("deadline"));
        let (nodes, _) = resolve_conflicts(&store, &clock, vec![incoming], vec![])
            .await
            .unwrap();
        assert_eq!(nodes[0].id, "decision:ship it");
    }

    #[tokio::test]
    async fn test_new_node_passes_through() {
        let store = MemoryGraph::new();
        let clock = FixedClock(42);
        let incoming = decision("decision:new", "new", Some("fresh"));
        let (nodes, _) = resolve_conflicts(&store, &clock, vec![incoming], vec![])
            .await
            .unwrap();
        assert_eq!(nodes[0].id, "decision:new");
        assert!(nodes[0].prop_str("base_id").is_none());
    }
}
