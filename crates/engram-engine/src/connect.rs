//! Connector: co-occurrence edges between facts that arrived together.
//!
//! Facts observed in the same ingestion event are related by locality if
//! nothing else; a RELATED_TO edge preserves that without claiming any
//! stronger semantics. Capped at the first 20 non-Source nodes so the
//! pair count stays O(20²) regardless of batch size.

use engram_types::graph::{label, rel, Edge, Node};
use std::collections::HashMap;

/// Maximum number of batch nodes considered for pairing.
const PAIR_CAP: usize = 20;

/// Build RELATED_TO edges for every unordered pair among the first
/// [`PAIR_CAP`] non-Source nodes, in batch order.
pub fn connect_batch(nodes: &[Node], source: &str, now_ms: i64) -> Vec<Edge> {
    let ids: Vec<&str> = nodes
        .iter()
        .filter(|n| n.label != label::SOURCE)
        .map(|n| n.id.as_str())
        .take(PAIR_CAP)
        .collect();

    let mut edges = Vec::new();
    for i in 0..ids.len() {
        for j in (i + 1)..ids.len() {
            edges.push(Edge::new(
                ids[i],
                rel::RELATED_TO,
                ids[j],
                HashMap::from([(
                    "reason".to_string(),
                    serde_json::Value::String("co_occurrence".to_string()),
                )]),
                source,
                now_ms,
            ));
        }
    }
    edges
}
