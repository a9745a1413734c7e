//! Housekeeper: decay/importance scoring, archival, and consolidation.
//!
//! Operates over the entire stored node population. The scoring phase is
//! idempotent and safe to re-run at any time; consolidation additionally
//! folds archived clusters into Summary nodes whose ids are deterministic
//! per `(label, year-month)`, so concurrent runs converge.

use crate::clock::Clock;
use chrono::DateTime;
use engram_types::error::EngramResult;
use engram_types::graph::{canon_id, label, rel, Edge, HousekeepingReport, Node};
use engram_types::store::{GraphStore, ScoreUpdate};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Instant;
use tracing::info;

/// Milliseconds per day.
const DAY_MS: f64 = 86_400_000.0;

/// Age past which nodes are archived regardless of other scores.
const MAX_AGE_DAYS: f64 = 180.0;

/// Largest cluster folded into one Summary node.
const CONSOLIDATION_GROUP_CAP: usize = 200;

/// Representative display names kept per Summary.
const SAMPLE_CAP: usize = 10;

/// Recency discount factor for a node of the given age.
pub fn decay_factor(age_days: f64) -> f64 {
    if age_days <= 7.0 {
        0.95
    } else if age_days <= 30.0 {
        0.80
    } else if age_days <= 90.0 {
        0.50
    } else {
        0.30
    }
}

/// Composite value score: recency, access, connectivity, confidence, and
/// explicit user signal, each weighted.
pub fn importance_score(
    decay: f64,
    access_count: f64,
    degree: u64,
    confidence: f64,
    user_signal: f64,
) -> f64 {
    let access = if access_count > 0.0 { 1.0 } else { 0.2 };
    let connectivity = if degree > 5 {
        1.0
    } else if degree > 0 {
        0.6
    } else {
        0.2
    };
    let signal = if user_signal > 0.0 { 1.0 } else { 0.2 };
    0.25 * decay + 0.20 * access + 0.20 * connectivity + 0.15 * confidence + 0.20 * signal
}

/// Whether a node should be archived. Source nodes never are.
pub fn should_archive(node_label: &str, confidence: f64, age_days: f64, importance: f64) -> bool {
    if node_label == label::SOURCE {
        return false;
    }
    confidence < 0.2 || age_days > MAX_AGE_DAYS || importance < 0.15
}

/// Run housekeeping: score every node, then optionally consolidate
/// archived clusters. Degrades to a no-op when the store has no
/// aggregate access.
pub async fn run(
    store: &dyn GraphStore,
    clock: &dyn Clock,
    consolidate: bool,
) -> EngramResult<HousekeepingReport> {
    let start = Instant::now();
    if !store.capabilities().aggregates {
        return Ok(HousekeepingReport {
            scored: 0,
            archived: 0,
            summaries: 0,
            duration_ms: start.elapsed().as_millis() as u64,
        });
    }

    let nodes = store.scan_nodes().await?;
    let ids: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
    let degrees = store.node_degrees(&ids).await?;
    let now = clock.now_ms();

    let mut updates = Vec::with_capacity(nodes.len());
    let mut archived_count = 0u64;
    for node in &nodes {
        let age_days = (now - node.updated_at_ms) as f64 / DAY_MS;
        let decay = decay_factor(age_days);
        let importance = importance_score(
            decay,
            node.prop_f64("access_count").unwrap_or(0.0),
            degrees.get(&node.id).copied().unwrap_or(0),
            node.confidence,
            node.prop_f64("user_signal").unwrap_or(0.0),
        );
        let archived = should_archive(&node.label, node.confidence, age_days, importance);
        if archived {
            archived_count += 1;
        }
        updates.push(ScoreUpdate {
            id: node.id.clone(),
            decay,
            importance,
            archived,
        });
    }
    store.apply_scores(&updates).await?;

    let summaries = if consolidate {
        consolidate_archived(store, &nodes, &updates, now).await?
    } else {
        0
    };

    let report = HousekeepingReport {
        scored: nodes.len() as u64,
        archived: archived_count,
        summaries,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        scored = report.scored,
        archived = report.archived,
        summaries = report.summaries,
        "housekeeping complete"
    );
    Ok(report)
}

/// Fold freshly archived non-Source nodes into Summary nodes grouped by
/// `(label, year-month)`. Summarized nodes are linked, never deleted.
async fn consolidate_archived(
    store: &dyn GraphStore,
    nodes: &[Node],
    updates: &[ScoreUpdate],
    now_ms: i64,
) -> EngramResult<u64> {
    let archived_ids: std::collections::HashSet<&str> = updates
        .iter()
        .filter(|u| u.archived)
        .map(|u| u.id.as_str())
        .collect();

    let mut groups: HashMap<(String, String), Vec<&Node>> = HashMap::new();
    for node in nodes {
        if node.label == label::SOURCE || !archived_ids.contains(node.id.as_str()) {
            continue;
        }
        let Some(ym) = year_month(node.updated_at_ms) else {
            continue;
        };
        groups.entry((node.label.clone(), ym)).or_default().push(node);
    }

    let mut summary_nodes = Vec::new();
    let mut summary_edges = Vec::new();
    for ((group_label, ym), mut members) in groups {
        members.sort_by(|a, b| b.updated_at_ms.cmp(&a.updated_at_ms).then(a.id.cmp(&b.id)));
        members.truncate(CONSOLIDATION_GROUP_CAP);

        let samples: Vec<Value> = members
            .iter()
            .take(SAMPLE_CAP)
            .map(|n| Value::String(n.title().to_string()))
            .collect();
        let summary_id = canon_id("summary", &format!("{group_label}:{ym}"));
        let mut summary = Node::new(
            label::SUMMARY,
            summary_id.clone(),
            HashMap::from([
                ("type".to_string(), json!(group_label)),
                ("ym".to_string(), json!(ym)),
                ("count".to_string(), json!(members.len())),
                ("samples".to_string(), Value::Array(samples)),
            ]),
            1.0,
            "housekeeping",
            now_ms,
        );
        summary.importance = Some(0.25);

        for member in &members {
            summary_edges.push(Edge::new(
                summary_id.clone(),
                rel::SUMMARIZES,
                member.id.clone(),
                HashMap::new(),
                "housekeeping",
                now_ms,
            ));
        }
        summary_nodes.push(summary);
    }

    let created = summary_nodes.len() as u64;
    if created > 0 {
        store.upsert_nodes_edges(&summary_nodes, &summary_edges).await?;
    }
    Ok(created)
}

/// `yyyy-mm` bucket of an epoch-millisecond timestamp.
fn year_month(ms: i64) -> Option<String> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.format("%Y-%m").to_string())
}
