//! Normalizer: facts in, canonical nodes/edges out.
//!
//! Ids are deterministic functions of the label and canonicalized key
//! fields, so normalizing the same fact twice yields identical ids and
//! the store-level upsert stays idempotent. Every non-Source node gets a
//! MENTIONED_IN provenance edge to the batch's Source node.

use engram_types::graph::{canon, canon_id, label, rel, Edge, Fact, FactKind, Node};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// A non-empty string field of a fact value, canonicalized. Missing,
/// null, or empty fields are absent, never errors.
fn field(value: &Value, key: &str) -> Option<String> {
    let s = canon(value.get(key)?.as_str()?);
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn props(pairs: &[(&str, Option<String>)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .filter_map(|(k, v)| v.as_ref().map(|v| (k.to_string(), Value::String(v.clone()))))
        .collect()
}

/// Convert a batch of facts into deduplicated canonical nodes and edges.
pub fn normalize_facts(facts: &[Fact], source: &str, now_ms: i64) -> (Vec<Node>, Vec<Edge>) {
    let mut nodes: Vec<Node> = Vec::new();
    let mut edges: Vec<Edge> = Vec::new();

    for fact in facts {
        let v = &fact.value;
        match fact.kind {
            FactKind::TextEntity => {
                let Some(name) = field(v, "name") else {
                    continue;
                };
                let entity_type = field(v, "type").unwrap_or_else(|| "Entity".to_string());
                nodes.push(Node::new(
                    label::ENTITY,
                    canon_id("entity", &name),
                    props(&[
                        ("name", Some(name)),
                        ("type", Some(entity_type)),
                    ]),
                    fact.confidence,
                    source,
                    now_ms,
                ));
            }
            FactKind::Decision => {
                let Some(what) = field(v, "what") else {
                    continue;
                };
                let mut p = props(&[
                    ("what", Some(what.clone())),
                    ("why", field(v, "why")),
                ]);
                if let Some(when) = v.get("when").filter(|w| !w.is_null()) {
                    p.insert("when".to_string(), when.clone());
                }
                nodes.push(Node::new(
                    label::DECISION,
                    canon_id("decision", &what),
                    p,
                    fact.confidence,
                    source,
                    now_ms,
                ));
            }
            FactKind::Preference => {
                let Some(name) = field(v, "name") else {
                    continue;
                };
                let category = field(v, "category").unwrap_or_else(|| "code_style".to_string());
                nodes.push(Node::new(
                    label::PREFERENCE,
                    canon_id("pref", &format!("{category}:{name}")),
                    props(&[("name", Some(name)), ("category", Some(category))]),
                    fact.confidence,
                    source,
                    now_ms,
                ));
            }
            FactKind::Pattern => {
                let Some(name) = field(v, "name") else {
                    continue;
                };
                let ptype = field(v, "type").unwrap_or_else(|| "pattern".to_string());
                nodes.push(Node::new(
                    label::PATTERN,
                    canon_id("pattern", &format!("{ptype}:{name}")),
                    props(&[("name", Some(name)), ("type", Some(ptype))]),
                    fact.confidence,
                    source,
                    now_ms,
                ));
            }
            FactKind::FileImport => {
                let (Some(from), Some(to)) = (field(v, "from"), field(v, "to")) else {
                    continue;
                };
                let from_id = canon_id("file", &from);
                let to_id = canon_id("file", &to);
                nodes.push(Node::new(
                    label::FILE,
                    from_id.clone(),
                    props(&[("path", Some(from))]),
                    fact.confidence,
                    source,
                    now_ms,
                ));
                nodes.push(Node::new(
                    label::FILE,
                    to_id.clone(),
                    props(&[("path", Some(to))]),
                    fact.confidence,
                    source,
                    now_ms,
                ));
                edges.push(Edge::new(
                    from_id,
                    rel::IMPORTS,
                    to_id,
                    HashMap::new(),
                    source,
                    now_ms,
                ));
            }
            FactKind::GitCommit => {
                let Some(hash) = field(v, "hash") else {
                    continue;
                };
                nodes.push(Node::new(
                    label::COMMIT,
                    canon_id("commit", &hash),
                    props(&[("hash", Some(hash)), ("message", field(v, "message"))]),
                    fact.confidence,
                    source,
                    now_ms,
                ));
            }
            FactKind::Revert => {
                let Some(hash) = field(v, "hash") else {
                    continue;
                };
                let commit_id = canon_id("commit", &hash);
                nodes.push(Node::new(
                    label::COMMIT,
                    commit_id.clone(),
                    props(&[("hash", Some(hash.clone()))]),
                    fact.confidence,
                    source,
                    now_ms,
                ));
                let signal_id = canon_id("negative", &format!("revert:{hash}"));
                nodes.push(Node::new(
                    label::NEGATIVE_SIGNAL,
                    signal_id.clone(),
                    props(&[
                        ("kind", Some("revert".to_string())),
                        ("hash", Some(hash)),
                        ("reason", field(v, "reason")),
                    ]),
                    fact.confidence,
                    source,
                    now_ms,
                ));
                edges.push(Edge::new(
                    signal_id,
                    rel::ABOUT,
                    commit_id,
                    HashMap::new(),
                    source,
                    now_ms,
                ));
            }
        }
    }

    // Provenance: the Source node always exists, and every other node in
    // the batch is linked to it.
    let source_id = format!("source:{source}");
    nodes.push(Node::new(
        label::SOURCE,
        source_id.clone(),
        HashMap::from([("id".to_string(), Value::String(source.to_string()))]),
        1.0,
        source,
        now_ms,
    ));
    let mut linked: HashSet<String> = HashSet::new();
    for node in &nodes {
        if node.id == source_id || !linked.insert(node.id.clone()) {
            continue;
        }
        edges.push(Edge::new(
            node.id.clone(),
            rel::MENTIONED_IN,
            source_id.clone(),
            HashMap::new(),
            source,
            now_ms,
        ));
    }

    (dedup_nodes(nodes), dedup_edges(edges))
}

/// Merge nodes by `(label, id)` preserving batch order: later occurrences
/// override props per key and confidence becomes the maximum seen.
fn dedup_nodes(nodes: Vec<Node>) -> Vec<Node> {
    let mut merged: Vec<Node> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    for node in nodes {
        let key = (node.label.clone(), node.id.clone());
        match index.get(&key) {
            Some(&i) => {
                let kept = &mut merged[i];
                for (k, v) in node.props {
                    if !v.is_null() {
                        kept.props.insert(k, v);
                    }
                }
                kept.confidence = kept.confidence.max(node.confidence);
            }
            None => {
                index.insert(key, merged.len());
                merged.push(node);
            }
        }
    }
    merged
}

/// De-duplicate edges by `(src, rel, dst)`, first occurrence wins.
fn dedup_edges(edges: Vec<Edge>) -> Vec<Edge> {
    let mut seen: HashSet<String> = HashSet::new();
    edges.into_iter().filter(|e| seen.insert(e.id.clone())).collect()
}
