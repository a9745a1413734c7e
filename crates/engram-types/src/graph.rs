//! Graph data model: facts, nodes, edges, and export shapes.
//!
//! Node and edge ids are deterministic functions of their canonical key
//! fields, so re-ingesting the same fact is an idempotent upsert.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Node labels used by the memory engine.
pub mod label {
    pub const ENTITY: &str = "Entity";
    pub const DECISION: &str = "Decision";
    pub const PREFERENCE: &str = "Preference";
    pub const PATTERN: &str = "Pattern";
    pub const FILE: &str = "File";
    pub const COMMIT: &str = "Commit";
    pub const NEGATIVE_SIGNAL: &str = "NegativeSignal";
    pub const SOURCE: &str = "Source";
    pub const SUMMARY: &str = "Summary";
}

/// Relation types used by the memory engine.
pub mod rel {
    pub const MENTIONED_IN: &str = "MENTIONED_IN";
    pub const RELATED_TO: &str = "RELATED_TO";
    pub const EVOLVED_FROM: &str = "EVOLVED_FROM";
    pub const IMPORTS: &str = "IMPORTS";
    pub const ABOUT: &str = "ABOUT";
    pub const SUMMARIZES: &str = "SUMMARIZES";
}

/// The kind of a fact extracted from one ingestion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
    /// An entity mentioned in free text.
    TextEntity,
    /// A recorded decision.
    Decision,
    /// A user/project preference.
    Preference,
    /// A coding pattern.
    Pattern,
    /// A file-imports-file relationship.
    FileImport,
    /// A git commit.
    GitCommit,
    /// A revert (negative-learning signal).
    Revert,
}

/// A typed, unpersisted extraction result from one ingestion event.
///
/// Facts are produced and consumed within a single ingestion call and are
/// never written to the store directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    /// What kind of fact this is.
    pub kind: FactKind,
    /// Kind-specific payload fields.
    pub value: serde_json::Value,
    /// Extraction confidence (0.0 - 1.0).
    pub confidence: f64,
}

/// A canonical graph node with deterministic id, provenance, and
/// housekeeping-maintained lifecycle scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Node label (e.g. "Decision", "Preference", "File").
    pub label: String,
    /// Canonical id, deterministic from label and key fields.
    pub id: String,
    /// Arbitrary properties.
    pub props: HashMap<String, serde_json::Value>,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f64,
    /// The ingestion source this node was last written by.
    pub source: String,
    /// Last update time, epoch milliseconds.
    #[serde(default)]
    pub updated_at_ms: i64,
    /// Recency discount factor, set by housekeeping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decay: Option<f64>,
    /// Composite value score, set by housekeeping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<f64>,
    /// Marked low-value by housekeeping; excluded from default retrieval.
    #[serde(default)]
    pub archived: bool,
}

impl Node {
    /// Create a node with no housekeeping scores.
    pub fn new(
        label: impl Into<String>,
        id: impl Into<String>,
        props: HashMap<String, serde_json::Value>,
        confidence: f64,
        source: impl Into<String>,
        updated_at_ms: i64,
    ) -> Self {
        Self {
            label: label.into(),
            id: id.into(),
            props,
            confidence,
            source: source.into(),
            updated_at_ms,
            decay: None,
            importance: None,
            archived: false,
        }
    }

    /// A string property, if present and non-empty.
    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
    }

    /// A numeric property, if present.
    pub fn prop_f64(&self, key: &str) -> Option<f64> {
        self.props.get(key).and_then(|v| v.as_f64())
    }

    /// Display title: first non-null of name/path/what/hash, falling back
    /// to the id.
    pub fn title(&self) -> &str {
        self.prop_str("name")
            .or_else(|| self.prop_str("path"))
            .or_else(|| self.prop_str("what"))
            .or_else(|| self.prop_str("hash"))
            .unwrap_or(&self.id)
    }

    /// Display detail: first non-null of why/reason.
    pub fn detail(&self) -> Option<&str> {
        self.prop_str("why").or_else(|| self.prop_str("reason"))
    }

    /// One snapshot line: `- [<label>] <title> — <detail> [src: <source>]`.
    /// Detail and source segments are omitted when absent.
    pub fn context_line(&self) -> String {
        let mut line = format!("- [{}] {}", self.label, self.title());
        if let Some(detail) = self.detail() {
            line.push_str(&format!(" — {detail}"));
        }
        if !self.source.is_empty() {
            line.push_str(&format!(" [src: {}]", self.source));
        }
        line
    }
}

/// A canonical, deduplicated typed relation between two node ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Deterministic id: `<src>::<rel>::<dst>`.
    pub id: String,
    /// Source node id.
    pub src: String,
    /// Relation type (e.g. "MENTIONED_IN", "IMPORTS").
    pub rel: String,
    /// Destination node id.
    pub dst: String,
    /// Arbitrary properties.
    pub props: HashMap<String, serde_json::Value>,
    /// The ingestion source this edge was written by.
    pub source: String,
    /// Creation time, epoch milliseconds.
    #[serde(default)]
    pub created_at_ms: i64,
}

impl Edge {
    /// Create an edge; the id is derived from `(src, rel, dst)`.
    pub fn new(
        src: impl Into<String>,
        rel: impl Into<String>,
        dst: impl Into<String>,
        props: HashMap<String, serde_json::Value>,
        source: impl Into<String>,
        created_at_ms: i64,
    ) -> Self {
        let src = src.into();
        let rel = rel.into();
        let dst = dst.into();
        Self {
            id: edge_id(&src, &rel, &dst),
            src,
            rel,
            dst,
            props,
            source: source.into(),
            created_at_ms,
        }
    }
}

/// Deterministic edge id for a `(src, rel, dst)` triple.
pub fn edge_id(src: &str, rel: &str, dst: &str) -> String {
    format!("{src}::{rel}::{dst}")
}

/// Canonicalize a key field: trim and collapse internal whitespace.
pub fn canon(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Deterministic node id: `<prefix>:<canonicalized, lower-cased name>`.
pub fn canon_id(prefix: &str, name: &str) -> String {
    format!("{prefix}:{}", canon(name).to_lowercase())
}

/// A node in the export wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportNode {
    /// Canonical node id.
    pub id: String,
    /// Display label (title), for rendering.
    pub label: String,
    /// Node label (kind).
    #[serde(rename = "type")]
    pub node_type: String,
    /// Full property map.
    pub props: HashMap<String, serde_json::Value>,
    /// Last update time, epoch milliseconds.
    pub updated_at_ms: i64,
}

/// An edge in the export wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportEdge {
    /// Deterministic edge id.
    pub id: String,
    /// Source node id.
    pub from: String,
    /// Destination node id.
    pub to: String,
    /// Relation type.
    pub label: String,
    /// Full property map.
    pub props: HashMap<String, serde_json::Value>,
    /// Creation time, epoch milliseconds.
    pub created_at_ms: i64,
}

/// A bounded export of the stored graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphExport {
    /// Exported nodes, most recently updated first.
    pub nodes: Vec<ExportNode>,
    /// Edges whose endpoints are both present in `nodes`.
    pub edges: Vec<ExportEdge>,
}

/// Report from a housekeeping run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HousekeepingReport {
    /// Number of nodes scored.
    pub scored: u64,
    /// Number of nodes now marked archived.
    pub archived: u64,
    /// Number of Summary nodes created or merged.
    pub summaries: u64,
    /// How long the run took.
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_id_deterministic() {
        let a = Edge::new("a", rel::IMPORTS, "b", HashMap::new(), "test", 0);
        let b = Edge::new("a", rel::IMPORTS, "b", HashMap::new(), "test", 99);
        assert_eq!(a.id, b.id);
        assert_eq!(a.id, "a::IMPORTS::b");
    }

    #[test]
    fn test_node_title_fallback_order() {
        let mut props = HashMap::new();
        props.insert("path".to_string(), serde_json::json!("src/lib.rs"));
        props.insert("hash".to_string(), serde_json::json!("abc123"));
        let node = Node::new(label::FILE, "file:src/lib.rs", props, 1.0, "test", 0);
        assert_eq!(node.title(), "src/lib.rs");

        let bare = Node::new(label::FILE, "file:x", HashMap::new(), 1.0, "test", 0);
        assert_eq!(bare.title(), "file:x");
    }

    #[test]
    fn test_canon_collapses_whitespace() {
        assert_eq!(canon("  ship   it\tnow "), "ship it now");
        assert_eq!(canon_id("decision", "  Ship   It "), "decision:ship it");
    }

    #[test]
    fn test_context_line_segments() {
        let mut props = HashMap::new();
        props.insert("what".to_string(), serde_json::json!("ship it"));
        props.insert("why".to_string(), serde_json::json!("deadline"));
        let node = Node::new(label::DECISION, "decision:ship it", props, 0.9, "cli", 0);
        assert_eq!(
            node.context_line(),
            "- [Decision] ship it — deadline [src: cli]"
        );
    }

    #[test]
    fn test_node_serialization_roundtrip() {
        let node = Node::new(
            label::DECISION,
            "decision:ship it",
            HashMap::from([("what".to_string(), serde_json::json!("ship it"))]),
            0.9,
            "cli",
            1_700_000_000_000,
        );
        let json = serde_json::to_string(&node).unwrap();
        assert!(!json.contains("decay"));
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "decision:ship it");
        assert!(!back.archived);
    }
}
