//! Retrieval request/response shapes and policy warnings.

use crate::llm::Intent;
use crate::store::ImportTrace;
use serde::{Deserialize, Serialize};

/// How much work retrieval is allowed to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    /// Minimal latency.
    Fast,
    /// The default trade-off.
    #[default]
    Balanced,
    /// Spend more for better context.
    Thorough,
}

/// Whether to favor answer quality or cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalPriority {
    /// Favor answer quality (default).
    #[default]
    Quality,
    /// Favor cost.
    Cheap,
}

/// A retrieval query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalRequest {
    /// The user's question or task description.
    pub query: String,
    /// The file the user is currently working in, if any; anchors the
    /// import-graph traversal.
    #[serde(default)]
    pub current_file: Option<String>,
    /// Work budget mode.
    #[serde(default)]
    pub mode: RetrievalMode,
    /// Cost/quality priority.
    #[serde(default)]
    pub priority: RetrievalPriority,
}

/// A file selected by import-graph traversal, with its selection score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedFile {
    /// The file path.
    pub path: String,
    /// Discovery-order score: the i-th unique file scores `1/(i+1)`.
    pub score: f64,
    /// Why this file was selected.
    pub reason: String,
}

/// Every selection decision retrieval made, independently inspectable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalTrace {
    /// The classified intent.
    pub intent: Intent,
    /// The raw traversal result.
    pub traversal: ImportTrace,
    /// The scored file selection derived from the traversal.
    pub selection: Vec<SelectedFile>,
}

/// The assembled retrieval answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Echo of the request mode.
    pub mode: RetrievalMode,
    /// Echo of the request priority.
    pub priority: RetrievalPriority,
    /// The model identifier chosen by the routing table.
    pub model: String,
    /// Token budget for the downstream answer step.
    pub token_budget: u32,
    /// Explainability trace.
    pub trace: RetrievalTrace,
    /// The assembled, ordered context pack.
    pub context_pack: String,
}

/// An advisory warning from the policy checker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyWarning {
    /// Warning kind, e.g. `negative_learning:revert`.
    pub kind: String,
    /// Human-readable message.
    pub message: String,
    /// Ids of the nodes this warning is based on.
    pub evidence: Vec<String>,
}
