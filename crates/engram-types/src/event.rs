//! Ingestion event shapes.
//!
//! Events are transport-agnostic: the API and CLI both hand the same shape
//! to the engine.

use serde::{Deserialize, Serialize};

/// The type of a raw ingestion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Free text; entity extraction is delegated to the language model.
    Text,
    /// A decision, keyed by `what`.
    Decision,
    /// A preference, keyed by `category:name`.
    Preference,
    /// A coding pattern, keyed by `type:name`.
    Pattern,
    /// A git commit.
    GitCommit,
    /// A revert of a past commit (negative-learning signal).
    Revert,
    /// A code index delta: `{imports: [{from, to}, ...]}`.
    CodeIndex,
}

/// One raw ingestion event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestEvent {
    /// Event type; selects the payload interpretation.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Where this event came from (e.g. "cli", "api", a session id).
    #[serde(default = "default_source")]
    pub source: String,
    /// Type-specific payload. Malformed fields degrade to fewer facts,
    /// never to an error.
    #[serde(default)]
    pub payload: serde_json::Value,
}

fn default_source() -> String {
    "api".to_string()
}
