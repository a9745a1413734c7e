//! The language-model contract.
//!
//! All natural-language understanding goes through this narrow trait:
//! entity extraction, answer generation, plan judging, and retrieval
//! intent classification. The engine never talks to a model any other way.

use crate::error::EngramResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An entity extracted from free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    /// Display name as mentioned in the text.
    pub name: String,
    /// Entity type (Person, Project, Tool, ...); "Entity" when unknown.
    #[serde(rename = "type", default = "default_entity_type")]
    pub entity_type: String,
}

fn default_entity_type() -> String {
    "Entity".to_string()
}

/// Retrieval intent: how far to traverse and how much context to spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    /// Import-graph traversal depth.
    #[serde(default = "default_hops")]
    pub hops: u32,
    /// Token budget for the assembled context pack.
    #[serde(default = "default_token_budget")]
    pub token_budget: u32,
}

fn default_hops() -> u32 {
    2
}

fn default_token_budget() -> u32 {
    1500
}

impl Default for Intent {
    fn default() -> Self {
        Self {
            hops: default_hops(),
            token_budget: default_token_budget(),
        }
    }
}

/// The language-model collaborator contract.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Extract entities explicitly mentioned in free text.
    async fn extract_entities(&self, text: &str) -> EngramResult<Vec<ExtractedEntity>>;

    /// Generate a chat answer for a system/user prompt pair.
    async fn chat(&self, system: &str, user: &str) -> EngramResult<String>;

    /// Judge whether an answer satisfies a goal given only the context.
    /// The first line of the verdict is `PASS` or `FAIL`.
    async fn judge(&self, goal: &str, answer: &str, context: &str) -> EngramResult<String>;

    /// Classify a retrieval query into an [`Intent`]. Absent fields in the
    /// model's response fall back to the defaults.
    async fn intent(&self, query: &str, current_file: Option<&str>) -> EngramResult<Intent>;
}
