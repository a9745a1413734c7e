//! Deterministic stub driver for tests and offline demos.

use async_trait::async_trait;
use engram_types::error::EngramResult;
use engram_types::llm::{ExtractedEntity, Intent, LanguageModel};
use std::collections::BTreeSet;

/// Deterministic mock language model. No network, no keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockModel;

impl MockModel {
    /// Create the mock driver.
    pub fn new() -> Self {
        Self
    }
}

const STRIP: &[char] = &['.', ',', '!', '?', '(', ')', '[', ']', '{', '}', '"', '\''];

#[async_trait]
impl LanguageModel for MockModel {
    /// Naive extraction: title-cased words become entities.
    async fn extract_entities(&self, text: &str) -> EngramResult<Vec<ExtractedEntity>> {
        let names: BTreeSet<&str> = text
            .split_whitespace()
            .map(|w| w.trim_matches(STRIP))
            .filter(|w| w.len() > 2 && w.chars().next().is_some_and(|c| c.is_uppercase()))
            .collect();
        let mut entities: Vec<ExtractedEntity> = names
            .into_iter()
            .map(|name| ExtractedEntity {
                name: name.to_string(),
                entity_type: "Entity".to_string(),
            })
            .collect();
        if entities.is_empty() {
            entities.push(ExtractedEntity {
                name: "Unknown".to_string(),
                entity_type: "Entity".to_string(),
            });
        }
        Ok(entities)
    }

    async fn chat(&self, _system: &str, user: &str) -> EngramResult<String> {
        Ok(format!("Mock response to: {user}"))
    }

    async fn judge(&self, _goal: &str, _answer: &str, _context: &str) -> EngramResult<String> {
        Ok("PASS\nNotes: mock judge; no factual verification performed.".to_string())
    }

    async fn intent(&self, _query: &str, _current_file: Option<&str>) -> EngramResult<Intent> {
        Ok(Intent::default())
    }
}
