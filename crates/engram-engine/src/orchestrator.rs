//! Chat orchestration: extract, remember, answer, judge.

use engram_types::error::EngramResult;
use engram_types::llm::{ExtractedEntity, LanguageModel};
use engram_types::store::GraphStore;
use serde::{Deserialize, Serialize};
use tracing::debug;

const ORCH_SYSTEM: &str = "You are an orchestrator. You MUST:\n\
- use the provided CONTEXT (graph memory) and user message\n\
- produce a friendly concise answer\n\
- do not invent facts not in CONTEXT; if missing, ask one clarifying question.\n";

const JUDGE_GOAL: &str = "Respond to the user without hallucinating; be helpful.";

/// Snapshot size fed to the answer model.
const CONTEXT_LIMIT: usize = 30;

/// The result of one chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOutcome {
    /// Entities extracted from the user message.
    pub entities: Vec<ExtractedEntity>,
    /// The context pack the answer was grounded in.
    pub context: String,
    /// The generated answer.
    pub answer: String,
    /// The judge's verdict (`PASS`/`FAIL` plus notes).
    pub judge: String,
}

/// Handle one chat message: write what was learned, answer from memory,
/// judge the answer.
pub async fn handle(
    store: &dyn GraphStore,
    model: &dyn LanguageModel,
    text: &str,
    source: &str,
) -> EngramResult<ChatOutcome> {
    let entities = model.extract_entities(text).await?;
    debug!(count = entities.len(), source, "extracted entities");
    store.upsert_entities(&entities, source).await?;

    let context = store.fetch_context(CONTEXT_LIMIT).await?;
    let answer = model
        .chat(&format!("{ORCH_SYSTEM}\nCONTEXT:\n{context}"), text)
        .await?;
    let judge = model.judge(JUDGE_GOAL, &answer, &context).await?;

    Ok(ChatOutcome {
        entities,
        context,
        answer,
        judge,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_llm::MockModel;
    use engram_store::MemoryGraph;

    #[tokio::test]
    async fn test_chat_round_trip() {
        let store = MemoryGraph::new();
        let outcome = handle(&store, &MockModel::new(), "Alice works on Engram", "chat")
            .await
            .unwrap();
        assert!(outcome.entities.iter().any(|e| e.name == "Alice"));
        assert!(outcome.judge.starts_with("PASS"));

        // The entities are now part of memory for the next turn.
        let context = store.fetch_context(10).await.unwrap();
        assert!(context.contains("Alice"));
    }
}
