//! OpenAI-compatible chat completions driver.

use async_trait::async_trait;
use engram_types::error::{EngramError, EngramResult};
use engram_types::llm::{ExtractedEntity, Intent, LanguageModel};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::parse::{parse_entity_lines, parse_intent};

/// Request timeout for completion calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const EXTRACT_SYSTEM: &str = "You extract entities from text for a personal assistant memory \
graph. Return a bullet list; each line: '- <name> (<type>)'. Types: Person, Project, Goal, \
Task, Tool, Org, Place. Only include entities explicitly mentioned.";

const JUDGE_SYSTEM: &str = "You are a strict verifier. Decide if the ANSWER satisfies the GOAL \
using only CONTEXT. Output exactly: PASS or FAIL on first line. Then short notes. If FAIL, \
list what to fix.";

const INTENT_SYSTEM: &str = "You classify retrieval queries for a memory engine. Given the \
query and the file the user is working in (if any), answer with a JSON object \
{\"hops\": <1-4>, \"token_budget\": <500-4000>}: deeper hops for questions about code \
structure, larger budgets for broad questions. Output only the JSON object.";

/// Driver for any OpenAI-compatible chat completions endpoint.
pub struct OpenAiModel {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl OpenAiModel {
    /// Create a driver for `base_url` using `model`.
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }

    async fn complete(&self, system: &str, user: &str) -> EngramResult<String> {
        debug!(model = %self.model, "chat completion request");
        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": system},
                    {"role": "user", "content": user},
                ],
            }))
            .send()
            .await
            .map_err(|e| EngramError::Llm(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EngramError::Llm(format!(
                "chat completion returned {status}: {body}"
            )));
        }

        let body: ChatResponse = resp
            .json()
            .await
            .map_err(|e| EngramError::Llm(e.to_string()))?;
        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    async fn extract_entities(&self, text: &str) -> EngramResult<Vec<ExtractedEntity>> {
        let out = self.complete(EXTRACT_SYSTEM, text).await?;
        Ok(parse_entity_lines(&out))
    }

    async fn chat(&self, system: &str, user: &str) -> EngramResult<String> {
        self.complete(system, user).await
    }

    async fn judge(&self, goal: &str, answer: &str, context: &str) -> EngramResult<String> {
        self.complete(
            JUDGE_SYSTEM,
            &format!("GOAL:\n{goal}\n\nCONTEXT:\n{context}\n\nANSWER:\n{answer}\n"),
        )
        .await
    }

    async fn intent(&self, query: &str, current_file: Option<&str>) -> EngramResult<Intent> {
        let user = match current_file {
            Some(file) => format!("QUERY: {query}\nCURRENT FILE: {file}"),
            None => format!("QUERY: {query}"),
        };
        let out = self.complete(INTENT_SYSTEM, &user).await?;
        Ok(parse_intent(&out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized() {
        let model = OpenAiModel::new(
            "https://api.openai.com/v1/".to_string(),
            "sk-test".to_string(),
            "gpt-4o-mini".to_string(),
        );
        assert_eq!(model.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn test_chat_response_shape() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "hi"}}]}"#,
        )
        .unwrap();
        assert_eq!(body.choices[0].message.content.as_deref(), Some("hi"));
    }
}
