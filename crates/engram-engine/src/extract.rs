//! Fact extractor: one raw event in, zero or more typed facts out.
//!
//! Structured event types are deterministic mappings. Free text delegates
//! entity extraction to the language model. Missing or malformed payload
//! fields yield fewer facts, never errors.

use engram_types::error::EngramResult;
use engram_types::event::{EventType, IngestEvent};
use engram_types::graph::{Fact, FactKind};
use engram_types::llm::LanguageModel;
use serde_json::json;

fn str_field(payload: &serde_json::Value, key: &str) -> String {
    payload
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

fn confidence_or(payload: &serde_json::Value, default: f64) -> f64 {
    payload
        .get("confidence")
        .and_then(|v| v.as_f64())
        .unwrap_or(default)
}

/// Convert one ingestion event into facts.
pub async fn extract_facts(
    model: &dyn LanguageModel,
    event: &IngestEvent,
) -> EngramResult<Vec<Fact>> {
    let payload = &event.payload;
    let mut facts = Vec::new();

    match event.event_type {
        EventType::Text => {
            let text = str_field(payload, "text");
            if text.trim().is_empty() {
                return Ok(facts);
            }
            for entity in model.extract_entities(&text).await? {
                facts.push(Fact {
                    kind: FactKind::TextEntity,
                    value: json!({"name": entity.name, "type": entity.entity_type}),
                    confidence: 0.7,
                });
            }
        }
        EventType::Decision => {
            facts.push(Fact {
                kind: FactKind::Decision,
                value: json!({
                    "what": str_field(payload, "what"),
                    "why": str_field(payload, "why"),
                    "when": payload.get("when").cloned().unwrap_or(serde_json::Value::Null),
                }),
                confidence: confidence_or(payload, 0.9),
            });
        }
        EventType::Preference => {
            facts.push(Fact {
                kind: FactKind::Preference,
                value: json!({
                    "name": str_field(payload, "name"),
                    "category": payload
                        .get("category")
                        .and_then(|v| v.as_str())
                        .unwrap_or("code_style"),
                }),
                confidence: confidence_or(payload, 0.8),
            });
        }
        EventType::Pattern => {
            facts.push(Fact {
                kind: FactKind::Pattern,
                value: json!({
                    "name": str_field(payload, "name"),
                    "type": payload
                        .get("type")
                        .and_then(|v| v.as_str())
                        .unwrap_or("pattern"),
                }),
                confidence: confidence_or(payload, 0.8),
            });
        }
        EventType::GitCommit => {
            facts.push(Fact {
                kind: FactKind::GitCommit,
                value: json!({
                    "hash": str_field(payload, "hash"),
                    "message": str_field(payload, "message"),
                }),
                confidence: 1.0,
            });
        }
        EventType::Revert => {
            facts.push(Fact {
                kind: FactKind::Revert,
                value: json!({
                    "hash": str_field(payload, "hash"),
                    "reason": str_field(payload, "reason"),
                }),
                confidence: 1.0,
            });
        }
        EventType::CodeIndex => {
            let imports = payload
                .get("imports")
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default();
            for import in imports {
                facts.push(Fact {
                    kind: FactKind::FileImport,
                    value: json!({
                        "from": str_field(&import, "from"),
                        "to": str_field(&import, "to"),
                    }),
                    confidence: 1.0,
                });
            }
        }
    }

    Ok(facts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_llm::MockModel;

    fn event(event_type: EventType, payload: serde_json::Value) -> IngestEvent {
        IngestEvent {
            event_type,
            source: "test".to_string(),
            payload,
        }
    }

    #[tokio::test]
    async fn test_text_delegates_to_model() {
        let facts = extract_facts(
            &MockModel::new(),
            &event(EventType::Text, json!({"text": "Alice uses Redis"})),
        )
        .await
        .unwrap();
        assert_eq!(facts.len(), 2);
        assert!(facts.iter().all(|f| f.kind == FactKind::TextEntity));
        assert!(facts.iter().all(|f| f.confidence == 0.7));
    }

    #[tokio::test]
    async fn test_empty_text_yields_no_facts() {
        let facts = extract_facts(
            &MockModel::new(),
            &event(EventType::Text, json!({"text": "   "})),
        )
        .await
        .unwrap();
        assert!(facts.is_empty());
    }

    #[tokio::test]
    async fn test_decision_confidence_default() {
        let facts = extract_facts(
            &MockModel::new(),
            &event(EventType::Decision, json!({"what": "ship it"})),
        )
        .await
        .unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].confidence, 0.9);

        let facts = extract_facts(
            &MockModel::new(),
            &event(
                EventType::Decision,
                json!({"what": "ship it", "confidence": 0.4}),
            ),
        )
        .await
        .unwrap();
        assert_eq!(facts[0].confidence, 0.4);
    }

    #[tokio::test]
    async fn test_code_index_fans_out() {
        let facts = extract_facts(
            &MockModel::new(),
            &event(
                EventType::CodeIndex,
                json!({"imports": [
                    {"from": "a.rs", "to": "b.rs"},
                    {"from": "a.rs", "to": "c.rs"},
                ]}),
            ),
        )
        .await
        .unwrap();
        assert_eq!(facts.len(), 2);
        assert!(facts.iter().all(|f| f.kind == FactKind::FileImport));
    }

    #[tokio::test]
    async fn test_malformed_payload_degrades() {
        let facts = extract_facts(
            &MockModel::new(),
            &event(EventType::CodeIndex, json!({"imports": "nope"})),
        )
        .await
        .unwrap();
        assert!(facts.is_empty());
    }
}
