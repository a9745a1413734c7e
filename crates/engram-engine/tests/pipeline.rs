//! End-to-end engine tests over the in-process store and mock model.

use engram_engine::clock::FixedClock;
use engram_engine::Engine;
use engram_llm::MockModel;
use engram_store::MemoryGraph;
use engram_types::config::ModelRoutes;
use engram_types::event::{EventType, IngestEvent};
use engram_types::retrieval::{RetrievalMode, RetrievalPriority, RetrievalRequest};
use serde_json::json;
use std::sync::Arc;

const NOW: i64 = 1_754_000_000_000;

fn engine_at(now_ms: i64) -> Engine {
    Engine::new(
        Arc::new(MemoryGraph::new()),
        Arc::new(MockModel::new()),
        Arc::new(FixedClock(now_ms)),
        ModelRoutes::default(),
    )
}

fn event(event_type: EventType, payload: serde_json::Value) -> IngestEvent {
    IngestEvent {
        event_type,
        source: "test".to_string(),
        payload,
    }
}

#[tokio::test]
async fn test_ingest_writes_nodes_and_provenance() {
    let engine = engine_at(NOW);
    engine.init().await.unwrap();

    let report = engine
        .ingest(&event(
            EventType::Decision,
            json!({"what": "use sqlite", "why": "no ops burden"}),
        ))
        .await
        .unwrap();
    assert_eq!(report.facts.len(), 1);
    assert_eq!(report.nodes, 2); // decision + source

    let export = engine.export(100).await.unwrap();
    assert!(export.nodes.iter().any(|n| n.id == "decision:use sqlite"));
    assert!(export.nodes.iter().any(|n| n.id == "source:test"));
    assert!(export
        .edges
        .iter()
        .any(|e| e.label == "MENTIONED_IN" && e.from == "decision:use sqlite"));
}

#[tokio::test]
async fn test_reingest_is_idempotent() {
    let engine = engine_at(NOW);
    let decision = event(
        EventType::Decision,
        json!({"what": "use sqlite", "why": "no ops burden"}),
    );
    engine.ingest(&decision).await.unwrap();
    let once = engine.export(100).await.unwrap();
    engine.ingest(&decision).await.unwrap();
    let twice = engine.export(100).await.unwrap();
    assert_eq!(once.nodes.len(), twice.nodes.len());
    assert_eq!(once.edges.len(), twice.edges.len());
}

#[tokio::test]
async fn test_conflicting_reingest_mints_revision() {
    let engine = engine_at(NOW);
    engine
        .ingest(&event(
            EventType::Decision,
            json!({"what": "ship it", "why": "deadline"}),
        ))
        .await
        .unwrap();
    engine
        .ingest(&event(
            EventType::Decision,
            json!({"what": "ship it", "why": "customer request"}),
        ))
        .await
        .unwrap();

    let export = engine.export(100).await.unwrap();
    let revision_id = format!("decision:ship it::rev:{NOW}");
    let revision = export
        .nodes
        .iter()
        .find(|n| n.id == revision_id)
        .expect("revision node");
    assert_eq!(revision.props.get("base_id"), Some(&json!("decision:ship it")));
    assert_eq!(
        revision.props.get("why"),
        Some(&json!("customer request"))
    );

    // Original untouched.
    let original = export
        .nodes
        .iter()
        .find(|n| n.id == "decision:ship it")
        .expect("original node");
    assert_eq!(original.props.get("why"), Some(&json!("deadline")));

    assert!(export
        .edges
        .iter()
        .any(|e| e.label == "EVOLVED_FROM" && e.from == revision_id && e.to == "decision:ship it"));
}

#[tokio::test]
async fn test_related_to_connects_batch() {
    let engine = engine_at(NOW);
    engine
        .ingest(&event(
            EventType::CodeIndex,
            json!({"imports": [{"from": "main.rs", "to": "lib.rs"}]}),
        ))
        .await
        .unwrap();
    let export = engine.export(100).await.unwrap();
    assert!(export.edges.iter().any(|e| e.label == "IMPORTS"));
    assert!(export
        .edges
        .iter()
        .any(|e| e.label == "RELATED_TO"
            && e.props.get("reason") == Some(&json!("co_occurrence"))));
}

#[tokio::test]
async fn test_retrieve_uses_ingested_import_graph() {
    let engine = engine_at(NOW);
    engine
        .ingest(&event(
            EventType::CodeIndex,
            json!({"imports": [
                {"from": "main.rs", "to": "lib.rs"},
                {"from": "lib.rs", "to": "store.rs"},
            ]}),
        ))
        .await
        .unwrap();

    let result = engine
        .retrieve(&RetrievalRequest {
            query: "what does main depend on?".to_string(),
            current_file: Some("main.rs".to_string()),
            mode: RetrievalMode::Thorough,
            priority: RetrievalPriority::Quality,
        })
        .await
        .unwrap();

    assert_eq!(result.model, ModelRoutes::default().premium);
    let paths: Vec<&str> = result
        .trace
        .selection
        .iter()
        .map(|f| f.path.as_str())
        .collect();
    assert_eq!(paths, vec!["lib.rs", "store.rs"]);
    assert_eq!(result.trace.selection[0].score, 1.0);
    assert_eq!(result.trace.selection[1].score, 0.5);
    assert!(result.context_pack.contains("# related files"));
}

#[tokio::test]
async fn test_revert_feeds_policy_checker() {
    let engine = engine_at(NOW);
    engine
        .ingest(&event(
            EventType::Revert,
            json!({"hash": "abc123", "reason": "skip validation"}),
        ))
        .await
        .unwrap();

    let warnings = engine
        .plan_warnings("I will skip validation for speed")
        .await
        .unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].evidence.contains(&"negative:revert:abc123".to_string()));

    let clean = engine.plan_warnings("add an index").await.unwrap();
    assert!(clean.is_empty());
}

#[tokio::test]
async fn test_housekeeping_then_retrieval_hides_archived() {
    // Ingest with a clock 200 days in the past, then housekeep "today".
    let store: Arc<MemoryGraph> = Arc::new(MemoryGraph::new());
    let old_engine = Engine::new(
        store.clone(),
        Arc::new(MockModel::new()),
        Arc::new(FixedClock(NOW - 200 * 86_400_000)),
        ModelRoutes::default(),
    );
    old_engine
        .ingest(&event(
            EventType::Pattern,
            json!({"name": "god objects", "type": "anti_pattern"}),
        ))
        .await
        .unwrap();

    let fresh_engine = Engine::new(
        store,
        Arc::new(MockModel::new()),
        Arc::new(FixedClock(NOW)),
        ModelRoutes::default(),
    );
    let report = fresh_engine.housekeep(true).await.unwrap();
    assert!(report.archived >= 1);
    assert!(report.summaries >= 1);

    let context = fresh_engine.context(30).await.unwrap();
    assert!(!context.contains("god objects"));
    // The consolidation summary stands in for the archived cluster.
    assert!(context.contains("[Summary]"));
}
