//! Retriever: traversal-scored, token-budgeted context assembly.
//!
//! Every selection decision lands in the returned trace so callers can
//! inspect why a file or memory made it into the pack.

use engram_types::config::ModelRoutes;
use engram_types::error::EngramResult;
use engram_types::graph::{label, Node};
use engram_types::llm::LanguageModel;
use engram_types::retrieval::{
    RetrievalMode, RetrievalPriority, RetrievalRequest, RetrievalResult, RetrievalTrace,
    SelectedFile,
};
use engram_types::store::{GraphStore, ImportTrace, NodeFilter};
use std::collections::HashSet;

/// Maximum traversal paths fetched from the store.
const TRAVERSAL_PATH_LIMIT: usize = 50;

/// Maximum files kept from the traversal.
const FILE_SELECTION_CAP: usize = 20;

/// Memory snapshot size.
const SNAPSHOT_LIMIT: usize = 30;

/// Negative-learning signals surfaced in the pack.
const NEGATIVE_LIMIT: usize = 10;

/// Answer a retrieval query: classify intent, traverse the import graph,
/// assemble the context pack, and route to a model.
pub async fn retrieve(
    store: &dyn GraphStore,
    model: &dyn LanguageModel,
    routes: &ModelRoutes,
    request: &RetrievalRequest,
) -> EngramResult<RetrievalResult> {
    let intent = model
        .intent(&request.query, request.current_file.as_deref())
        .await?;

    let caps = store.capabilities();
    let traversal = match request.current_file.as_deref() {
        Some(file) if caps.traversal => {
            store
                .traverse_imports(file, intent.hops, TRAVERSAL_PATH_LIMIT)
                .await?
        }
        Some(file) => ImportTrace::empty(file, intent.hops),
        None => ImportTrace::empty("", intent.hops),
    };
    let selection = select_files(&traversal);

    let (snapshot, negatives) = if caps.aggregates {
        let nodes = store
            .recent_nodes(&NodeFilter::excluding(&[label::SOURCE]), SNAPSHOT_LIMIT)
            .await?;
        let negatives = store
            .recent_nodes(&NodeFilter::label(label::NEGATIVE_SIGNAL), NEGATIVE_LIMIT)
            .await?;
        (render_snapshot(&nodes), negatives)
    } else {
        (store.fetch_context(SNAPSHOT_LIMIT).await?, Vec::new())
    };

    let context_pack = assemble_context_pack(&snapshot, &negatives, &selection);

    Ok(RetrievalResult {
        mode: request.mode,
        priority: request.priority,
        model: route_model(request.mode, request.priority, routes),
        token_budget: intent.token_budget,
        trace: RetrievalTrace {
            intent,
            traversal,
            selection,
        },
        context_pack,
    })
}

/// Flatten traversal paths into a first-seen-order selection, excluding
/// the start node. The i-th unique file scores `1/(i+1)`; scores are
/// monotone in discovery order so the first [`FILE_SELECTION_CAP`] files
/// are the top-scored ones.
pub fn select_files(trace: &ImportTrace) -> Vec<SelectedFile> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut selection = Vec::new();
    for path in trace.paths.iter().flatten() {
        if path == &trace.start || !seen.insert(path.as_str()) {
            continue;
        }
        selection.push(SelectedFile {
            path: path.clone(),
            score: 1.0 / (selection.len() + 1) as f64,
            reason: "import-graph".to_string(),
        });
        if selection.len() == FILE_SELECTION_CAP {
            break;
        }
    }
    selection
}

/// Render the recency snapshot, one line per node.
pub fn render_snapshot(nodes: &[Node]) -> String {
    nodes
        .iter()
        .map(|n| n.context_line())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Assemble the context pack in fixed section order: snapshot, negative
/// learnings (if any), related files (if any).
pub fn assemble_context_pack(
    snapshot: &str,
    negatives: &[Node],
    selection: &[SelectedFile],
) -> String {
    let mut pack = String::from("# brain snapshot\n");
    pack.push_str(if snapshot.is_empty() { "(empty)" } else { snapshot });

    if !negatives.is_empty() {
        pack.push_str("\n\n# negative learnings\n");
        let lines: Vec<String> = negatives
            .iter()
            .map(|n| {
                let reason = n.prop_str("reason").unwrap_or("(unspecified)");
                match n.prop_str("hash") {
                    Some(hash) => format!("- {reason} [commit: {hash}]"),
                    None => format!("- {reason}"),
                }
            })
            .collect();
        pack.push_str(&lines.join("\n"));
    }

    if !selection.is_empty() {
        pack.push_str("\n\n# related files\n");
        let lines: Vec<String> = selection
            .iter()
            .map(|f| format!("- {} [score: {:.2}]", f.path, f.score))
            .collect();
        pack.push_str(&lines.join("\n"));
    }

    pack
}

/// Explicit `(mode, priority)` routing table. Not a scoring function.
pub fn route_model(
    mode: RetrievalMode,
    priority: RetrievalPriority,
    routes: &ModelRoutes,
) -> String {
    match (mode, priority) {
        (RetrievalMode::Fast, RetrievalPriority::Cheap) => routes.cheap.clone(),
        (RetrievalMode::Fast, RetrievalPriority::Quality) => routes.standard.clone(),
        (RetrievalMode::Thorough, RetrievalPriority::Quality) => routes.premium.clone(),
        _ => routes.standard.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engram_llm::MockModel;
    use engram_store::MemoryGraph;
    use engram_types::graph::{canon_id, rel, Edge};
    use std::collections::HashMap;

    fn trace(start: &str, paths: &[&[&str]]) -> ImportTrace {
        ImportTrace {
            start: start.to_string(),
            hops: 2,
            paths: paths
                .iter()
                .map(|p| p.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn test_selection_scores_by_discovery_order() {
        let trace = trace("start.rs", &[&["start.rs", "a.rs", "b.rs"], &["start.rs", "c.rs"]]);
        let selection = select_files(&trace);
        assert_eq!(selection.len(), 3);
        assert_eq!(selection[0].path, "a.rs");
        assert_eq!(selection[0].score, 1.0);
        assert_eq!(selection[1].score, 0.5);
        assert!((selection[2].score - 1.0 / 3.0).abs() < 1e-9);
        assert!(selection.iter().all(|f| f.reason == "import-graph"));
    }

    #[test]
    fn test_selection_dedupes_and_caps() {
        let paths: Vec<Vec<String>> = (0..30)
            .map(|i| vec!["s".to_string(), format!("f{i}"), "shared".to_string()])
            .collect();
        let trace = ImportTrace {
            start: "s".to_string(),
            hops: 2,
            paths,
        };
        let selection = select_files(&trace);
        assert_eq!(selection.len(), FILE_SELECTION_CAP);
        let unique: HashSet<&str> = selection.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(unique.len(), FILE_SELECTION_CAP);
    }

    #[test]
    fn test_pack_sections_in_order() {
        let negative = Node::new(
            label::NEGATIVE_SIGNAL,
            "negative:revert:abc",
            HashMap::from([
                ("reason".to_string(), serde_json::json!("skip validation")),
                ("hash".to_string(), serde_json::json!("abc")),
            ]),
            1.0,
            "git",
            0,
        );
        let selection = vec![SelectedFile {
            path: "a.rs".to_string(),
            score: 1.0,
            reason: "import-graph".to_string(),
        }];
        let pack = assemble_context_pack("- [Decision] ship it", &[negative], &selection);
        let snapshot_at = pack.find("# brain snapshot").unwrap();
        let negatives_at = pack.find("# negative learnings").unwrap();
        let files_at = pack.find("# related files").unwrap();
        assert!(snapshot_at < negatives_at && negatives_at < files_at);
        assert!(pack.contains("- skip validation [commit: abc]"));
        assert!(pack.contains("- a.rs [score: 1.00]"));
    }

    #[test]
    fn test_empty_pack_has_placeholder() {
        let pack = assemble_context_pack("", &[], &[]);
        assert_eq!(pack, "# brain snapshot\n(empty)");
    }

    #[test]
    fn test_routing_table() {
        let routes = ModelRoutes::default();
        assert_eq!(
            route_model(RetrievalMode::Fast, RetrievalPriority::Cheap, &routes),
            routes.cheap
        );
        assert_eq!(
            route_model(RetrievalMode::Fast, RetrievalPriority::Quality, &routes),
            routes.standard
        );
        assert_eq!(
            route_model(RetrievalMode::Thorough, RetrievalPriority::Quality, &routes),
            routes.premium
        );
        assert_eq!(
            route_model(RetrievalMode::Balanced, RetrievalPriority::Cheap, &routes),
            routes.standard
        );
    }

    #[tokio::test]
    async fn test_retrieve_end_to_end() {
        let store = MemoryGraph::new();
        let file = |path: &str| {
            Node::new(
                label::FILE,
                canon_id("file", path),
                HashMap::from([("path".to_string(), serde_json::json!(path))]),
                1.0,
                "indexer",
                1_000,
            )
        };
        store
            .upsert_nodes_edges(
                &[file("main.rs"), file("lib.rs")],
                &[Edge::new(
                    canon_id("file", "main.rs"),
                    rel::IMPORTS,
                    canon_id("file", "lib.rs"),
                    HashMap::new(),
                    "indexer",
                    1_000,
                )],
            )
            .await
            .unwrap();

        let request = RetrievalRequest {
            query: "how is logging wired?".to_string(),
            current_file: Some("main.rs".to_string()),
            mode: RetrievalMode::Fast,
            priority: RetrievalPriority::Cheap,
        };
        let routes = ModelRoutes::default();
        let result = retrieve(&store, &MockModel::new(), &routes, &request)
            .await
            .unwrap();

        assert_eq!(result.model, routes.cheap);
        assert_eq!(result.token_budget, 1500);
        assert_eq!(result.trace.selection.len(), 1);
        assert_eq!(result.trace.selection[0].path, "lib.rs");
        assert!(result.context_pack.contains("# related files"));
        assert!(result.context_pack.contains("- lib.rs [score: 1.00]"));
    }

    #[tokio::test]
    async fn test_retrieve_without_anchor_file() {
        let store = MemoryGraph::new();
        let request = RetrievalRequest {
            query: "anything".to_string(),
            current_file: None,
            mode: RetrievalMode::Balanced,
            priority: RetrievalPriority::Quality,
        };
        let routes = ModelRoutes::default();
        let result = retrieve(&store, &MockModel::new(), &routes, &request)
            .await
            .unwrap();
        assert!(result.trace.traversal.paths.is_empty());
        assert!(result.trace.selection.is_empty());
        assert!(result.context_pack.starts_with("# brain snapshot\n(empty)"));
    }
}
