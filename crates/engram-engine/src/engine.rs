//! The engine context: store, model, clock, and routing table wired
//! together once at startup and passed to every request handler.

use crate::clock::Clock;
use crate::connect::connect_batch;
use crate::conflict::resolve_conflicts;
use crate::extract::extract_facts;
use crate::housekeep;
use crate::normalize::normalize_facts;
use crate::orchestrator::{self, ChatOutcome};
use crate::policy;
use crate::retrieve;
use engram_types::config::ModelRoutes;
use engram_types::error::EngramResult;
use engram_types::event::IngestEvent;
use engram_types::graph::{Fact, GraphExport, HousekeepingReport};
use engram_types::llm::LanguageModel;
use engram_types::retrieval::{PolicyWarning, RetrievalRequest, RetrievalResult};
use engram_types::store::GraphStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// What one ingestion wrote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    /// The facts the event yielded.
    pub facts: Vec<Fact>,
    /// Nodes upserted.
    pub nodes: usize,
    /// Edges upserted.
    pub edges: usize,
}

/// The memory engine: stateless transforms over one store/model pair.
///
/// Built once at startup; holds no request state. Clone-cheap via `Arc`s.
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn GraphStore>,
    model: Arc<dyn LanguageModel>,
    clock: Arc<dyn Clock>,
    routes: ModelRoutes,
}

impl Engine {
    /// Wire an engine from its collaborators.
    pub fn new(
        store: Arc<dyn GraphStore>,
        model: Arc<dyn LanguageModel>,
        clock: Arc<dyn Clock>,
        routes: ModelRoutes,
    ) -> Self {
        Self {
            store,
            model,
            clock,
            routes,
        }
    }

    /// The underlying store handle.
    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Idempotent schema setup.
    pub async fn init(&self) -> EngramResult<()> {
        self.store.ensure_schema().await
    }

    /// Ingest one event: extract, normalize, connect, version, write.
    ///
    /// Nothing is written unless the whole pipeline succeeds; there is no
    /// partial commit at the engine level.
    pub async fn ingest(&self, event: &IngestEvent) -> EngramResult<IngestReport> {
        let facts = extract_facts(self.model.as_ref(), event).await?;
        let now = self.clock.now_ms();

        let (nodes, mut edges) = normalize_facts(&facts, &event.source, now);
        edges.extend(connect_batch(&nodes, &event.source, now));

        let (nodes, edges) = if self.store.capabilities().conflict_lookup {
            resolve_conflicts(self.store.as_ref(), self.clock.as_ref(), nodes, edges).await?
        } else {
            (nodes, edges)
        };

        self.store.upsert_nodes_edges(&nodes, &edges).await?;
        info!(
            source = %event.source,
            facts = facts.len(),
            nodes = nodes.len(),
            edges = edges.len(),
            "ingested event"
        );
        Ok(IngestReport {
            facts,
            nodes: nodes.len(),
            edges: edges.len(),
        })
    }

    /// Handle one chat message through the orchestrator.
    pub async fn chat(&self, text: &str, source: &str) -> EngramResult<ChatOutcome> {
        orchestrator::handle(self.store.as_ref(), self.model.as_ref(), text, source).await
    }

    /// Answer a retrieval query.
    pub async fn retrieve(&self, request: &RetrievalRequest) -> EngramResult<RetrievalResult> {
        retrieve::retrieve(
            self.store.as_ref(),
            self.model.as_ref(),
            &self.routes,
            request,
        )
        .await
    }

    /// Run housekeeping over the full node population.
    pub async fn housekeep(&self, consolidate: bool) -> EngramResult<HousekeepingReport> {
        housekeep::run(self.store.as_ref(), self.clock.as_ref(), consolidate).await
    }

    /// Match a proposed plan against stored negative-learning signals.
    pub async fn plan_warnings(&self, plan: &str) -> EngramResult<Vec<PolicyWarning>> {
        policy::warnings_for_plan(self.store.as_ref(), plan).await
    }

    /// Human-readable recency snapshot.
    pub async fn context(&self, limit: usize) -> EngramResult<String> {
        self.store.fetch_context(limit).await
    }

    /// Bounded graph export.
    pub async fn export(&self, limit_nodes: usize) -> EngramResult<GraphExport> {
        self.store.export_graph(limit_nodes).await
    }
}
