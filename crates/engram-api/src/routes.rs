//! Request handlers.

use crate::error::ApiError;
use crate::state::ApiState;
use axum::extract::{Query, State};
use axum::Json;
use engram_engine::IngestReport;
use engram_types::event::IngestEvent;
use engram_types::graph::{Edge, GraphExport, HousekeepingReport, Node};
use engram_types::llm::ExtractedEntity;
use engram_types::retrieval::{RetrievalRequest, RetrievalResult};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct LimitQuery {
    #[serde(default = "default_context_limit")]
    pub limit: usize,
}

fn default_context_limit() -> usize {
    50
}

#[derive(Deserialize)]
pub struct ExportQuery {
    #[serde(default = "default_export_limit")]
    pub limit_nodes: usize,
}

fn default_export_limit() -> usize {
    1000
}

#[derive(Deserialize)]
pub struct ChatBody {
    pub text: String,
    #[serde(default = "default_chat_source")]
    pub source: String,
}

fn default_chat_source() -> String {
    "api".to_string()
}

#[derive(Deserialize)]
pub struct EntitiesBody {
    pub entities: Vec<ExtractedEntity>,
    pub source: String,
}

#[derive(Deserialize)]
pub struct BatchBody {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

#[derive(Deserialize)]
pub struct HousekeepBody {
    #[serde(default)]
    pub consolidate: bool,
}

#[derive(Deserialize)]
pub struct PlanBody {
    pub plan: String,
}

pub async fn health(State(state): State<ApiState>) -> Json<Value> {
    let caps = state.engine.store().capabilities();
    Json(json!({
        "ok": true,
        "version": env!("CARGO_PKG_VERSION"),
        "store": caps,
    }))
}

pub async fn ingest(
    State(state): State<ApiState>,
    Json(event): Json<IngestEvent>,
) -> Result<Json<IngestReport>, ApiError> {
    let request_id = Uuid::new_v4();
    info!(%request_id, source = %event.source, "ingest request");
    Ok(Json(state.engine.ingest(&event).await?))
}

pub async fn chat(
    State(state): State<ApiState>,
    Json(body): Json<ChatBody>,
) -> Result<Json<Value>, ApiError> {
    let outcome = state.engine.chat(&body.text, &body.source).await?;
    Ok(Json(serde_json::to_value(outcome).unwrap_or_default()))
}

pub async fn context(
    State(state): State<ApiState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Value>, ApiError> {
    let context = state.engine.context(query.limit).await?;
    Ok(Json(json!({ "context": context })))
}

pub async fn export_graph(
    State(state): State<ApiState>,
    Query(query): Query<ExportQuery>,
) -> Result<Json<GraphExport>, ApiError> {
    Ok(Json(state.engine.export(query.limit_nodes).await?))
}

pub async fn retrieve(
    State(state): State<ApiState>,
    Json(request): Json<RetrievalRequest>,
) -> Result<Json<RetrievalResult>, ApiError> {
    Ok(Json(state.engine.retrieve(&request).await?))
}

pub async fn housekeep(
    State(state): State<ApiState>,
    Json(body): Json<HousekeepBody>,
) -> Result<Json<HousekeepingReport>, ApiError> {
    Ok(Json(state.engine.housekeep(body.consolidate).await?))
}

pub async fn plan_check(
    State(state): State<ApiState>,
    Json(body): Json<PlanBody>,
) -> Result<Json<Value>, ApiError> {
    let warnings = state.engine.plan_warnings(&body.plan).await?;
    Ok(Json(json!({ "warnings": warnings })))
}

// -- Store passthrough endpoints, also consumed by the HTTP store backend
//    of peer Engram nodes. --

pub async fn ensure_schema(State(state): State<ApiState>) -> Result<Json<Value>, ApiError> {
    state.engine.init().await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn upsert_entities(
    State(state): State<ApiState>,
    Json(body): Json<EntitiesBody>,
) -> Result<Json<Value>, ApiError> {
    state
        .engine
        .store()
        .upsert_entities(&body.entities, &body.source)
        .await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn upsert_batch(
    State(state): State<ApiState>,
    Json(body): Json<BatchBody>,
) -> Result<Json<Value>, ApiError> {
    state
        .engine
        .store()
        .upsert_nodes_edges(&body.nodes, &body.edges)
        .await?;
    Ok(Json(json!({ "ok": true, "nodes": body.nodes.len(), "edges": body.edges.len() })))
}
