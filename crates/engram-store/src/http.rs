//! Remote graph backend: a client for another Engram node's HTTP API.
//!
//! Supports the required store contract only. Traversal, conflict lookup,
//! and aggregate access are not available over the wire, so conflict
//! resolution, housekeeping, and policy checks degrade to empty results
//! when this backend is selected.

use async_trait::async_trait;
use engram_types::error::{EngramError, EngramResult};
use engram_types::graph::{Edge, GraphExport, Node};
use engram_types::llm::ExtractedEntity;
use engram_types::store::{GraphStore, StoreCapabilities};
use serde::Deserialize;
use std::time::Duration;

/// Request timeout for all remote calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for a remote Engram graph service.
pub struct HttpGraph {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGraph {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(resp: reqwest::Response) -> EngramResult<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(EngramError::Store(format!(
            "remote graph returned {status}: {body}"
        )))
    }
}

#[derive(Deserialize)]
struct ContextResponse {
    context: String,
}

#[async_trait]
impl GraphStore for HttpGraph {
    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::default()
    }

    async fn ensure_schema(&self) -> EngramResult<()> {
        let resp = self
            .client
            .post(self.url("/api/schema"))
            .send()
            .await
            .map_err(|e| EngramError::Network(e.to_string()))?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn upsert_entities(
        &self,
        entities: &[ExtractedEntity],
        source: &str,
    ) -> EngramResult<()> {
        let resp = self
            .client
            .post(self.url("/api/entities"))
            .json(&serde_json::json!({ "entities": entities, "source": source }))
            .send()
            .await
            .map_err(|e| EngramError::Network(e.to_string()))?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn fetch_context(&self, limit: usize) -> EngramResult<String> {
        let resp = self
            .client
            .get(self.url("/api/context"))
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(|e| EngramError::Network(e.to_string()))?;
        let body: ContextResponse = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| EngramError::Serialization(e.to_string()))?;
        Ok(body.context)
    }

    async fn upsert_nodes_edges(&self, nodes: &[Node], edges: &[Edge]) -> EngramResult<()> {
        let resp = self
            .client
            .post(self.url("/api/graph/batch"))
            .json(&serde_json::json!({ "nodes": nodes, "edges": edges }))
            .send()
            .await
            .map_err(|e| EngramError::Network(e.to_string()))?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn export_graph(&self, limit_nodes: usize) -> EngramResult<GraphExport> {
        let resp = self
            .client
            .get(self.url("/api/graph"))
            .query(&[("limit_nodes", limit_nodes)])
            .send()
            .await
            .map_err(|e| EngramError::Network(e.to_string()))?;
        Self::check(resp)
            .await?
            .json()
            .await
            .map_err(|e| EngramError::Serialization(e.to_string()))
    }
}
