//! HTTP API front door for the Engram memory engine.
//!
//! Thin handlers over [`engram_engine::Engine`]; all behavior lives in
//! the engine. CORS is permissive (the graph UI is served from anywhere)
//! and every operation is metered by a cost-aware GCRA rate limiter.

mod error;
pub mod rate_limiter;
mod routes;
mod state;

pub use state::ApiState;

use axum::routing::{get, post};
use axum::Router;
use engram_engine::Engine;
use engram_types::error::{EngramError, EngramResult};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the API router.
pub fn router(state: ApiState) -> Router {
    let limiter = rate_limiter::create_rate_limiter();
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/ingest", post(routes::ingest))
        .route("/api/chat", post(routes::chat))
        .route("/api/context", get(routes::context))
        .route("/api/graph", get(routes::export_graph))
        .route("/api/retrieve", post(routes::retrieve))
        .route("/api/housekeep", post(routes::housekeep))
        .route("/api/plan/check", post(routes::plan_check))
        .route("/api/schema", post(routes::ensure_schema))
        .route("/api/entities", post(routes::upsert_entities))
        .route("/api/graph/batch", post(routes::upsert_batch))
        .layer(axum::middleware::from_fn_with_state(
            limiter,
            rate_limiter::gcra_rate_limit,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API until the process is stopped.
pub async fn serve(engine: Engine, bind: &str) -> EngramResult<()> {
    engine.init().await?;
    let app = router(ApiState::new(engine));
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(EngramError::Io)?;
    info!(addr = %bind, "engram api listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(EngramError::Io)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use engram_engine::clock::FixedClock;
    use engram_llm::MockModel;
    use engram_store::MemoryGraph;
    use engram_types::config::ModelRoutes;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let engine = Engine::new(
            Arc::new(MemoryGraph::new()),
            Arc::new(MockModel::new()),
            Arc::new(FixedClock(1_754_000_000_000)),
            ModelRoutes::default(),
        );
        router(ApiState::new(engine))
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ingest_then_context() {
        let app = test_router();
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/ingest")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"type": "decision", "source": "test", "payload": {"what": "use axum"}}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/context?limit=10")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["context"].as_str().unwrap().contains("use axum"));
    }

    #[tokio::test]
    async fn test_plan_check_shape() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/plan/check")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"plan": "refactor the parser"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["warnings"].as_array().unwrap().is_empty());
    }
}
