//! Graph store backends for the Engram memory engine.
//!
//! Three interchangeable implementations of the
//! [`GraphStore`](engram_types::store::GraphStore) contract:
//! - [`MemoryGraph`]: in-process, non-persistent; full capabilities.
//! - [`SqliteGraph`]: local SQLite file; full capabilities.
//! - [`HttpGraph`]: client for a remote graph service; required
//!   capabilities only, so every optional feature degrades to empty.

pub mod http;
pub mod memory;
pub mod migration;
pub mod sqlite;
mod traverse;

pub use http::HttpGraph;
pub use memory::MemoryGraph;
pub use sqlite::SqliteGraph;

use engram_types::config::{StoreBackend, StoreConfig};
use engram_types::error::{EngramError, EngramResult};
use engram_types::store::GraphStore;
use std::sync::Arc;

/// Build the configured store backend.
pub fn build_store(config: &StoreConfig) -> EngramResult<Arc<dyn GraphStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryGraph::new())),
        StoreBackend::Sqlite => {
            let store = SqliteGraph::open(&config.sqlite_path())?;
            Ok(Arc::new(store))
        }
        StoreBackend::Http => {
            let url = config.graph_url.clone().ok_or_else(|| {
                EngramError::Config("http backend requires store.graph_url".to_string())
            })?;
            Ok(Arc::new(HttpGraph::new(url)))
        }
    }
}
