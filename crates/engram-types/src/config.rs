//! Configuration types with defaults.
//!
//! Loaded from `engram.toml` (or `~/.engram/config.toml`) by the CLI;
//! every field has a default so a missing or partial file still boots.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which graph store backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// In-process, non-persistent. For tests and demos.
    Memory,
    /// Local SQLite file (default).
    #[default]
    Sqlite,
    /// Remote graph service over HTTP.
    Http,
}

/// Graph store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend selection.
    pub backend: StoreBackend,
    /// SQLite database path; defaults to `./engram_graph.sqlite`.
    pub sqlite_path: Option<PathBuf>,
    /// Base URL of the remote graph service (http backend).
    pub graph_url: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            sqlite_path: None,
            graph_url: None,
        }
    }
}

impl StoreConfig {
    /// The effective SQLite path.
    pub fn sqlite_path(&self) -> PathBuf {
        self.sqlite_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("./engram_graph.sqlite"))
    }
}

/// Language-model driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Use the deterministic mock driver (no network, no keys).
    pub mock: bool,
    /// Chat model for extraction/answer/judge calls.
    pub model: String,
    /// OpenAI-compatible API base URL.
    pub base_url: String,
    /// Environment variable holding the API key. Keys are never read from
    /// config files.
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            mock: false,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

/// Model identifiers for the retrieval routing table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelRoutes {
    /// Routed to by `(fast, cheap)`.
    pub cheap: String,
    /// The default route.
    pub standard: String,
    /// Routed to by `(thorough, quality)`.
    pub premium: String,
}

impl Default for ModelRoutes {
    fn default() -> Self {
        Self {
            cheap: "gpt-4o-mini".to_string(),
            standard: "gpt-4o".to_string(),
            premium: "o1".to_string(),
        }
    }
}

/// HTTP API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind address for the API server.
    pub bind: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7340".to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngramConfig {
    /// Graph store selection and paths.
    pub store: StoreConfig,
    /// Language-model driver.
    pub llm: LlmConfig,
    /// Retrieval model routing table.
    pub routes: ModelRoutes,
    /// API server.
    pub api: ApiConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngramConfig::default();
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.api.bind, "127.0.0.1:7340");
    }

    #[test]
    fn test_partial_toml() {
        let config: EngramConfig =
            toml::from_str("[store]\nbackend = \"memory\"\n").unwrap_or_default();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.routes.standard, "gpt-4o");
    }
}
