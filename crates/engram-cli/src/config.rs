//! Configuration loading with defaults and environment overrides.
//!
//! Search order: explicit `--config` path, `./engram.toml`,
//! `~/.engram/config.toml`. A missing or unparsable file degrades to
//! defaults with a warning; it never aborts the process.

use engram_types::config::{EngramConfig, StoreBackend};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Load configuration, then apply environment overrides.
pub fn load_config(path: Option<&Path>) -> EngramConfig {
    let mut config = read_config_file(path);
    apply_env_overrides(&mut config);
    config
}

fn candidate_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    if let Some(path) = explicit {
        return vec![path.to_path_buf()];
    }
    let mut paths = vec![PathBuf::from("./engram.toml")];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".engram").join("config.toml"));
    }
    paths
}

fn read_config_file(explicit: Option<&Path>) -> EngramConfig {
    for path in candidate_paths(explicit) {
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<EngramConfig>(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "Loaded configuration");
                    return config;
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        path = %path.display(),
                        "Failed to parse config, using defaults"
                    );
                }
            },
            Err(e) => {
                warn!(
                    error = %e,
                    path = %path.display(),
                    "Failed to read config file, using defaults"
                );
            }
        }
    }
    EngramConfig::default()
}

fn apply_env_overrides(config: &mut EngramConfig) {
    if let Ok(backend) = std::env::var("ENGRAM_STORE_BACKEND") {
        match backend.as_str() {
            "memory" => config.store.backend = StoreBackend::Memory,
            "sqlite" => config.store.backend = StoreBackend::Sqlite,
            "http" => config.store.backend = StoreBackend::Http,
            other => warn!(backend = other, "Unknown ENGRAM_STORE_BACKEND, ignoring"),
        }
    }
    if let Ok(path) = std::env::var("ENGRAM_SQLITE_PATH") {
        config.store.sqlite_path = Some(PathBuf::from(path));
    }
    if let Ok(url) = std::env::var("ENGRAM_GRAPH_URL") {
        config.store.graph_url = Some(url);
    }
    if std::env::var("ENGRAM_MOCK_LLM").map(|v| v == "1").unwrap_or(false) {
        config.llm.mock = true;
    }
    if let Ok(model) = std::env::var("OPENAI_MODEL") {
        config.llm.model = model;
    }
    if let Ok(bind) = std::env::var("ENGRAM_BIND") {
        config.api.bind = bind;
    }
}
