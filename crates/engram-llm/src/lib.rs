//! Language-model drivers for the Engram memory engine.
//!
//! Two implementations of the
//! [`LanguageModel`](engram_types::llm::LanguageModel) contract:
//! - [`OpenAiModel`]: any OpenAI-compatible chat completions endpoint.
//! - [`MockModel`]: deterministic stub so tests and demos run without
//!   network access or keys.
//!
//! Keys are never read from source or config files, only from the
//! environment.

pub mod mock;
pub mod openai;
mod parse;

pub use mock::MockModel;
pub use openai::OpenAiModel;

use engram_types::config::LlmConfig;
use engram_types::error::{EngramError, EngramResult};
use engram_types::llm::LanguageModel;
use std::sync::Arc;

/// Build the configured language-model driver.
pub fn build_model(config: &LlmConfig) -> EngramResult<Arc<dyn LanguageModel>> {
    if config.mock {
        return Ok(Arc::new(MockModel::new()));
    }
    let api_key = std::env::var(&config.api_key_env).map_err(|_| {
        EngramError::Config(format!(
            "{} is not set; set it or enable llm.mock",
            config.api_key_env
        ))
    })?;
    Ok(Arc::new(OpenAiModel::new(
        config.base_url.clone(),
        api_key,
        config.model.clone(),
    )))
}
