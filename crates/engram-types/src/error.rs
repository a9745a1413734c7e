//! Shared error types for the Engram system.

use thiserror::Error;

/// Top-level error type for the Engram system.
#[derive(Error, Debug)]
pub enum EngramError {
    /// A graph store operation failed.
    #[error("Store error: {0}")]
    Store(String),

    /// A language-model driver error occurred.
    #[error("LLM driver error: {0}")]
    Llm(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A network error occurred.
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid user input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Alias for Result with EngramError.
pub type EngramResult<T> = Result<T, EngramError>;
