//! Error types for the Helpdesk Assistant.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application, including configuration, I/O, LLM, retrieval, SQL,
//! prompt, and chat errors.

use thiserror::Error;

/// Unified error type for the Helpdesk Assistant.
///
/// All fallible functions in the application return `Result<T, AppError>`.
/// Collaborator failures (retrieval, SQL generation/execution, response
/// generation) are represented as values of this type at the collaborator
/// boundary; the orchestrator converts them into degraded answers instead of
/// letting them escape to the caller.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Response generator (LLM provider) errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Guide retrieval errors
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// SQL generation and execution errors
    #[error("SQL error: {0}")]
    Sql(String),

    /// Prompt assembly errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Orchestration and session errors
    #[error("Chat error: {0}")]
    Chat(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
