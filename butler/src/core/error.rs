//! Error types for the butler core.
//!
//! [`ButlerError`] is the top-level error; [`HandlerError`] is used for handler failures.

use storage::StorageError;
use thiserror::Error;

/// Top-level error (database, bot transport, LLM, handler, config, IO).
#[derive(Error, Debug)]
pub enum ButlerError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Bot error: {0}")]
    Bot(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for ButlerError {
    fn from(e: StorageError) -> Self {
        ButlerError::Database(e.to_string())
    }
}

/// Errors produced by handlers.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("No text in message")]
    NoText,

    #[error("Empty content")]
    EmptyContent,
}

/// Result type for core operations; uses [`ButlerError`].
pub type Result<T> = std::result::Result<T, ButlerError>;
