//! Error types for Concierge

use thiserror::Error;

/// Main error type for the assistant backend
#[derive(Error, Debug)]
pub enum AssistantError {
    /// Graph store operation failed (connection or rejected query)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Chat model error
    #[error("Chat model error: {0}")]
    ChatModel(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AssistantError>;
