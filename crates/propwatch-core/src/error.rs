//! Error types for propwatch.

use thiserror::Error;

/// Result type alias using propwatch's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for propwatch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error). A failure here
    /// aborts the current change event; partial writes are rolled back.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Change set not found
    #[error("Change set not found: {0}")]
    ChangeSetNotFound(uuid::Uuid),

    /// Watch group not found
    #[error("Watch group not found: {0}")]
    GroupNotFound(uuid::Uuid),

    /// Mail dispatch failed (per-member, isolated)
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// User directory read or attribute write failed
    #[error("Directory error: {0}")]
    Directory(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
