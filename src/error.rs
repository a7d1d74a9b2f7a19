//! Error types for flatdoc
//!
//! Provides a unified error type for all operations.
//!
//! "Not found" is never an error: lookups return `Ok(None)`.

use thiserror::Error;

/// Result type alias using FlatDocError
pub type Result<T> = std::result::Result<T, FlatDocError>;

/// Unified error type for flatdoc operations
#[derive(Debug, Error)]
pub enum FlatDocError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Collection '{collection}' is corrupt: {reason}")]
    Corruption { collection: String, reason: String },

    #[error("Invalid collection name: {0}")]
    InvalidCollectionName(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    // -------------------------------------------------------------------------
    // Query Errors
    // -------------------------------------------------------------------------
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    // -------------------------------------------------------------------------
    // Queue Errors
    // -------------------------------------------------------------------------
    #[error("Queue closed: {0}")]
    QueueClosed(String),

    #[error("Operation panicked on lane '{0}'")]
    OperationPanicked(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for FlatDocError {
    fn from(e: serde_json::Error) -> Self {
        FlatDocError::Serialization(e.to_string())
    }
}
