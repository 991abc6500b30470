//! Error types for SortKV
//!
//! Provides a unified error type for all fallible operations.
//!
//! Data absence and early scan termination are not errors; they are
//! reported through [`crate::engine::Status`]. Broken structural invariants
//! are not errors either: they panic.

use thiserror::Error;

/// Result type alias using SortKvError
pub type Result<T> = std::result::Result<T, SortKvError>;

/// Unified error type for SortKV operations
#[derive(Debug, Error)]
pub enum SortKvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Pool Errors
    // -------------------------------------------------------------------------
    #[error("Pool corruption detected: {0}")]
    Corruption(String),

    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<bincode::Error> for SortKvError {
    fn from(e: bincode::Error) -> Self {
        SortKvError::Serialization(e.to_string())
    }
}

impl SortKvError {
    /// Whether this error left the container exactly as it was before the call
    pub fn is_aborted(&self) -> bool {
        matches!(self, SortKvError::TransactionAborted(_))
    }
}
