//! Error types shared across the loanbook crates.

use thiserror::Error;

use crate::storage::StoreError;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the persistence engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Local key-value store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// JSON serialization/deserialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot bundle has an unexpected shape
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Backup cycle failed after quota recovery
    #[error("backup failed: {0}")]
    Backup(String),
}

impl Error {
    /// Create an invalid-snapshot error
    pub fn invalid_snapshot(message: impl Into<String>) -> Self {
        Self::InvalidSnapshot(message.into())
    }

    /// Create a backup error
    pub fn backup(message: impl Into<String>) -> Self {
        Self::Backup(message.into())
    }
}
