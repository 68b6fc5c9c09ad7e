//! Error types for the sync crate.

use thiserror::Error;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while orchestrating a sync run.
///
/// Per-record remote failures are not errors at this level; they are
/// captured inside the [`SyncReport`](crate::SyncReport).
#[derive(Debug, Error)]
pub enum SyncError {
    /// A sync run is already in flight; the new trigger is dropped.
    #[error("sync already in progress")]
    InFlight,

    /// No writer registered for an entity type in the sync order.
    #[error("no remote writer registered for '{0}'")]
    MissingWriter(&'static str),
}
