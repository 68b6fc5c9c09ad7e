//! Remote push synchronization for loanbook working data.
//!
//! The orchestrator merges the working dataset with any residual legacy
//! collections, then pushes records to the remote store one at a time, in
//! dependency order, aggregating per-record outcomes instead of aborting on
//! the first failure.

mod error;
mod orchestrator;
mod report;
mod writer;

pub use error::{Result, SyncError};
pub use orchestrator::SyncOrchestrator;
pub use report::{EntityTypeReport, LocalDataCounts, SyncFailure, SyncReport};
pub use writer::RemoteEntityWriter;
