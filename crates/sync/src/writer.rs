//! Remote-store collaborator contract.

use async_trait::async_trait;
use loanbook_core::registry::EntityType;
use serde_json::Value;

/// One writer per remotely synced entity type.
///
/// `create_or_update` pushes a single record and reports whether the remote
/// store accepted it. The orchestrator treats `Ok(false)` and `Err` the same
/// way: the record is recorded as failed and the batch continues.
#[async_trait]
pub trait RemoteEntityWriter: Send + Sync {
    fn entity(&self) -> EntityType;

    async fn create_or_update(&self, record: &Value) -> std::result::Result<bool, String>;
}
