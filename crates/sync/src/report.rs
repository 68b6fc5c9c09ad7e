//! Sync outcome models.

use loanbook_core::registry::EntityType;
use serde::Serialize;

/// Per-record failure captured during a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailure {
    pub entity: EntityType,
    pub record_id: String,
    pub message: String,
}

/// Per-entity-type totals, reported in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityTypeReport {
    pub entity: EntityType,
    pub total: usize,
    pub synced: usize,
    pub failed: usize,
}

/// Aggregated outcome of one orchestrator invocation. Created fresh per
/// sync call; never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub success: bool,
    pub total_records: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub failures: Vec<SyncFailure>,
    pub breakdown: Vec<EntityTypeReport>,
}

/// Working-set record counts shown by the sync panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalDataCounts {
    pub clients: usize,
    pub loans: usize,
    pub loan_products: usize,
}
