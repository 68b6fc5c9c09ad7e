//! Legacy-to-canonical identifier migration.
//!
//! Legacy identifiers are the opaque UUID-shaped ids assigned before the
//! canonical format existed. Migration plans a one-to-one remapping to
//! sequential, human-readable ids (`CL001`, `CL002`, …) and applies it to
//! the primary collection and every collection referencing it, so no
//! dangling reference can survive a run.

mod ids;

pub use ids::{format_canonical_id, is_canonical_id, is_legacy_id, CANONICAL_MIN_DIGITS};

use std::collections::HashMap;

use log::info;
use serde::Serialize;
use serde_json::Value;

use crate::records::{record_id, str_field};
use crate::registry::EntityType;

/// Foreign-key field on loan records pointing at their client.
pub const CLIENT_REFERENCE_FIELD: &str = "clientId";

/// Outcome of planning a migration over one collection.
///
/// The mapping is built once per run and discarded after being applied; it
/// is never persisted.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationPlan {
    pub success: bool,
    pub migrated_count: usize,
    pub errors: Vec<String>,
    pub mapping: HashMap<String, String>,
}

/// Collections updated by applying a client-id migration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationApplied {
    pub updated_clients: Vec<Value>,
    pub updated_loans: Vec<Value>,
}

fn canonical_suffix(id: &str, prefix: &str) -> Option<u64> {
    if !is_canonical_id(id) {
        return None;
    }
    let (head, digits) = id.split_at(2);
    if head != prefix {
        return None;
    }
    digits.parse().ok()
}

/// Plan a migration of every legacy-format identifier in `records`.
///
/// Safe to invoke unconditionally: when nothing matches the legacy shape the
/// plan is an empty-mapping success. Counters continue from the highest
/// numeric suffix already in use for `prefix`, so a number is never reused.
pub fn plan_migration(records: &[Value], prefix: &str) -> MigrationPlan {
    let mut counter = records
        .iter()
        .filter_map(record_id)
        .filter_map(|id| canonical_suffix(id, prefix))
        .max()
        .unwrap_or(0);

    let mut mapping = HashMap::new();
    let mut errors = Vec::new();
    for (index, record) in records.iter().enumerate() {
        let Some(id) = record_id(record) else {
            errors.push(format!("record at position {} has no string id", index));
            continue;
        };
        if !is_legacy_id(id) || mapping.contains_key(id) {
            continue;
        }
        counter += 1;
        mapping.insert(id.to_string(), format_canonical_id(prefix, counter));
    }

    MigrationPlan {
        success: errors.is_empty(),
        migrated_count: mapping.len(),
        errors,
        mapping,
    }
}

/// Rewrite record identifiers through `mapping`. Records whose id is not in
/// the mapping pass through unchanged, as do all other fields.
pub fn apply_mapping(records: &[Value], mapping: &HashMap<String, String>) -> Vec<Value> {
    rewrite_field(records, "id", mapping)
}

/// Rewrite a foreign-key field through `mapping`. References not in the
/// mapping pass through unchanged.
pub fn remap_references(
    records: &[Value],
    foreign_field: &str,
    mapping: &HashMap<String, String>,
) -> Vec<Value> {
    rewrite_field(records, foreign_field, mapping)
}

fn rewrite_field(records: &[Value], field: &str, mapping: &HashMap<String, String>) -> Vec<Value> {
    records
        .iter()
        .map(|record| {
            let Some(new_value) = str_field(record, field).and_then(|value| mapping.get(value))
            else {
                return record.clone();
            };
            let mut updated = record.clone();
            if let Some(object) = updated.as_object_mut() {
                object.insert(field.to_string(), Value::String(new_value.clone()));
            }
            updated
        })
        .collect()
}

/// Plan the client-id migration for a working dataset.
pub fn plan_id_migration(clients: &[Value], loans: &[Value]) -> MigrationPlan {
    let plan = plan_migration(clients, EntityType::Client.id_prefix());
    if plan.migrated_count > 0 {
        let references = loans
            .iter()
            .filter_map(|loan| str_field(loan, CLIENT_REFERENCE_FIELD))
            .filter(|reference| plan.mapping.contains_key(*reference))
            .count();
        info!(
            "Planned migration of {} client ids ({} loan references to rewrite)",
            plan.migrated_count, references
        );
    }
    plan
}

/// Apply a planned client-id migration in one logical pass: client ids and
/// loan references are rewritten through the same mapping.
pub fn apply_id_migration(
    clients: &[Value],
    loans: &[Value],
    mapping: &HashMap<String, String>,
) -> MigrationApplied {
    MigrationApplied {
        updated_clients: apply_mapping(clients, mapping),
        updated_loans: remap_references(loans, CLIENT_REFERENCE_FIELD, mapping),
    }
}
