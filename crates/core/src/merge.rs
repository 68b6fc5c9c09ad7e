//! Whole-record merge of two collection sources.

use std::collections::HashSet;

use serde_json::Value;

use crate::records::str_field;

/// Combine `primary` and `secondary` into one de-duplicated collection.
///
/// Every element of `primary` is kept in its original order. Elements of
/// `secondary` are appended in their original order unless their `key_field`
/// value already appears in `primary`. Primary wins on collision, and
/// selection is whole-record (fields are never merged across sources).
/// Secondary records lacking the key field have nothing to collide on and
/// are appended.
pub fn merge_by_key(primary: &[Value], secondary: &[Value], key_field: &str) -> Vec<Value> {
    let seen: HashSet<&str> = primary
        .iter()
        .filter_map(|record| str_field(record, key_field))
        .collect();

    let mut combined = Vec::with_capacity(primary.len() + secondary.len());
    combined.extend_from_slice(primary);
    for record in secondary {
        match str_field(record, key_field) {
            Some(key) if seen.contains(key) => {}
            _ => combined.push(record.clone()),
        }
    }
    combined
}
