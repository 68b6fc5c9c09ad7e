//! Accessors over schemaless entity records.
//!
//! Records are plain JSON objects produced by the UI layer; field keys are
//! camelCase. These helpers read identifier fields without panicking on
//! records that lack them.

use serde_json::Value;

/// Read a string field out of a record object.
pub fn str_field<'a>(record: &'a Value, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}

/// Read the record identifier.
pub fn record_id(record: &Value) -> Option<&str> {
    str_field(record, "id")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_string_id() {
        assert_eq!(record_id(&json!({"id": "CL001", "name": "Jane"})), Some("CL001"));
    }

    #[test]
    fn missing_or_non_string_id_is_none() {
        assert_eq!(record_id(&json!({"name": "Jane"})), None);
        assert_eq!(record_id(&json!({"id": 7})), None);
        assert_eq!(record_id(&json!(null)), None);
    }
}
