// Sync envelope parsing: `{ table, data }` with an explicit batch-shape parse.
use serde_json::Value;

use crate::sync::registry;

/// Parsed request envelope. `data` is kept dynamic; the handlers own the
/// per-table field rules.
#[derive(Debug, Clone)]
pub struct SyncEnvelope {
    pub table: String,
    pub data: Value,
}

/// Explicit tagged parse of a patch payload shape, instead of ad hoc type
/// inspection in the route handler.
#[derive(Debug, Clone)]
pub enum PatchPayload {
    Single(Value),
    Batch(Vec<Value>),
}

#[derive(Debug, PartialEq, Eq)]
pub enum EnvelopeError {
    NotAnObject,
    MissingTable,
    UnknownTable(String),
    MissingData,
    InvalidData(&'static str),
}

impl EnvelopeError {
    pub fn message(&self) -> String {
        match self {
            EnvelopeError::NotAnObject => "request body must be a JSON object".into(),
            EnvelopeError::MissingTable => "table is required".into(),
            EnvelopeError::UnknownTable(table) => format!(
                "unknown table '{}'; supported tables: {}",
                table,
                registry::supported_tables().join(", ")
            ),
            EnvelopeError::MissingData => "data is required".into(),
            EnvelopeError::InvalidData(msg) => (*msg).into(),
        }
    }
}

impl SyncEnvelope {
    /// Parse and structurally validate the envelope. Table must be registered,
    /// data must be a non-null object or an array.
    pub fn parse(body: Value) -> Result<Self, EnvelopeError> {
        let Value::Object(map) = body else {
            return Err(EnvelopeError::NotAnObject);
        };

        let table = match map.get("table").and_then(Value::as_str) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => return Err(EnvelopeError::MissingTable),
        };
        if !registry::is_supported(&table) {
            return Err(EnvelopeError::UnknownTable(table));
        }

        let data = match map.get("data") {
            Some(Value::Null) | None => return Err(EnvelopeError::MissingData),
            Some(Value::Object(_)) | Some(Value::Array(_)) => map["data"].clone(),
            Some(_) => return Err(EnvelopeError::InvalidData("data must be an object or an array")),
        };

        Ok(Self { table, data })
    }

    /// Single-record view of `data`; batch shapes are rejected.
    pub fn single_record(&self) -> Result<Value, EnvelopeError> {
        match &self.data {
            Value::Object(_) => Ok(self.data.clone()),
            _ => Err(EnvelopeError::InvalidData("data must be a single object")),
        }
    }

    /// Batch view of `data`: a bare array, or an object whose `items`
    /// property is an array.
    pub fn batch_items(&self) -> Option<Vec<Value>> {
        match &self.data {
            Value::Array(items) => Some(items.clone()),
            Value::Object(map) => match map.get("items") {
                Some(Value::Array(items)) => Some(items.clone()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Shape-directed patch dispatch: batch when the payload carries an
    /// item array, single otherwise.
    pub fn patch_payload(&self) -> Result<PatchPayload, EnvelopeError> {
        if let Some(items) = self.batch_items() {
            if items.is_empty() {
                return Err(EnvelopeError::InvalidData("batch data must not be empty"));
            }
            return Ok(PatchPayload::Batch(items));
        }
        Ok(PatchPayload::Single(self.single_record()?))
    }

    /// Record id required by DELETE
    pub fn delete_id(&self) -> Result<String, EnvelopeError> {
        match self.data.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => Ok(id.to_string()),
            _ => Err(EnvelopeError::InvalidData("data.id is required for delete")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_known_table_with_object_data() {
        let env = SyncEnvelope::parse(json!({"table": "schedules", "data": {"id": "x"}})).unwrap();
        assert_eq!(env.table, "schedules");
        assert!(env.single_record().is_ok());
        assert!(env.batch_items().is_none());
    }

    #[test]
    fn rejects_unknown_table_naming_it() {
        let err = SyncEnvelope::parse(json!({"table": "clients", "data": {}})).unwrap_err();
        assert_eq!(err, EnvelopeError::UnknownTable("clients".into()));
        assert!(err.message().contains("clients"));
        assert!(err.message().contains("photos"));
    }

    #[test]
    fn rejects_missing_or_null_data() {
        assert_eq!(
            SyncEnvelope::parse(json!({"table": "photos"})).unwrap_err(),
            EnvelopeError::MissingData
        );
        assert_eq!(
            SyncEnvelope::parse(json!({"table": "photos", "data": null})).unwrap_err(),
            EnvelopeError::MissingData
        );
        assert!(matches!(
            SyncEnvelope::parse(json!({"table": "photos", "data": "nope"})).unwrap_err(),
            EnvelopeError::InvalidData(_)
        ));
    }

    #[test]
    fn batch_shape_accepts_array_and_items_property() {
        let arr = SyncEnvelope::parse(json!({"table": "photos", "data": [{"id": "a"}]})).unwrap();
        assert_eq!(arr.batch_items().unwrap().len(), 1);

        let wrapped =
            SyncEnvelope::parse(json!({"table": "photos", "data": {"items": [{}, {}]}})).unwrap();
        assert_eq!(wrapped.batch_items().unwrap().len(), 2);

        let single = SyncEnvelope::parse(json!({"table": "photos", "data": {"id": "a"}})).unwrap();
        assert!(single.batch_items().is_none());
    }

    #[test]
    fn patch_payload_is_a_tagged_union() {
        let env = SyncEnvelope::parse(json!({"table": "photos", "data": [{"id": "a"}]})).unwrap();
        assert!(matches!(env.patch_payload().unwrap(), PatchPayload::Batch(_)));

        let env = SyncEnvelope::parse(json!({"table": "photos", "data": {"id": "a"}})).unwrap();
        assert!(matches!(env.patch_payload().unwrap(), PatchPayload::Single(_)));

        let env = SyncEnvelope::parse(json!({"table": "photos", "data": []})).unwrap();
        assert!(env.patch_payload().is_err());
    }

    #[test]
    fn delete_requires_string_id() {
        let env = SyncEnvelope::parse(json!({"table": "photos", "data": {"id": "abc"}})).unwrap();
        assert_eq!(env.delete_id().unwrap(), "abc");

        let env = SyncEnvelope::parse(json!({"table": "photos", "data": {}})).unwrap();
        assert!(env.delete_id().is_err());
    }
}
