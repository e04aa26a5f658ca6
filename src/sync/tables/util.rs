// Helpers shared by the table handlers.
use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::sync::result::HandlerResult;

pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Stamp a record being upserted: `updatedAt` always, `createdAt` only when
/// the client did not carry one over.
pub(crate) fn stamp_put(doc: &mut Value) {
    if let Value::Object(map) = doc {
        let now = now_iso();
        if !map.contains_key("createdAt") {
            map.insert("createdAt".into(), Value::String(now.clone()));
        }
        map.insert("updatedAt".into(), Value::String(now));
    }
}

pub(crate) fn stamp_update(doc: &mut Value) {
    if let Value::Object(map) = doc {
        map.insert("updatedAt".into(), Value::String(now_iso()));
    }
}

/// Shallow $set-style merge: fields present in the patch replace the
/// existing ones, everything else is left untouched. The id never moves.
pub(crate) fn merge_patch(existing: &Value, patch: &Value) -> Value {
    let mut merged = existing.as_object().cloned().unwrap_or_default();
    if let Value::Object(fields) = patch {
        for (key, value) in fields {
            if key == "id" {
                continue;
            }
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::Object(merged)
}

/// Uniform database-failure mapping: log the real error, report SERVER_ERROR.
/// Handlers never retry; that is the mobile client's job.
pub(crate) fn db_failure(table: &str, op: &str, err: sqlx::Error) -> HandlerResult {
    tracing::error!("{} {} failed: {}", table, op, err);
    HandlerResult::server_error(format!("database error during {} {}", table, op))
}
