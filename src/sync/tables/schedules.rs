//! Schedule records: the job visits that photos and reports hang off.

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::database::{documents, schema};
use crate::sync::handler::TableHandler;
use crate::sync::result::HandlerResult;
use crate::sync::validate::{
    is_valid_date, require_record_id, require_str, str_field, validate_time_logic,
};

use super::util;

fn validate_schedule(doc: &Value) -> Result<(), String> {
    require_str(doc, "clientId")?;

    if let Some(date) = str_field(doc, "date") {
        if !is_valid_date(date) {
            return Err(format!("date '{}' is not a valid YYYY-MM-DD date", date));
        }
    }

    // Visit window is optional, but when both ends are present they must be
    // well-formed and ordered.
    if let (Some(start), Some(end)) = (str_field(doc, "startTime"), str_field(doc, "endTime")) {
        if let Some(violation) = validate_time_logic(start, end, false) {
            return Err(violation);
        }
    }

    Ok(())
}

pub struct ScheduleHandler;

#[async_trait]
impl TableHandler for ScheduleHandler {
    fn table(&self) -> &'static str {
        "schedules"
    }

    async fn put(&self, pool: &PgPool, data: Value) -> HandlerResult {
        let id = match require_record_id(&data) {
            Ok(id) => id,
            Err(msg) => return HandlerResult::validation_error(msg),
        };
        if let Err(msg) = validate_schedule(&data) {
            return HandlerResult::validation_error(msg);
        }

        let mut doc = data;
        util::stamp_put(&mut doc);
        match documents::upsert(pool, schema::SCHEDULES, &id, &doc).await {
            Ok(stored) => HandlerResult::success(stored),
            Err(e) => util::db_failure(self.table(), "upsert", e),
        }
    }

    async fn patch(&self, pool: &PgPool, data: Value) -> HandlerResult {
        let id = match require_record_id(&data) {
            Ok(id) => id,
            Err(msg) => return HandlerResult::validation_error(msg),
        };

        let existing = match documents::fetch(pool, schema::SCHEDULES, &id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => return HandlerResult::not_found(format!("schedule {} not found", id)),
            Err(e) => return util::db_failure(self.table(), "fetch", e),
        };

        let mut merged = util::merge_patch(&existing, &data);
        if let Err(msg) = validate_schedule(&merged) {
            return HandlerResult::validation_error(msg);
        }

        util::stamp_update(&mut merged);
        match documents::replace(pool, schema::SCHEDULES, &id, &merged).await {
            Ok(true) => HandlerResult::success(merged),
            Ok(false) => HandlerResult::not_found(format!("schedule {} not found", id)),
            Err(e) => util::db_failure(self.table(), "update", e),
        }
    }

    async fn delete(&self, pool: &PgPool, id: &str) -> HandlerResult {
        match documents::delete(pool, schema::SCHEDULES, id).await {
            Ok(0) => HandlerResult::not_found(format!("schedule {} not found", id)),
            Ok(_) => HandlerResult::success(json!({"deleted": true, "id": id})),
            Err(e) => util::db_failure(self.table(), "delete", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_client() {
        assert!(validate_schedule(&json!({"date": "2025-06-01"})).is_err());
        assert!(validate_schedule(&json!({"clientId": "c1"})).is_ok());
    }

    #[test]
    fn optional_fields_validated_when_present() {
        assert!(validate_schedule(&json!({"clientId": "c1", "date": "2025-06-31"})).is_err());
        assert!(validate_schedule(&json!({
            "clientId": "c1", "startTime": "10:00", "endTime": "09:00"
        }))
        .is_err());
        assert!(validate_schedule(&json!({
            "clientId": "c1", "date": "2025-06-01", "startTime": "09:00", "endTime": "12:30"
        }))
        .is_ok());
    }
}
