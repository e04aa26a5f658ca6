//! Technician time-off requests.

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::database::{documents, schema};
use crate::sync::handler::TableHandler;
use crate::sync::result::HandlerResult;
use crate::sync::validate::{is_valid_date, require_record_id, require_str, str_field};

use super::util;

const STATUSES: &[&str] = &["pending", "approved", "rejected"];

fn validate_time_off(doc: &Value) -> Result<(), String> {
    require_str(doc, "technicianId")?;

    let start = require_str(doc, "startDate")?;
    if !is_valid_date(start) {
        return Err(format!("startDate '{}' is not a valid YYYY-MM-DD date", start));
    }
    let end = require_str(doc, "endDate")?;
    if !is_valid_date(end) {
        return Err(format!("endDate '{}' is not a valid YYYY-MM-DD date", end));
    }
    // ISO dates order lexicographically
    if start > end {
        return Err(format!("startDate '{}' must not be after endDate '{}'", start, end));
    }

    if let Some(status) = str_field(doc, "status") {
        if !STATUSES.contains(&status) {
            return Err(format!(
                "status '{}' must be one of {}",
                status,
                STATUSES.join(", ")
            ));
        }
    }

    Ok(())
}

fn default_status(doc: &mut Value) {
    if let Value::Object(map) = doc {
        map.entry("status").or_insert_with(|| Value::String("pending".into()));
    }
}

pub struct TimeOffRequestHandler;

#[async_trait]
impl TableHandler for TimeOffRequestHandler {
    fn table(&self) -> &'static str {
        "timeoffrequests"
    }

    async fn put(&self, pool: &PgPool, data: Value) -> HandlerResult {
        let id = match require_record_id(&data) {
            Ok(id) => id,
            Err(msg) => return HandlerResult::validation_error(msg),
        };
        if let Err(msg) = validate_time_off(&data) {
            return HandlerResult::validation_error(msg);
        }

        let mut doc = data;
        default_status(&mut doc);
        util::stamp_put(&mut doc);
        match documents::upsert(pool, schema::TIME_OFF_REQUESTS, &id, &doc).await {
            Ok(stored) => HandlerResult::success(stored),
            Err(e) => util::db_failure(self.table(), "upsert", e),
        }
    }

    async fn patch(&self, pool: &PgPool, data: Value) -> HandlerResult {
        let id = match require_record_id(&data) {
            Ok(id) => id,
            Err(msg) => return HandlerResult::validation_error(msg),
        };

        let existing = match documents::fetch(pool, schema::TIME_OFF_REQUESTS, &id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                return HandlerResult::not_found(format!("time-off request {} not found", id))
            }
            Err(e) => return util::db_failure(self.table(), "fetch", e),
        };

        // Date ordering is judged on the merged state so a patch that moves
        // only one boundary cannot invert the range.
        let mut merged = util::merge_patch(&existing, &data);
        if let Err(msg) = validate_time_off(&merged) {
            return HandlerResult::validation_error(msg);
        }

        util::stamp_update(&mut merged);
        match documents::replace(pool, schema::TIME_OFF_REQUESTS, &id, &merged).await {
            Ok(true) => HandlerResult::success(merged),
            Ok(false) => HandlerResult::not_found(format!("time-off request {} not found", id)),
            Err(e) => util::db_failure(self.table(), "update", e),
        }
    }

    async fn delete(&self, pool: &PgPool, id: &str) -> HandlerResult {
        match documents::delete(pool, schema::TIME_OFF_REQUESTS, id).await {
            Ok(0) => HandlerResult::not_found(format!("time-off request {} not found", id)),
            Ok(_) => HandlerResult::success(json!({"deleted": true, "id": id})),
            Err(e) => util::db_failure(self.table(), "delete", e),
        }
    }
}
