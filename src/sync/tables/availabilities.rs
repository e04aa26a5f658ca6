//! Technician availability windows.
//!
//! Exactly one of the two discriminators must be satisfiable at all times:
//! recurring entries carry a day-of-week, one-off entries carry a specific
//! date. Patches are validated against the merged effective state so a
//! single updated boundary cannot break the invariants.

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::database::{documents, schema};
use crate::sync::handler::TableHandler;
use crate::sync::result::HandlerResult;
use crate::sync::validate::{
    bool_field, is_valid_date, require_record_id, require_str, str_field, validate_time_logic,
};

use super::util;

fn validate_availability(doc: &Value) -> Result<(), String> {
    require_str(doc, "technicianId")?;

    let start = require_str(doc, "startTime")?;
    let end = require_str(doc, "endTime")?;
    let is_full_day = bool_field(doc, "isFullDay", false);
    if let Some(violation) = validate_time_logic(start, end, is_full_day) {
        return Err(violation);
    }

    if bool_field(doc, "isRecurring", false) {
        match doc.get("dayOfWeek").and_then(Value::as_i64) {
            Some(day) if (0..=6).contains(&day) => {}
            Some(day) => return Err(format!("dayOfWeek {} must be between 0 and 6", day)),
            None => return Err("recurring availability requires dayOfWeek".into()),
        }
    } else {
        match str_field(doc, "specificDate") {
            Some(date) if is_valid_date(date) => {}
            Some(date) => {
                return Err(format!("specificDate '{}' is not a valid YYYY-MM-DD date", date))
            }
            None => return Err("non-recurring availability requires specificDate".into()),
        }
    }

    Ok(())
}

pub struct AvailabilityHandler;

#[async_trait]
impl TableHandler for AvailabilityHandler {
    fn table(&self) -> &'static str {
        "availabilities"
    }

    async fn put(&self, pool: &PgPool, data: Value) -> HandlerResult {
        let id = match require_record_id(&data) {
            Ok(id) => id,
            Err(msg) => return HandlerResult::validation_error(msg),
        };
        if let Err(msg) = validate_availability(&data) {
            return HandlerResult::validation_error(msg);
        }

        let mut doc = data;
        util::stamp_put(&mut doc);
        match documents::upsert(pool, schema::AVAILABILITIES, &id, &doc).await {
            Ok(stored) => HandlerResult::success(stored),
            Err(e) => util::db_failure(self.table(), "upsert", e),
        }
    }

    async fn patch(&self, pool: &PgPool, data: Value) -> HandlerResult {
        let id = match require_record_id(&data) {
            Ok(id) => id,
            Err(msg) => return HandlerResult::validation_error(msg),
        };

        let existing = match documents::fetch(pool, schema::AVAILABILITIES, &id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => return HandlerResult::not_found(format!("availability {} not found", id)),
            Err(e) => return util::db_failure(self.table(), "fetch", e),
        };

        let mut merged = util::merge_patch(&existing, &data);
        if let Err(msg) = validate_availability(&merged) {
            return HandlerResult::validation_error(msg);
        }

        util::stamp_update(&mut merged);
        match documents::replace(pool, schema::AVAILABILITIES, &id, &merged).await {
            Ok(true) => HandlerResult::success(merged),
            Ok(false) => HandlerResult::not_found(format!("availability {} not found", id)),
            Err(e) => util::db_failure(self.table(), "update", e),
        }
    }

    async fn delete(&self, pool: &PgPool, id: &str) -> HandlerResult {
        match documents::delete(pool, schema::AVAILABILITIES, id).await {
            Ok(0) => HandlerResult::not_found(format!("availability {} not found", id)),
            Ok(_) => HandlerResult::success(json!({"deleted": true, "id": id})),
            Err(e) => util::db_failure(self.table(), "delete", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Value {
        json!({
            "technicianId": "t1",
            "startTime": "09:00",
            "endTime": "17:00",
            "isRecurring": true,
            "dayOfWeek": 2,
        })
    }

    #[test]
    fn recurring_requires_day_of_week() {
        let mut doc = base();
        doc.as_object_mut().unwrap().remove("dayOfWeek");
        assert!(validate_availability(&doc).is_err());

        doc["dayOfWeek"] = json!(7);
        assert!(validate_availability(&doc).is_err());

        doc["dayOfWeek"] = json!(0);
        assert!(validate_availability(&doc).is_ok());
    }

    #[test]
    fn one_off_requires_specific_date() {
        let mut doc = base();
        doc["isRecurring"] = json!(false);
        assert!(validate_availability(&doc).is_err());

        doc["specificDate"] = json!("2025-06-15");
        assert!(validate_availability(&doc).is_ok());

        doc["specificDate"] = json!("2025-06-32");
        assert!(validate_availability(&doc).is_err());
    }

    #[test]
    fn time_ordering_enforced_unless_full_day() {
        let mut doc = base();
        doc["startTime"] = json!("18:00");
        assert!(validate_availability(&doc).is_err());

        doc["isFullDay"] = json!(true);
        assert!(validate_availability(&doc).is_ok());
    }

    #[test]
    fn merged_patch_state_keeps_invariants_checkable() {
        // A patch that only moves the end boundary must be judged against the
        // merged record, not the patch alone.
        let existing = base();
        let merged = util::merge_patch(&existing, &json!({"id": "x", "endTime": "08:00"}));
        assert!(validate_availability(&merged).is_err());

        let merged = util::merge_patch(&existing, &json!({"endTime": "10:00"}));
        assert!(validate_availability(&merged).is_ok());
    }
}
