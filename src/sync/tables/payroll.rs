//! Payroll periods: four date fields, each format-validated on its own.
//! No cross-field ordering is enforced at this layer; payroll calendars are
//! owned by the back office, the gateway only guards the formats.

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::database::{documents, schema};
use crate::sync::handler::TableHandler;
use crate::sync::result::HandlerResult;
use crate::sync::validate::{is_valid_date, require_record_id};

use super::util;

const DATE_FIELDS: &[&str] = &["startDate", "endDate", "cutoffDate", "payDate"];

fn validate_payroll_period(doc: &Value, require_all: bool) -> Result<(), String> {
    for field in DATE_FIELDS {
        match doc.get(*field) {
            Some(Value::String(date)) => {
                if !is_valid_date(date) {
                    return Err(format!("{} '{}' is not a valid YYYY-MM-DD date", field, date));
                }
            }
            Some(_) => return Err(format!("{} must be a YYYY-MM-DD string", field)),
            None if require_all => return Err(format!("{} is required", field)),
            None => {}
        }
    }
    Ok(())
}

pub struct PayrollPeriodHandler;

#[async_trait]
impl TableHandler for PayrollPeriodHandler {
    fn table(&self) -> &'static str {
        "payrollperiods"
    }

    async fn put(&self, pool: &PgPool, data: Value) -> HandlerResult {
        let id = match require_record_id(&data) {
            Ok(id) => id,
            Err(msg) => return HandlerResult::validation_error(msg),
        };
        if let Err(msg) = validate_payroll_period(&data, true) {
            return HandlerResult::validation_error(msg);
        }

        let mut doc = data;
        util::stamp_put(&mut doc);
        match documents::upsert(pool, schema::PAYROLL_PERIODS, &id, &doc).await {
            Ok(stored) => HandlerResult::success(stored),
            Err(e) => util::db_failure(self.table(), "upsert", e),
        }
    }

    async fn patch(&self, pool: &PgPool, data: Value) -> HandlerResult {
        let id = match require_record_id(&data) {
            Ok(id) => id,
            Err(msg) => return HandlerResult::validation_error(msg),
        };

        let existing = match documents::fetch(pool, schema::PAYROLL_PERIODS, &id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                return HandlerResult::not_found(format!("payroll period {} not found", id))
            }
            Err(e) => return util::db_failure(self.table(), "fetch", e),
        };

        let mut merged = util::merge_patch(&existing, &data);
        if let Err(msg) = validate_payroll_period(&merged, false) {
            return HandlerResult::validation_error(msg);
        }

        util::stamp_update(&mut merged);
        match documents::replace(pool, schema::PAYROLL_PERIODS, &id, &merged).await {
            Ok(true) => HandlerResult::success(merged),
            Ok(false) => HandlerResult::not_found(format!("payroll period {} not found", id)),
            Err(e) => util::db_failure(self.table(), "update", e),
        }
    }

    async fn delete(&self, pool: &PgPool, id: &str) -> HandlerResult {
        match documents::delete(pool, schema::PAYROLL_PERIODS, id).await {
            Ok(0) => HandlerResult::not_found(format!("payroll period {} not found", id)),
            Ok(_) => HandlerResult::success(json!({"deleted": true, "id": id})),
            Err(e) => util::db_failure(self.table(), "delete", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_requires_all_four_dates() {
        let doc = json!({
            "startDate": "2025-06-01",
            "endDate": "2025-06-14",
            "cutoffDate": "2025-06-16",
            "payDate": "2025-06-20",
        });
        assert!(validate_payroll_period(&doc, true).is_ok());

        let mut missing = doc.clone();
        missing.as_object_mut().unwrap().remove("cutoffDate");
        assert!(validate_payroll_period(&missing, true).is_err());
        // A patch only needs the fields it touches to be well-formed
        assert!(validate_payroll_period(&missing, false).is_ok());
    }

    #[test]
    fn each_field_is_format_checked_independently() {
        let doc = json!({
            "startDate": "2025-06-01",
            "endDate": "06/14/2025",
        });
        let err = validate_payroll_period(&doc, false).unwrap_err();
        assert!(err.contains("endDate"));

        // Ordering between fields is deliberately not enforced
        let unordered = json!({
            "startDate": "2025-06-14",
            "endDate": "2025-06-01",
        });
        assert!(validate_payroll_period(&unordered, false).is_ok());
    }
}
