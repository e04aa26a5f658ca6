//! Job reports: the writeup tying one schedule to one invoice.
//!
//! Both references are checked to exist at creation. Patch does not
//! re-validate them; the record already exists, and a report never moves to
//! another schedule or invoice.

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::database::{documents, schema};
use crate::sync::handler::TableHandler;
use crate::sync::result::HandlerResult;
use crate::sync::validate::{is_valid_object_id, require_record_id, require_str};

use super::util;

fn validate_report(doc: &Value) -> Result<(), String> {
    let schedule_id = require_str(doc, "scheduleId")?;
    if !is_valid_object_id(schedule_id) {
        return Err(format!("scheduleId '{}' is not a valid record id", schedule_id));
    }
    let invoice_id = require_str(doc, "invoiceId")?;
    if !is_valid_object_id(invoice_id) {
        return Err(format!("invoiceId '{}' is not a valid record id", invoice_id));
    }
    Ok(())
}

pub struct ReportHandler;

#[async_trait]
impl TableHandler for ReportHandler {
    fn table(&self) -> &'static str {
        "reports"
    }

    async fn put(&self, pool: &PgPool, data: Value) -> HandlerResult {
        let id = match require_record_id(&data) {
            Ok(id) => id,
            Err(msg) => return HandlerResult::validation_error(msg),
        };
        if let Err(msg) = validate_report(&data) {
            return HandlerResult::validation_error(msg);
        }

        let schedule_id = data["scheduleId"].as_str().unwrap_or_default().to_string();
        let invoice_id = data["invoiceId"].as_str().unwrap_or_default().to_string();

        match documents::fetch(pool, schema::SCHEDULES, &schedule_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return HandlerResult::not_found(format!("schedule {} does not exist", schedule_id))
            }
            Err(e) => return util::db_failure(self.table(), "schedule lookup", e),
        }
        match documents::fetch(pool, schema::INVOICES, &invoice_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return HandlerResult::not_found(format!("invoice {} does not exist", invoice_id))
            }
            Err(e) => return util::db_failure(self.table(), "invoice lookup", e),
        }

        let mut doc = data;
        util::stamp_put(&mut doc);
        match documents::upsert(pool, schema::REPORTS, &id, &doc).await {
            Ok(stored) => HandlerResult::success(stored),
            Err(e) => util::db_failure(self.table(), "upsert", e),
        }
    }

    async fn patch(&self, pool: &PgPool, data: Value) -> HandlerResult {
        let id = match require_record_id(&data) {
            Ok(id) => id,
            Err(msg) => return HandlerResult::validation_error(msg),
        };

        let existing = match documents::fetch(pool, schema::REPORTS, &id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => return HandlerResult::not_found(format!("report {} not found", id)),
            Err(e) => return util::db_failure(self.table(), "fetch", e),
        };

        let mut merged = util::merge_patch(&existing, &data);
        // References stay structurally valid even if the patch rewrites them
        if let Err(msg) = validate_report(&merged) {
            return HandlerResult::validation_error(msg);
        }

        util::stamp_update(&mut merged);
        match documents::replace(pool, schema::REPORTS, &id, &merged).await {
            Ok(true) => HandlerResult::success(merged),
            Ok(false) => HandlerResult::not_found(format!("report {} not found", id)),
            Err(e) => util::db_failure(self.table(), "update", e),
        }
    }

    async fn delete(&self, pool: &PgPool, id: &str) -> HandlerResult {
        match documents::delete(pool, schema::REPORTS, id).await {
            Ok(0) => HandlerResult::not_found(format!("report {} not found", id)),
            Ok(_) => HandlerResult::success(json!({"deleted": true, "id": id})),
            Err(e) => util::db_failure(self.table(), "delete", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_both_references() {
        let ok = json!({
            "scheduleId": "507f1f77bcf86cd799439011",
            "invoiceId": "507f1f77bcf86cd799439012",
        });
        assert!(validate_report(&ok).is_ok());

        assert!(validate_report(&json!({"scheduleId": "507f1f77bcf86cd799439011"})).is_err());
        assert!(validate_report(&json!({
            "scheduleId": "nope",
            "invoiceId": "507f1f77bcf86cd799439012",
        }))
        .is_err());
    }
}
