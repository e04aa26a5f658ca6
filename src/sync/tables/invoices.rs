//! Invoice records. Money fields arrive as JSON numbers or strings from the
//! mobile client; both must parse as non-negative decimals.

use async_trait::async_trait;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::str::FromStr;

use crate::database::{documents, schema};
use crate::sync::handler::TableHandler;
use crate::sync::result::HandlerResult;
use crate::sync::validate::{is_valid_date, require_record_id, require_str, str_field};

use super::util;

const STATUSES: &[&str] = &["draft", "sent", "paid", "void"];
const MONEY_FIELDS: &[&str] = &["total", "amountPaid"];

fn parse_money(doc: &Value, field: &str) -> Result<Option<Decimal>, String> {
    match doc.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .and_then(Decimal::from_f64)
            .map(Some)
            .ok_or_else(|| format!("{} is not a representable amount", field)),
        Some(Value::String(s)) => Decimal::from_str(s)
            .map(Some)
            .map_err(|_| format!("{} '{}' is not a valid amount", field, s)),
        Some(_) => Err(format!("{} must be a number or numeric string", field)),
    }
}

fn validate_invoice(doc: &Value) -> Result<(), String> {
    require_str(doc, "clientId")?;

    for field in MONEY_FIELDS {
        if let Some(amount) = parse_money(doc, field)? {
            if amount.is_sign_negative() {
                return Err(format!("{} must not be negative", field));
            }
        }
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

    if let Some(date) = str_field(doc, "issuedDate") {
        if !is_valid_date(date) {
            return Err(format!("issuedDate '{}' is not a valid YYYY-MM-DD date", date));
        }
    }

    Ok(())
}

pub struct InvoiceHandler;

#[async_trait]
impl TableHandler for InvoiceHandler {
    fn table(&self) -> &'static str {
        "invoices"
    }

    async fn put(&self, pool: &PgPool, data: Value) -> HandlerResult {
        let id = match require_record_id(&data) {
            Ok(id) => id,
            Err(msg) => return HandlerResult::validation_error(msg),
        };
        if let Err(msg) = validate_invoice(&data) {
            return HandlerResult::validation_error(msg);
        }

        let mut doc = data;
        util::stamp_put(&mut doc);
        match documents::upsert(pool, schema::INVOICES, &id, &doc).await {
            Ok(stored) => HandlerResult::success(stored),
            Err(e) => util::db_failure(self.table(), "upsert", e),
        }
    }

    async fn patch(&self, pool: &PgPool, data: Value) -> HandlerResult {
        let id = match require_record_id(&data) {
            Ok(id) => id,
            Err(msg) => return HandlerResult::validation_error(msg),
        };

        let existing = match documents::fetch(pool, schema::INVOICES, &id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => return HandlerResult::not_found(format!("invoice {} not found", id)),
            Err(e) => return util::db_failure(self.table(), "fetch", e),
        };

        let mut merged = util::merge_patch(&existing, &data);
        if let Err(msg) = validate_invoice(&merged) {
            return HandlerResult::validation_error(msg);
        }

        util::stamp_update(&mut merged);
        match documents::replace(pool, schema::INVOICES, &id, &merged).await {
            Ok(true) => HandlerResult::success(merged),
            Ok(false) => HandlerResult::not_found(format!("invoice {} not found", id)),
            Err(e) => util::db_failure(self.table(), "update", e),
        }
    }

    async fn delete(&self, pool: &PgPool, id: &str) -> HandlerResult {
        match documents::delete(pool, schema::INVOICES, id).await {
            Ok(0) => HandlerResult::not_found(format!("invoice {} not found", id)),
            Ok(_) => HandlerResult::success(json!({"deleted": true, "id": id})),
            Err(e) => util::db_failure(self.table(), "delete", e),
        }
    }
}
