//! The sync endpoint: four verbs over one envelope.
//!
//! Every verb follows the same skeleton: the middleware has already verified
//! the caller, then parse and structurally validate the envelope, acquire the
//! (lazy) database pool, look up the table handler, call the operation the
//! verb maps to, and render the handler result. Unknown tables and malformed
//! JSON are rejected before the pool is touched so clearly invalid input
//! never pays for connection setup.

use axum::{response::IntoResponse, response::Response, Extension};
use serde_json::Value;
use sqlx::PgPool;

use crate::database::DatabaseManager;
use crate::middleware::AuthUser;
use crate::sync::envelope::{PatchPayload, SyncEnvelope};
use crate::sync::handler::TableHandler;
use crate::sync::registry;
use crate::sync::result::HandlerResult;

fn parse_envelope(body: &str) -> Result<SyncEnvelope, HandlerResult> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| HandlerResult::validation_error(format!("request body is not valid JSON: {}", e)))?;
    SyncEnvelope::parse(value).map_err(|e| HandlerResult::validation_error(e.message()))
}

fn lookup(table: &str) -> Result<&'static dyn TableHandler, HandlerResult> {
    registry::handler_for(table)
        .ok_or_else(|| HandlerResult::validation_error(format!("unknown table '{}'", table)))
}

async fn acquire_pool() -> Result<PgPool, HandlerResult> {
    DatabaseManager::pool().await.map_err(|e| {
        tracing::error!("database unavailable: {}", e);
        HandlerResult::server_error("database connection failed")
    })
}

/// PUT /api/sync - single-record upsert
pub async fn sync_put(Extension(user): Extension<AuthUser>, body: String) -> Response {
    let envelope = match parse_envelope(&body) {
        Ok(envelope) => envelope,
        Err(result) => return result.into_response(),
    };
    let data = match envelope.single_record() {
        Ok(data) => data,
        Err(e) => return HandlerResult::validation_error(e.message()).into_response(),
    };
    let handler = match lookup(&envelope.table) {
        Ok(handler) => handler,
        Err(result) => return result.into_response(),
    };
    let pool = match acquire_pool().await {
        Ok(pool) => pool,
        Err(result) => return result.into_response(),
    };

    tracing::debug!(user = %user.user, table = %envelope.table, "sync put");
    handler.put(&pool, data).await.into_response()
}

/// POST /api/sync - batch upsert (photos only; other handlers reject)
pub async fn sync_post(Extension(user): Extension<AuthUser>, body: String) -> Response {
    let envelope = match parse_envelope(&body) {
        Ok(envelope) => envelope,
        Err(result) => return result.into_response(),
    };
    let items = match envelope.batch_items() {
        Some(items) if !items.is_empty() => items,
        Some(_) => {
            return HandlerResult::validation_error("batch data must not be empty").into_response()
        }
        None => {
            return HandlerResult::validation_error("data must be an array of records")
                .into_response()
        }
    };
    let handler = match lookup(&envelope.table) {
        Ok(handler) => handler,
        Err(result) => return result.into_response(),
    };
    let pool = match acquire_pool().await {
        Ok(pool) => pool,
        Err(result) => return result.into_response(),
    };

    tracing::debug!(user = %user.user, table = %envelope.table, count = items.len(), "sync batch put");
    handler.batch_put(&pool, items).await.into_response()
}

/// PATCH /api/sync - partial update; batch-shaped payloads route to
/// batchPatch when the handler implements it
pub async fn sync_patch(Extension(user): Extension<AuthUser>, body: String) -> Response {
    let envelope = match parse_envelope(&body) {
        Ok(envelope) => envelope,
        Err(result) => return result.into_response(),
    };
    let payload = match envelope.patch_payload() {
        Ok(payload) => payload,
        Err(e) => return HandlerResult::validation_error(e.message()).into_response(),
    };
    let handler = match lookup(&envelope.table) {
        Ok(handler) => handler,
        Err(result) => return result.into_response(),
    };
    // Capability check is free; do it before paying for a connection
    if matches!(payload, PatchPayload::Batch(_)) && !handler.supports_batch_patch() {
        return HandlerResult::validation_error(format!(
            "batch patch is not supported for {}",
            envelope.table
        ))
        .into_response();
    }
    let pool = match acquire_pool().await {
        Ok(pool) => pool,
        Err(result) => return result.into_response(),
    };

    tracing::debug!(user = %user.user, table = %envelope.table, "sync patch");
    match payload {
        PatchPayload::Single(data) => handler.patch(&pool, data).await.into_response(),
        PatchPayload::Batch(items) => handler.batch_patch(&pool, items).await.into_response(),
    }
}

/// DELETE /api/sync - remove by id (`data.id` in the envelope)
pub async fn sync_delete(Extension(user): Extension<AuthUser>, body: String) -> Response {
    let envelope = match parse_envelope(&body) {
        Ok(envelope) => envelope,
        Err(result) => return result.into_response(),
    };
    let id = match envelope.delete_id() {
        Ok(id) => id,
        Err(e) => return HandlerResult::validation_error(e.message()).into_response(),
    };
    let handler = match lookup(&envelope.table) {
        Ok(handler) => handler,
        Err(result) => return result.into_response(),
    };
    let pool = match acquire_pool().await {
        Ok(pool) => pool,
        Err(result) => return result.into_response(),
    };

    tracing::debug!(user = %user.user, table = %envelope.table, id = %id, "sync delete");
    handler.delete(&pool, &id).await.into_response()
}
