// The five-operation contract every table handler implements.
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use crate::sync::result::HandlerResult;

/// Per-table sync operations. Handlers are plain capability bundles behind a
/// shared contract; the route layer never branches per table.
///
/// Batch operations default to a validation error naming the table — only the
/// mobile photo-capture workflow needs batching.
#[async_trait]
pub trait TableHandler: Send + Sync {
    /// Wire name of the table this handler serves
    fn table(&self) -> &'static str;

    /// Single-record upsert keyed by a caller-supplied id (or, for push
    /// tokens, the natural token value). Returns the persisted record.
    async fn put(&self, pool: &PgPool, data: Value) -> HandlerResult;

    async fn batch_put(&self, _pool: &PgPool, _items: Vec<Value>) -> HandlerResult {
        HandlerResult::validation_error(format!(
            "batch upsert is not supported for {}",
            self.table()
        ))
    }

    /// Partial update: only named fields change, fields absent from the
    /// request are left untouched.
    async fn patch(&self, pool: &PgPool, data: Value) -> HandlerResult;

    fn supports_batch_patch(&self) -> bool {
        false
    }

    async fn batch_patch(&self, _pool: &PgPool, _items: Vec<Value>) -> HandlerResult {
        HandlerResult::validation_error(format!(
            "batch patch is not supported for {}",
            self.table()
        ))
    }

    /// Remove a record by id. Most tables fail with NOT_FOUND when the
    /// record is absent; photos override this with an idempotent delete.
    async fn delete(&self, pool: &PgPool, id: &str) -> HandlerResult;
}
