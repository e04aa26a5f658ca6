//! Thin document-store API over the JSONB tables.
//!
//! Table names are always the constants from [`crate::database::schema`];
//! they are interpolated quoted, never taken from request input. Per-row
//! atomicity comes from Postgres itself: single-record writes are one
//! statement, batch writes are one UNNEST-driven statement.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use sqlx::{PgPool, Row};

/// Outcome of a bulk upsert: rows freshly inserted vs. rows overwritten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkWriteReport {
    pub inserted: u64,
    pub updated: u64,
}

/// Load a single document by id
pub async fn fetch(pool: &PgPool, table: &str, id: &str) -> Result<Option<Value>, sqlx::Error> {
    let sql = format!("SELECT doc FROM \"{}\" WHERE id = $1", table);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    match row {
        Some(row) => Ok(Some(row.try_get("doc")?)),
        None => Ok(None),
    }
}

/// Load a set of documents keyed by id
pub async fn fetch_many(
    pool: &PgPool,
    table: &str,
    ids: &[String],
) -> Result<HashMap<String, Value>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let sql = format!("SELECT id, doc FROM \"{}\" WHERE id = ANY($1)", table);
    let rows = sqlx::query(&sql).bind(ids).fetch_all(pool).await?;

    let mut docs = HashMap::with_capacity(rows.len());
    for row in rows {
        let id: String = row.try_get("id")?;
        let doc: Value = row.try_get("doc")?;
        docs.insert(id, doc);
    }
    Ok(docs)
}

/// Which of the given ids exist in the table. One set-membership query
/// regardless of how many ids a batch references.
pub async fn ids_exist(
    pool: &PgPool,
    table: &str,
    ids: &[String],
) -> Result<HashSet<String>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(HashSet::new());
    }
    let sql = format!("SELECT id FROM \"{}\" WHERE id = ANY($1)", table);
    let rows = sqlx::query(&sql).bind(ids).fetch_all(pool).await?;

    let mut found = HashSet::with_capacity(rows.len());
    for row in rows {
        found.insert(row.try_get::<String, _>("id")?);
    }
    Ok(found)
}

/// Atomic upsert: create if absent, overwrite if present. Returns the
/// stored document.
pub async fn upsert(pool: &PgPool, table: &str, id: &str, doc: &Value) -> Result<Value, sqlx::Error> {
    let sql = format!(
        "INSERT INTO \"{}\" (id, doc) VALUES ($1, $2) \
         ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc \
         RETURNING doc",
        table
    );
    let row = sqlx::query(&sql).bind(id).bind(doc).fetch_one(pool).await?;
    row.try_get("doc")
}

/// Replace an existing document. Returns false when the row is absent.
pub async fn replace(pool: &PgPool, table: &str, id: &str, doc: &Value) -> Result<bool, sqlx::Error> {
    let sql = format!("UPDATE \"{}\" SET doc = $2 WHERE id = $1", table);
    let result = sqlx::query(&sql).bind(id).bind(doc).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

/// Delete by id, returning the number of rows removed
pub async fn delete(pool: &PgPool, table: &str, id: &str) -> Result<u64, sqlx::Error> {
    let sql = format!("DELETE FROM \"{}\" WHERE id = $1", table);
    let result = sqlx::query(&sql).bind(id).execute(pool).await?;
    Ok(result.rows_affected())
}

/// Bulk upsert as a single statement. `xmax = 0` distinguishes freshly
/// inserted rows from overwritten ones.
pub async fn bulk_upsert(
    pool: &PgPool,
    table: &str,
    docs: &[(String, Value)],
) -> Result<BulkWriteReport, sqlx::Error> {
    if docs.is_empty() {
        return Ok(BulkWriteReport::default());
    }

    let ids: Vec<String> = docs.iter().map(|(id, _)| id.clone()).collect();
    let bodies: Vec<Value> = docs.iter().map(|(_, doc)| doc.clone()).collect();

    let sql = format!(
        "INSERT INTO \"{}\" (id, doc) \
         SELECT * FROM UNNEST($1::text[], $2::jsonb[]) \
         ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc \
         RETURNING (xmax = 0) AS inserted",
        table
    );
    let rows = sqlx::query(&sql).bind(&ids).bind(&bodies).fetch_all(pool).await?;

    let mut report = BulkWriteReport::default();
    for row in rows {
        if row.try_get::<bool, _>("inserted")? {
            report.inserted += 1;
        } else {
            report.updated += 1;
        }
    }
    Ok(report)
}

/// Bulk replace of existing rows as a single statement. Rows whose id is
/// absent are silently unmatched; the caller pre-checks existence.
pub async fn bulk_update(
    pool: &PgPool,
    table: &str,
    docs: &[(String, Value)],
) -> Result<u64, sqlx::Error> {
    if docs.is_empty() {
        return Ok(0);
    }

    let ids: Vec<String> = docs.iter().map(|(id, _)| id.clone()).collect();
    let bodies: Vec<Value> = docs.iter().map(|(_, doc)| doc.clone()).collect();

    let sql = format!(
        "UPDATE \"{}\" AS t SET doc = u.doc \
         FROM (SELECT * FROM UNNEST($1::text[], $2::jsonb[])) AS u(id, doc) \
         WHERE t.id = u.id",
        table
    );
    let result = sqlx::query(&sql).bind(&ids).bind(&bodies).execute(pool).await?;
    Ok(result.rows_affected())
}
