//! Job photos: the one table with batch operations and a blob in an external
//! media store.
//!
//! Batch semantics are partial-failure by design: each item is validated on
//! its own, invalid items land in the skip list with a machine-readable code,
//! and the valid remainder still goes through a single bulk write. Referential
//! checks against the schedule table are made once per batch over the set of
//! distinct schedule ids, not once per item.
//!
//! Delete is idempotent and dual-store safe: the blob is removed before the
//! row, and the row is retained whenever the blob's fate is unknown.

use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use sqlx::PgPool;
use url::Url;

use crate::database::{documents, schema};
use crate::services::media::{self, DestroyOutcome, MediaStorage};
use crate::sync::handler::TableHandler;
use crate::sync::result::{batch_summary, HandlerResult, SkipCode, SkippedItem};
use crate::sync::validate::{is_valid_object_id, require_str, str_field};

use super::util;

pub const PHOTO_TYPES: &[&str] = &["before", "after", "estimate", "signature"];

/// Fields a patch may touch. `scheduleId` is deliberately absent: a photo
/// never moves between schedules, so patch never needs a referential
/// re-check.
const PATCHABLE_FIELDS: &[&str] = &["type", "signerName", "cloudinaryUrl", "caption", "takenAt"];

fn validate_type(doc: &Value) -> Result<(), String> {
    let photo_type = require_str(doc, "type")?;
    if !PHOTO_TYPES.contains(&photo_type) {
        return Err(format!(
            "type '{}' must be one of {}",
            photo_type,
            PHOTO_TYPES.join(", ")
        ));
    }
    Ok(())
}

/// A signature photo must carry a non-empty signer name. Judged on whatever
/// state is passed in; batch patch calls this on the merged record.
fn validate_signature_rule(doc: &Value) -> Result<(), String> {
    if str_field(doc, "type") == Some("signature") {
        match str_field(doc, "signerName") {
            Some(name) if !name.trim().is_empty() => {}
            _ => return Err("signature photos require a signerName".into()),
        }
    }
    Ok(())
}

fn validate_url_field(doc: &Value) -> Result<(), String> {
    match doc.get("cloudinaryUrl") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::String(raw)) => Url::parse(raw)
            .map(|_| ())
            .map_err(|_| format!("cloudinaryUrl '{}' is not a valid URL", raw)),
        Some(_) => Err("cloudinaryUrl must be a string".into()),
    }
}

/// Full-record validation for put and batch-put items. The id is checked
/// separately so batch screening can label skips.
fn validate_photo(doc: &Value) -> Result<(), String> {
    let schedule_id = require_str(doc, "scheduleId")?;
    if !is_valid_object_id(schedule_id) {
        return Err(format!("scheduleId '{}' is not a valid record id", schedule_id));
    }
    require_str(doc, "technicianId")?;
    validate_type(doc)?;
    validate_signature_rule(doc)?;
    validate_url_field(doc)?;
    Ok(())
}

/// Skip-list label for an item whose id may be missing or malformed
fn item_label(item: &Value, index: usize) -> String {
    match str_field(item, "id") {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => format!("item[{}]", index),
    }
}

struct PutCandidate {
    id: String,
    schedule_id: String,
    doc: Value,
}

/// Independent per-item validation for batch put. Invalid items never reach
/// the database; duplicates of an id already seen in this batch are rejected.
fn screen_batch_put(items: Vec<Value>) -> (Vec<PutCandidate>, Vec<SkippedItem>) {
    let mut candidates = Vec::new();
    let mut skipped = Vec::new();
    let mut seen = HashSet::new();

    for (index, item) in items.into_iter().enumerate() {
        let label = item_label(&item, index);

        let id = match str_field(&item, "id") {
            Some(id) if is_valid_object_id(id) => id.to_string(),
            Some(id) => {
                skipped.push(SkippedItem::new(
                    label,
                    format!("id '{}' is not a valid record id", id),
                    SkipCode::Validation,
                ));
                continue;
            }
            None => {
                skipped.push(SkippedItem::new(label, "id is required", SkipCode::Validation));
                continue;
            }
        };

        if !seen.insert(id.clone()) {
            skipped.push(SkippedItem::new(id, "duplicate id in batch", SkipCode::Validation));
            continue;
        }

        if let Err(reason) = validate_photo(&item) {
            skipped.push(SkippedItem::new(id, reason, SkipCode::Validation));
            continue;
        }

        let schedule_id = item["scheduleId"].as_str().unwrap_or_default().to_string();
        candidates.push(PutCandidate { id, schedule_id, doc: item });
    }

    (candidates, skipped)
}

/// Drop candidates whose schedule is missing from the store. Well-formed but
/// unsatisfiable, so the code is MISSING_REFERENCE rather than a validation
/// failure.
fn apply_schedule_check(
    candidates: Vec<PutCandidate>,
    existing: &HashSet<String>,
) -> (Vec<(String, Value)>, Vec<SkippedItem>) {
    let mut writes = Vec::new();
    let mut skipped = Vec::new();

    for candidate in candidates {
        if existing.contains(&candidate.schedule_id) {
            writes.push((candidate.id, candidate.doc));
        } else {
            skipped.push(SkippedItem::new(
                candidate.id,
                format!("schedule {} does not exist", candidate.schedule_id),
                SkipCode::MissingReference,
            ));
        }
    }

    (writes, skipped)
}

struct PatchCandidate {
    id: String,
    fields: Map<String, Value>,
}

/// Independent per-item screening for batch patch: id shape, duplicate ids,
/// recognized-field extraction, and field-level type checks. Existence and
/// effective-state rules need the stored records and come later.
fn screen_batch_patch(items: Vec<Value>) -> (Vec<PatchCandidate>, Vec<SkippedItem>) {
    let mut candidates = Vec::new();
    let mut skipped = Vec::new();
    let mut seen = HashSet::new();

    for (index, item) in items.into_iter().enumerate() {
        let label = item_label(&item, index);

        let id = match str_field(&item, "id") {
            Some(id) if is_valid_object_id(id) => id.to_string(),
            Some(id) => {
                skipped.push(SkippedItem::new(
                    label,
                    format!("id '{}' is not a valid record id", id),
                    SkipCode::Validation,
                ));
                continue;
            }
            None => {
                skipped.push(SkippedItem::new(label, "id is required", SkipCode::Validation));
                continue;
            }
        };

        if !seen.insert(id.clone()) {
            skipped.push(SkippedItem::new(id, "duplicate id in batch", SkipCode::Validation));
            continue;
        }

        if let Err(reason) = validate_url_field(&item) {
            skipped.push(SkippedItem::new(id, reason, SkipCode::Validation));
            continue;
        }

        let mut fields = Map::new();
        if let Value::Object(map) = &item {
            for (key, value) in map {
                if PATCHABLE_FIELDS.contains(&key.as_str()) {
                    fields.insert(key.clone(), value.clone());
                }
            }
        }
        if fields.is_empty() {
            skipped.push(SkippedItem::new(
                id,
                "no recognized photo field to update",
                SkipCode::EmptyUpdate,
            ));
            continue;
        }

        candidates.push(PatchCandidate { id, fields });
    }

    (candidates, skipped)
}

/// Merge a patch candidate over its stored record and re-validate what the
/// merge could have broken: the type enum and the signature rule hold on the
/// effective state, not the patch alone.
fn merge_and_validate(candidate: &PatchCandidate, existing: &Value) -> Result<Value, String> {
    let merged = util::merge_patch(existing, &Value::Object(candidate.fields.clone()));
    validate_type(&merged)?;
    validate_signature_rule(&merged)?;
    Ok(merged)
}

pub struct PhotoHandler;

#[async_trait]
impl TableHandler for PhotoHandler {
    fn table(&self) -> &'static str {
        "photos"
    }

    async fn put(&self, pool: &PgPool, data: Value) -> HandlerResult {
        let id = match str_field(&data, "id") {
            Some(id) if is_valid_object_id(id) => id.to_string(),
            Some(id) => {
                return HandlerResult::validation_error(format!(
                    "id '{}' is not a valid record id",
                    id
                ))
            }
            None => return HandlerResult::validation_error("id is required"),
        };
        if let Err(msg) = validate_photo(&data) {
            return HandlerResult::validation_error(msg);
        }

        let schedule_id = data["scheduleId"].as_str().unwrap_or_default().to_string();
        match documents::fetch(pool, schema::SCHEDULES, &schedule_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return HandlerResult::not_found(format!("schedule {} does not exist", schedule_id))
            }
            Err(e) => return util::db_failure(self.table(), "schedule lookup", e),
        }

        let mut doc = data;
        util::stamp_put(&mut doc);
        match documents::upsert(pool, schema::PHOTOS, &id, &doc).await {
            Ok(stored) => HandlerResult::success(stored),
            Err(e) => util::db_failure(self.table(), "upsert", e),
        }
    }

    async fn batch_put(&self, pool: &PgPool, items: Vec<Value>) -> HandlerResult {
        let (candidates, mut skipped) = screen_batch_put(items);

        // One existence query for the whole batch
        let schedule_ids: Vec<String> = candidates
            .iter()
            .map(|c| c.schedule_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let existing = match documents::ids_exist(pool, schema::SCHEDULES, &schedule_ids).await {
            Ok(found) => found,
            Err(e) => return util::db_failure(self.table(), "schedule lookup", e),
        };

        let (mut writes, missing) = apply_schedule_check(candidates, &existing);
        skipped.extend(missing);

        for (_, doc) in writes.iter_mut() {
            util::stamp_put(doc);
        }

        let report = match documents::bulk_upsert(pool, schema::PHOTOS, &writes).await {
            Ok(report) => report,
            Err(e) => return util::db_failure(self.table(), "bulk upsert", e),
        };

        HandlerResult::success(batch_summary(
            report.updated,
            report.updated,
            report.inserted,
            &skipped,
        ))
    }

    async fn patch(&self, pool: &PgPool, data: Value) -> HandlerResult {
        let (mut candidates, skipped) = screen_batch_patch(vec![data]);
        let Some(candidate) = candidates.pop() else {
            // Single-record operations surface the first failure directly
            let skip = skipped.into_iter().next();
            return match skip {
                Some(item) => HandlerResult::validation_error(item.reason),
                None => HandlerResult::validation_error("invalid photo patch"),
            };
        };

        let existing = match documents::fetch(pool, schema::PHOTOS, &candidate.id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                return HandlerResult::not_found(format!("photo {} not found", candidate.id))
            }
            Err(e) => return util::db_failure(self.table(), "fetch", e),
        };

        let mut merged = match merge_and_validate(&candidate, &existing) {
            Ok(merged) => merged,
            Err(msg) => return HandlerResult::validation_error(msg),
        };

        util::stamp_update(&mut merged);
        match documents::replace(pool, schema::PHOTOS, &candidate.id, &merged).await {
            Ok(true) => HandlerResult::success(merged),
            Ok(false) => HandlerResult::not_found(format!("photo {} not found", candidate.id)),
            Err(e) => util::db_failure(self.table(), "update", e),
        }
    }

    fn supports_batch_patch(&self) -> bool {
        true
    }

    async fn batch_patch(&self, pool: &PgPool, items: Vec<Value>) -> HandlerResult {
        let (candidates, mut skipped) = screen_batch_patch(items);

        let ids: Vec<String> = candidates.iter().map(|c| c.id.clone()).collect();
        let stored = match documents::fetch_many(pool, schema::PHOTOS, &ids).await {
            Ok(stored) => stored,
            Err(e) => return util::db_failure(self.table(), "fetch", e),
        };

        let mut writes: Vec<(String, Value)> = Vec::new();
        for candidate in candidates {
            let Some(existing) = stored.get(&candidate.id) else {
                skipped.push(SkippedItem::new(
                    candidate.id,
                    "photo not found",
                    SkipCode::NotFound,
                ));
                continue;
            };
            match merge_and_validate(&candidate, existing) {
                Ok(mut merged) => {
                    util::stamp_update(&mut merged);
                    writes.push((candidate.id, merged));
                }
                Err(reason) => {
                    skipped.push(SkippedItem::new(candidate.id, reason, SkipCode::Validation));
                }
            }
        }

        let matched = match documents::bulk_update(pool, schema::PHOTOS, &writes).await {
            Ok(matched) => matched,
            Err(e) => return util::db_failure(self.table(), "bulk update", e),
        };

        HandlerResult::success(batch_summary(matched, matched, 0, &skipped))
    }

    /// Dual-store delete. Returns success with `alreadyDeleted: true` when the
    /// row is absent; a mobile retry after a dropped response must not see an
    /// error for a delete that already happened.
    async fn delete(&self, pool: &PgPool, id: &str) -> HandlerResult {
        let doc = match documents::fetch(pool, schema::PHOTOS, id).await {
            Ok(Some(doc)) => doc,
            Ok(None) => return HandlerResult::success(json!({"alreadyDeleted": true, "id": id})),
            Err(e) => return util::db_failure(self.table(), "fetch", e),
        };

        if let Some(stored_url) = str_field(&doc, "cloudinaryUrl").filter(|u| !u.is_empty()) {
            // Blob first. The row is only removed once the blob is known gone,
            // so a failed attempt can be retried without losing track of the
            // asset.
            let Some(public_id) = media::public_id_from_url(stored_url) else {
                return HandlerResult::storage_error(format!(
                    "could not determine asset id from stored URL for photo {}",
                    id
                ));
            };

            let storage = match MediaStorage::from_config() {
                Ok(storage) => storage,
                Err(e) => {
                    tracing::warn!("photo {} delete blocked: {}", id, e);
                    return HandlerResult::storage_error("media storage is not configured");
                }
            };

            match storage.destroy(&public_id).await {
                Ok(DestroyOutcome::Removed) | Ok(DestroyOutcome::NotFound) => {}
                Ok(DestroyOutcome::Other(status)) => {
                    tracing::warn!("photo {} asset {} not deletable: {}", id, public_id, status);
                    return HandlerResult::storage_error(format!(
                        "media store refused to delete asset: {}",
                        status
                    ));
                }
                Err(e) => {
                    tracing::warn!("photo {} asset {} delete failed: {}", id, public_id, e);
                    return HandlerResult::storage_error("media asset deletion failed");
                }
            }
        }

        match documents::delete(pool, schema::PHOTOS, id).await {
            // A concurrent delete winning the race is still a success
            Ok(_) => HandlerResult::success(json!({"deleted": true, "id": id})),
            Err(e) => util::db_failure(self.table(), "delete", e),
        }
    }
}
