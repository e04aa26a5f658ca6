//! Expo push-notification tokens.
//!
//! The token string is the record's natural external identity: upserts,
//! patches, and deletes all key on the token value itself, never on a
//! caller-supplied id. The row key in the document table is the token.

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::database::{documents, schema};
use crate::sync::handler::TableHandler;
use crate::sync::result::HandlerResult;
use crate::sync::validate::{require_str, str_field};

use super::util;

const PLATFORMS: &[&str] = &["ios", "android"];

/// Expo bracket-token shape: `ExponentPushToken[body]` (or the legacy
/// `ExpoPushToken[body]`), body non-empty URL-safe characters.
pub fn is_valid_expo_token(token: &str) -> bool {
    let inner = token
        .strip_prefix("ExponentPushToken[")
        .or_else(|| token.strip_prefix("ExpoPushToken["));
    match inner.and_then(|rest| rest.strip_suffix(']')) {
        Some(body) => {
            !body.is_empty()
                && body
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        }
        None => false,
    }
}

fn validate_push_token(doc: &Value) -> Result<String, String> {
    let token = require_str(doc, "token")?;
    if !is_valid_expo_token(token) {
        return Err(format!("token '{}' is not a valid Expo push token", token));
    }
    if let Some(platform) = str_field(doc, "platform") {
        if !PLATFORMS.contains(&platform) {
            return Err(format!(
                "platform '{}' must be one of {}",
                platform,
                PLATFORMS.join(", ")
            ));
        }
    }
    Ok(token.to_string())
}

pub struct PushTokenHandler;

#[async_trait]
impl TableHandler for PushTokenHandler {
    fn table(&self) -> &'static str {
        "expopushtokens"
    }

    async fn put(&self, pool: &PgPool, data: Value) -> HandlerResult {
        let token = match validate_push_token(&data) {
            Ok(token) => token,
            Err(msg) => return HandlerResult::validation_error(msg),
        };

        let mut doc = data;
        util::stamp_put(&mut doc);
        match documents::upsert(pool, schema::EXPO_PUSH_TOKENS, &token, &doc).await {
            Ok(stored) => HandlerResult::success(stored),
            Err(e) => util::db_failure(self.table(), "upsert", e),
        }
    }

    async fn patch(&self, pool: &PgPool, data: Value) -> HandlerResult {
        let token = match require_str(&data, "token") {
            Ok(token) => token.to_string(),
            Err(msg) => return HandlerResult::validation_error(msg),
        };

        let existing = match documents::fetch(pool, schema::EXPO_PUSH_TOKENS, &token).await {
            Ok(Some(doc)) => doc,
            Ok(None) => return HandlerResult::not_found(format!("push token {} not found", token)),
            Err(e) => return util::db_failure(self.table(), "fetch", e),
        };

        let mut merged = util::merge_patch(&existing, &data);
        if let Err(msg) = validate_push_token(&merged) {
            return HandlerResult::validation_error(msg);
        }

        util::stamp_update(&mut merged);
        match documents::replace(pool, schema::EXPO_PUSH_TOKENS, &token, &merged).await {
            Ok(true) => HandlerResult::success(merged),
            Ok(false) => HandlerResult::not_found(format!("push token {} not found", token)),
            Err(e) => util::db_failure(self.table(), "update", e),
        }
    }

    /// Delete receives the token value in the envelope's id slot
    async fn delete(&self, pool: &PgPool, id: &str) -> HandlerResult {
        match documents::delete(pool, schema::EXPO_PUSH_TOKENS, id).await {
            Ok(0) => HandlerResult::not_found(format!("push token {} not found", id)),
            Ok(_) => HandlerResult::success(json!({"deleted": true, "token": id})),
            Err(e) => util::db_failure(self.table(), "delete", e),
        }
    }
}
