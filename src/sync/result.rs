// Handler result vocabulary shared by every table handler.
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Machine-readable error kinds carried on failed handler results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    #[serde(rename = "NOT_FOUND")]
    NotFound,
    #[serde(rename = "SERVER_ERROR")]
    Server,
    #[serde(rename = "STORAGE_ERROR")]
    Storage,
}

impl ErrorKind {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Server => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Server => "SERVER_ERROR",
            ErrorKind::Storage => "STORAGE_ERROR",
        }
    }
}

/// Per-item failure codes for batch operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipCode {
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    #[serde(rename = "NOT_FOUND")]
    NotFound,
    #[serde(rename = "MISSING_REFERENCE")]
    MissingReference,
    #[serde(rename = "EMPTY_UPDATE")]
    EmptyUpdate,
}

/// One batch item excluded from the bulk write without failing the batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedItem {
    pub id: String,
    pub reason: String,
    pub code: SkipCode,
}

impl SkippedItem {
    pub fn new(id: impl Into<String>, reason: impl Into<String>, code: SkipCode) -> Self {
        Self { id: id.into(), reason: reason.into(), code }
    }
}

/// Universal return type of every handler operation.
///
/// Built only through the constructors below so every error carries a stable
/// (status, kind, message) triple no matter which handler raised it.
#[derive(Debug, Clone)]
pub struct HandlerResult {
    pub success: bool,
    pub status: StatusCode,
    pub data: Option<Value>,
    pub error: Option<ErrorKind>,
    pub message: Option<String>,
}

impl HandlerResult {
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            status: StatusCode::OK,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::failure(ErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::failure(ErrorKind::NotFound, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::failure(ErrorKind::Server, message)
    }

    pub fn storage_error(message: impl Into<String>) -> Self {
        Self::failure(ErrorKind::Storage, message)
    }

    fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status: kind.status(),
            data: None,
            error: Some(kind),
            message: Some(message.into()),
        }
    }

    /// Response body: `success` plus whichever of data/error/message are present
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        body.insert("success".into(), Value::Bool(self.success));
        if let Some(data) = &self.data {
            body.insert("data".into(), data.clone());
        }
        if let Some(kind) = &self.error {
            body.insert("error".into(), Value::String(kind.as_str().into()));
        }
        if let Some(message) = &self.message {
            body.insert("message".into(), Value::String(message.clone()));
        }
        Value::Object(body)
    }
}

impl IntoResponse for HandlerResult {
    fn into_response(self) -> axum::response::Response {
        let status = self.status;
        (status, Json(self.to_json())).into_response()
    }
}

/// Summary block returned by the photo batch operations
pub fn batch_summary(
    matched: u64,
    modified: u64,
    upserted: u64,
    skipped: &[SkippedItem],
) -> Value {
    json!({
        "matched": matched,
        "modified": modified,
        "upserted": upserted,
        "skipped": skipped.len(),
        "skippedItems": skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_carry_status_and_kind() {
        let v = HandlerResult::validation_error("bad startTime");
        assert!(!v.success);
        assert_eq!(v.status, StatusCode::BAD_REQUEST);
        assert_eq!(v.error, Some(ErrorKind::Validation));

        let nf = HandlerResult::not_found("no such record");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);

        let se = HandlerResult::server_error("boom");
        assert_eq!(se.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(se.error, Some(ErrorKind::Server));

        let st = HandlerResult::storage_error("asset delete failed");
        assert_eq!(st.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(st.error, Some(ErrorKind::Storage));
    }

    #[test]
    fn success_body_omits_error_fields() {
        let r = HandlerResult::success(json!({"id": "abc"}));
        let body = r.to_json();
        assert_eq!(body["success"], Value::Bool(true));
        assert_eq!(body["data"]["id"], "abc");
        assert!(body.get("error").is_none());
        assert!(body.get("message").is_none());
    }

    #[test]
    fn failure_body_carries_wire_kind() {
        let body = HandlerResult::validation_error("missing id").to_json();
        assert_eq!(body["success"], Value::Bool(false));
        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert_eq!(body["message"], "missing id");
    }

    #[test]
    fn skip_codes_serialize_to_wire_names() {
        let item = SkippedItem::new("abc", "schedule does not exist", SkipCode::MissingReference);
        let v = serde_json::to_value(&item).unwrap();
        assert_eq!(v["code"], "MISSING_REFERENCE");
        assert_eq!(
            serde_json::to_value(SkipCode::EmptyUpdate).unwrap(),
            "EMPTY_UPDATE"
        );
    }

    #[test]
    fn batch_summary_counts_skips() {
        let skipped = vec![
            SkippedItem::new("a", "bad url", SkipCode::Validation),
            SkippedItem::new("b", "not found", SkipCode::NotFound),
        ];
        let v = batch_summary(3, 2, 1, &skipped);
        assert_eq!(v["matched"], 3);
        assert_eq!(v["upserted"], 1);
        assert_eq!(v["skipped"], 2);
        assert_eq!(v["skippedItems"][0]["code"], "VALIDATION_ERROR");
    }
}
