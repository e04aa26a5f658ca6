//! Envelope validation paths: everything here is rejected before the gateway
//! touches the database, so these run green with or without Postgres.

mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn unknown_table_is_rejected_naming_it() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .put(format!("{}/api/sync", server.base_url))
        .bearer_auth(common::auth_token())
        .json(&json!({"table": "clients", "data": {"id": "x"}}))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("clients"));
    assert!(message.contains("photos"));
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .put(format!("{}/api/sync", server.base_url))
        .bearer_auth(common::auth_token())
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["error"], "VALIDATION_ERROR");
    Ok(())
}

#[tokio::test]
async fn missing_data_is_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .put(format!("{}/api/sync", server.base_url))
        .bearer_auth(common::auth_token())
        .json(&json!({"table": "schedules"}))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["message"], "data is required");
    Ok(())
}

#[tokio::test]
async fn put_rejects_batch_shaped_data() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .put(format!("{}/api/sync", server.base_url))
        .bearer_auth(common::auth_token())
        .json(&json!({"table": "photos", "data": [{"id": "a"}]}))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["message"], "data must be a single object");
    Ok(())
}

#[tokio::test]
async fn post_requires_an_item_array() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/sync", server.base_url))
        .bearer_auth(common::auth_token())
        .json(&json!({"table": "photos", "data": {"id": "a"}}))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["message"], "data must be an array of records");

    let res = client
        .post(format!("{}/api/sync", server.base_url))
        .bearer_auth(common::auth_token())
        .json(&json!({"table": "photos", "data": []}))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn batch_patch_is_photos_only() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .patch(format!("{}/api/sync", server.base_url))
        .bearer_auth(common::auth_token())
        .json(&json!({"table": "availabilities", "data": [{"id": "a"}]}))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(body["message"], "batch patch is not supported for availabilities");
    Ok(())
}

#[tokio::test]
async fn delete_requires_an_id() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .delete(format!("{}/api/sync", server.base_url))
        .bearer_auth(common::auth_token())
        .json(&json!({"table": "photos", "data": {}}))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["message"], "data.id is required for delete");
    Ok(())
}
