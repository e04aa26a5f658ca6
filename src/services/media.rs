//! Client for the hosted media store.
//!
//! The gateway consumes exactly one call: `destroy`, used by the photo delete
//! path. The provider discriminates its result by a status string ("ok",
//! "not found", or something else), which callers map onto the dual-store
//! delete rules.

use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

use crate::config;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media storage credentials are not configured")]
    NotConfigured,

    #[error("media API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("media API returned a malformed response: {0}")]
    MalformedResponse(String),
}

/// Provider verdict for a destroy call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestroyOutcome {
    /// Asset deleted
    Removed,
    /// Asset was already gone
    NotFound,
    /// Present but undeletable; carries the provider's status string
    Other(String),
}

pub struct MediaStorage {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    api_base: String,
}

impl MediaStorage {
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            api_base: api_base.into(),
        }
    }

    pub fn from_config() -> Result<Self, MediaError> {
        let storage = &config::config().storage;
        if storage.cloud_name.is_empty() || storage.api_key.is_empty() || storage.api_secret.is_empty()
        {
            return Err(MediaError::NotConfigured);
        }
        Ok(Self::new(
            storage.cloud_name.clone(),
            storage.api_key.clone(),
            storage.api_secret.clone(),
            storage.api_base.clone(),
        ))
    }

    /// Delete an asset by its public id
    pub async fn destroy(&self, public_id: &str) -> Result<DestroyOutcome, MediaError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign(&format!("public_id={}&timestamp={}", public_id, timestamp));

        let endpoint = format!("{}/{}/image/destroy", self.api_base, self.cloud_name);
        let params = [
            ("public_id", public_id),
            ("timestamp", timestamp.as_str()),
            ("api_key", self.api_key.as_str()),
            ("signature", signature.as_str()),
            ("signature_algorithm", "sha256"),
        ];

        let response = self.client.post(&endpoint).form(&params).send().await?;
        let body: Value = response.json().await?;

        match body.get("result").and_then(Value::as_str) {
            Some("ok") => Ok(DestroyOutcome::Removed),
            Some("not found") => Ok(DestroyOutcome::NotFound),
            Some(other) => Ok(DestroyOutcome::Other(other.to_string())),
            None => Err(MediaError::MalformedResponse(body.to_string())),
        }
    }

    /// Provider request signature: sha256 of the sorted params + secret
    fn sign(&self, to_sign: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Extract an asset's public id from its stored delivery URL.
///
/// Delivery URLs look like
/// `https://res.cloudinary.com/<cloud>/image/upload/v1712345678/fieldops/photos/abc.jpg`;
/// the public id is the path after the optional version segment, minus the
/// file extension (`fieldops/photos/abc`).
pub fn public_id_from_url(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    let segments: Vec<&str> = parsed.path_segments()?.filter(|s| !s.is_empty()).collect();

    let upload_idx = segments.iter().position(|s| *s == "upload")?;
    let mut rest = &segments[upload_idx + 1..];

    // Optional version segment: 'v' followed by digits
    if let Some(first) = rest.first() {
        let is_version =
            first.len() > 1 && first.starts_with('v') && first[1..].chars().all(|c| c.is_ascii_digit());
        if is_version {
            rest = &rest[1..];
        }
    }
    if rest.is_empty() {
        return None;
    }

    let joined = rest.join("/");
    let public_id = match joined.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() && !ext.is_empty() && !ext.contains('/') => {
            base.to_string()
        }
        _ => joined,
    };
    Some(public_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_public_id_with_version_and_folder() {
        let url = "https://res.cloudinary.com/fieldops/image/upload/v1712345678/jobs/before/abc123.jpg";
        assert_eq!(public_id_from_url(url).unwrap(), "jobs/before/abc123");
    }

    #[test]
    fn extracts_public_id_without_version() {
        let url = "https://res.cloudinary.com/fieldops/image/upload/abc123.png";
        assert_eq!(public_id_from_url(url).unwrap(), "abc123");
    }

    #[test]
    fn keeps_id_without_extension() {
        let url = "https://res.cloudinary.com/fieldops/image/upload/v1/abc123";
        assert_eq!(public_id_from_url(url).unwrap(), "abc123");
    }

    #[test]
    fn rejects_urls_without_upload_segment() {
        assert_eq!(public_id_from_url("https://example.com/files/abc.jpg"), None);
        assert_eq!(public_id_from_url("not a url"), None);
        assert_eq!(
            public_id_from_url("https://res.cloudinary.com/fieldops/image/upload/"),
            None
        );
    }

    #[test]
    fn signature_is_deterministic_sha256() {
        let store = MediaStorage::new("cloud", "key", "secret", "https://example.com");
        let a = store.sign("public_id=abc&timestamp=100");
        let b = store.sign("public_id=abc&timestamp=100");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, store.sign("public_id=abc&timestamp=101"));
    }
}
