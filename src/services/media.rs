// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Media CDN client for uploading and deleting user images.
//!
//! Handles:
//! - Multipart uploads returning a durable URL + public id
//! - Deletion of replaced assets by public id
//! - HMAC-SHA256 request signing with the provider API secret

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::error::AppError;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// Result of a successful upload.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaUpload {
    /// Provider-side identifier, needed to delete the asset later
    pub public_id: String,
    /// Durable URL to store and serve
    pub url: String,
}

impl From<MediaUpload> for crate::models::MediaAsset {
    fn from(upload: MediaUpload) -> Self {
        Self {
            public_id: upload.public_id,
            url: upload.url,
        }
    }
}

/// Media CDN client.
#[derive(Clone)]
pub struct MediaService {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    offline: bool,
}

impl MediaService {
    /// Create a new media client with provider credentials.
    pub fn new(base_url: String, api_key: String, api_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            api_secret,
            offline: false,
        }
    }

    /// Create a mock media client for testing (offline mode).
    ///
    /// Uploads return deterministic `mock://` assets and deletes succeed
    /// without any network traffic.
    pub fn new_mock() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            offline: true,
        }
    }

    /// Upload a file, returning the stored asset's id and URL.
    pub async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<MediaUpload, AppError> {
        if self.offline {
            return Ok(MediaUpload {
                public_id: format!("mock/{}", file_name),
                url: format!("mock://media/{}", file_name),
            });
        }

        if bytes.is_empty() {
            return Err(AppError::MediaUpload("Uploaded file is empty".to_string()));
        }

        let public_id = uuid::Uuid::new_v4().to_string();
        let timestamp = unix_now()?;
        let signature = self.sign(&public_id, timestamp)?;

        let file_part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| AppError::MediaUpload(format!("Invalid content type: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .text("public_id", public_id)
            .text("timestamp", timestamp.to_string())
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
            .part("file", file_part);

        let response = self
            .http
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::MediaUpload(format!("Upload request failed: {}", e)))?;

        let upload: MediaUpload = self.check_response_json(response).await?;

        tracing::info!(public_id = %upload.public_id, "Media upload successful");
        Ok(upload)
    }

    /// Delete an asset by its public id.
    ///
    /// Callers replacing an asset treat a failure here as best-effort
    /// cleanup: the new asset is already committed.
    pub async fn destroy(&self, public_id: &str) -> Result<(), AppError> {
        if self.offline {
            return Ok(());
        }

        let timestamp = unix_now()?;
        let signature = self.sign(public_id, timestamp)?;

        let response = self
            .http
            .post(format!("{}/destroy", self.base_url))
            .form(&[
                ("public_id", public_id),
                ("timestamp", &timestamp.to_string()),
                ("api_key", &self.api_key),
                ("signature", &signature),
            ])
            .send()
            .await
            .map_err(|e| AppError::MediaUpload(format!("Destroy request failed: {}", e)))?;

        self.check_response(response).await?;
        tracing::info!(public_id = %public_id, "Media asset deleted");
        Ok(())
    }

    /// Sign a request over `public_id` + `timestamp` with the API secret.
    fn sign(&self, public_id: &str, timestamp: u64) -> Result<String, AppError> {
        let payload = format!("public_id={}&timestamp={}", public_id, timestamp);

        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
        mac.update(payload.as_bytes());

        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Check response status and return error if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<(), AppError> {
        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, body = %body, "Media provider returned error");

        Err(AppError::MediaUpload(format!(
            "Media provider error ({})",
            status
        )))
    }

    /// Check response status and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Media provider returned error");
            return Err(AppError::MediaUpload(format!(
                "Media provider error ({})",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::MediaUpload(format!("Invalid provider response: {}", e)))
    }
}

fn unix_now() -> Result<u64, AppError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_stable() {
        let service = MediaService::new(
            "http://localhost:9090".to_string(),
            "key".to_string(),
            "secret".to_string(),
        );

        let a = service.sign("asset-1", 1_700_000_000).unwrap();
        let b = service.sign("asset-1", 1_700_000_000).unwrap();
        assert_eq!(a, b);

        // Any input change must change the signature
        assert_ne!(a, service.sign("asset-2", 1_700_000_000).unwrap());
        assert_ne!(a, service.sign("asset-1", 1_700_000_001).unwrap());
    }

    #[tokio::test]
    async fn test_mock_upload_and_destroy() {
        let service = MediaService::new_mock();

        let upload = service
            .upload("avatar.png", "image/png", vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(upload.public_id, "mock/avatar.png");

        service.destroy(&upload.public_id).await.unwrap();
    }
}
