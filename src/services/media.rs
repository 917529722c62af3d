// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Media host client (Cloudinary) for avatar and cover images.
//!
//! Uploads use Cloudinary's signed upload API with a SHA-256 signature over
//! the request timestamp. Files are read from the local staging path; the
//! caller owns the staging file and its cleanup.

use crate::config::CloudinaryConfig;
use crate::error::AppError;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadedMedia {
    /// Public URL of the stored asset
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryUploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Clone)]
struct CloudinaryClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

#[derive(Clone)]
enum MediaBackend {
    Cloudinary(CloudinaryClient),
    #[cfg(debug_assertions)]
    Mock,
    Offline,
}

/// Media upload service.
#[derive(Clone)]
pub struct MediaService {
    backend: MediaBackend,
}

impl MediaService {
    /// Create a client for the given Cloudinary account.
    pub fn new(config: &CloudinaryConfig) -> Self {
        Self {
            backend: MediaBackend::Cloudinary(CloudinaryClient {
                http: reqwest::Client::new(),
                base_url: format!("https://api.cloudinary.com/v1_1/{}", config.cloud_name),
                api_key: config.api_key.clone(),
                api_secret: config.api_secret.clone(),
            }),
        }
    }

    /// Create a mock media service for testing.
    /// Uploads succeed with a deterministic URL derived from the file name.
    /// Only available in debug/test builds.
    #[cfg(debug_assertions)]
    pub fn new_mock() -> Self {
        Self {
            backend: MediaBackend::Mock,
        }
    }

    /// Create a media service whose uploads always fail.
    pub fn new_offline() -> Self {
        Self {
            backend: MediaBackend::Offline,
        }
    }

    /// Upload a local file and return its hosted URL.
    pub async fn upload(&self, path: &Path) -> Result<UploadedMedia, AppError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        match &self.backend {
            MediaBackend::Cloudinary(client) => client.upload(path, file_name).await,
            #[cfg(debug_assertions)]
            MediaBackend::Mock => {
                // Check the file so a missing staging file fails like the real client.
                tokio::fs::metadata(path)
                    .await
                    .map_err(|e| AppError::Media(format!("Cannot read {}: {}", file_name, e)))?;

                Ok(UploadedMedia {
                    url: format!("https://media.test/vidtube/{}", file_name),
                })
            }
            MediaBackend::Offline => Err(AppError::Media(
                "Media host not configured (offline mode)".to_string(),
            )),
        }
    }
}

impl CloudinaryClient {
    async fn upload(&self, path: &Path, file_name: String) -> Result<UploadedMedia, AppError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::Media(format!("Cannot read {}: {}", file_name, e)))?;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
            .as_secs()
            .to_string();

        let signature = sign_params(&[("timestamp", &timestamp)], &self.api_secret);

        let form = reqwest::multipart::Form::new()
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256")
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name.clone()),
            );

        let response = self
            .http
            .post(format!("{}/auto/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Media(format!("Upload request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Media(format!("HTTP {}: {}", status, body)));
        }

        let uploaded: CloudinaryUploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Media(format!("JSON parse error: {}", e)))?;

        tracing::info!(
            public_id = %uploaded.public_id,
            file = %file_name,
            "File uploaded to media host"
        );

        Ok(UploadedMedia {
            url: uploaded.secure_url,
        })
    }
}

/// Cloudinary request signature: parameters sorted by name, joined as
/// `k=v&k=v`, with the API secret appended, hashed with SHA-256.
fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}
