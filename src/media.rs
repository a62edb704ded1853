//! Cloudinary client for post images and avatars.
//!
//! Uses the signed upload API directly over HTTPS. Credentials come from
//! [`MediaConfig`] and are never mutated after startup, so one client is shared
//! by every request.

use std::time::Duration;

use chrono::Utc;
use reqwest::{multipart, Client};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::{info, warn};

use crate::config::MediaConfig;
use crate::error::ApiError;
use crate::upload::MemoryFile;

pub const POSTS_FOLDER: &str = "blog/posts";
pub const AVATARS_FOLDER: &str = "blog/avatars";

/// Image stored on the media host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoredImage {
    pub public_id: String,
    pub secure_url: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

pub struct MediaClient {
    cloud_name: String,
    api_key: String,
    api_secret: String,
    base_url: String,
    http_client: Client,
}

impl MediaClient {
    pub fn from_config(config: &MediaConfig) -> Result<Self, ApiError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("Failed to create HTTP client: {e}")))?;

        info!(cloud_name = %config.cloud_name, "Media host client initialized");

        Ok(Self {
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/v1_1/{}/image/{}", self.base_url, self.cloud_name, action)
    }

    /// Uploads an in-memory image into `folder`.
    pub async fn upload_image(&self, file: &MemoryFile, folder: &str) -> Result<StoredImage, ApiError> {
        file.ensure_image()?;

        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("folder", folder), ("timestamp", timestamp.as_str())],
            &self.api_secret,
        );

        let mut part = multipart::Part::stream_with_length(file.bytes.clone(), file.size() as u64)
            .file_name(file.file_name.clone().unwrap_or_else(|| "upload".to_string()));
        if let Some(ref content_type) = file.content_type {
            part = part.mime_str(content_type).map_err(|_| {
                ApiError::validation(format!(
                    "Field '{}' has an invalid content type",
                    file.field_name
                ))
            })?;
        }

        let form = multipart::Form::new()
            .part("file", part)
            .text("api_key", self.api_key.clone())
            .text("folder", folder.to_string())
            .text("timestamp", timestamp)
            .text("signature", signature);

        let response = self
            .http_client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let stored: StoredImage = response.json().await?;
        info!(public_id = %stored.public_id, bytes = file.size(), "Uploaded image to media host");
        Ok(stored)
    }

    /// Removes an image. A missing image is not an error.
    pub async fn destroy(&self, public_id: &str) -> Result<(), ApiError> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("public_id", public_id), ("timestamp", timestamp.as_str())],
            &self.api_secret,
        );

        let params = [
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp),
            ("api_key", self.api_key.clone()),
            ("signature", signature),
        ];

        let response = self
            .http_client
            .post(self.endpoint("destroy"))
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error(response).await);
        }

        let outcome: DestroyResponse = response.json().await?;
        match outcome.result.as_str() {
            "ok" => info!(public_id = %public_id, "Deleted image from media host"),
            "not found" => warn!(public_id = %public_id, "Image already absent from media host"),
            other => {
                return Err(ApiError::Media(format!(
                    "Unexpected destroy result '{}' for {}",
                    other, public_id
                )))
            }
        }

        Ok(())
    }

    /// Best-effort cleanup used after the database row is already gone.
    pub async fn destroy_quietly(&self, public_id: &str) {
        if let Err(e) = self.destroy(public_id).await {
            warn!(public_id = %public_id, "Failed to delete image from media host: {}", e);
        }
    }
}

async fn upstream_error(response: reqwest::Response) -> ApiError {
    let status = response.status();
    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error.message,
        Err(_) => "no error details".to_string(),
    };
    ApiError::Media(format!("{} ({})", message, status))
}

/// Cloudinary request signature: params sorted by name, joined as `k=v`
/// with `&`, the API secret appended, SHA-1 hex digest.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}
