//! Cloudinary Image Host
//!
//! Unsigned uploads through an upload preset; deletion is signed and needs
//! the API key and secret.

use std::sync::Arc;

use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::application::config::ImageHostConfig;
use crate::domain::entity::ProductImage;
use crate::domain::image_host::{ImageHost, ImageHostError};

#[derive(Clone)]
pub struct CloudinaryClient {
    http: reqwest::Client,
    config: Arc<ImageHostConfig>,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl CloudinaryClient {
    pub fn new(http: reqwest::Client, config: Arc<ImageHostConfig>) -> Self {
        Self { http, config }
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/{}/image/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.cloud_name,
            action
        )
    }
}

/// `sha1(public_id=..&timestamp=..<secret>)`, parameters in alphabetical order
fn destroy_signature(public_id: &str, timestamp: i64, secret: &str) -> String {
    let to_sign = format!("public_id={public_id}&timestamp={timestamp}{secret}");
    platform::crypto::sha1_hex(to_sign.as_bytes())
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string())
}

impl ImageHost for CloudinaryClient {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        folder: &str,
    ) -> Result<ProductImage, ImageHostError> {
        let size = bytes.len();
        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name.to_string()))
            .text("upload_preset", self.config.upload_preset.clone())
            .text("folder", folder.to_string());

        let response = self
            .http
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ImageHostError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImageHostError::Upload(error_message(&body)));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| ImageHostError::Upload(e.to_string()))?;

        tracing::info!(public_id = %uploaded.public_id, bytes = size, "Image uploaded");

        Ok(ProductImage {
            url: uploaded.secure_url,
            public_id: Some(uploaded.public_id),
            width: uploaded.width,
            height: uploaded.height,
        })
    }

    async fn delete(&self, public_id: &str) -> Result<bool, ImageHostError> {
        let Some((api_key, api_secret)) = self.config.credentials() else {
            tracing::debug!(public_id, "No image host credentials, skipping deletion");
            return Ok(false);
        };

        let timestamp = Utc::now().timestamp();
        let signature = destroy_signature(public_id, timestamp, api_secret);
        let timestamp = timestamp.to_string();
        let params = [
            ("public_id", public_id),
            ("timestamp", timestamp.as_str()),
            ("api_key", api_key),
            ("signature", signature.as_str()),
        ];

        let response = self
            .http
            .post(self.endpoint("destroy"))
            .form(&params)
            .send()
            .await
            .map_err(|e| ImageHostError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ImageHostError::Delete(error_message(&body)));
        }

        let destroyed: DestroyResponse = response
            .json()
            .await
            .map_err(|e| ImageHostError::Delete(e.to_string()))?;

        Ok(destroyed.result == "ok")
    }
}
