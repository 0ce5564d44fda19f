//! Package photo uploads to the hosted image service.
//!
//! Uploads are unsigned: the form carries the upload preset instead of an API
//! secret, so the same preset can be used from a browser.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info};

const API_ROOT: &str = "https://api.cloudinary.com/v1_1";

/// Largest photo accepted, in bytes.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// A stored photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    /// Public HTTPS URL
    pub url: String,
    /// Identifier within the image service
    pub public_id: String,
}

/// Somewhere photos can be uploaded to.
#[async_trait]
pub trait PhotoHost: Send + Sync {
    /// Stores one image and returns its public URL.
    async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedImage>;
}

/// Checks an upload before anything is sent.
///
/// # Errors
/// Returns `Error::Validation` for empty files, non-image content types and
/// files above [`MAX_IMAGE_BYTES`].
pub fn validate_upload(content_type: &str, len: usize) -> Result<()> {
    if len == 0 {
        return Err(Error::validation("Photo file is empty"));
    }
    if !content_type.starts_with("image/") {
        return Err(Error::validation(format!(
            "Only image files can be uploaded, got '{content_type}'"
        )));
    }
    if len > MAX_IMAGE_BYTES {
        return Err(Error::validation(format!(
            "Photo is {:.1} MB, the limit is {} MB",
            bytes_to_mb(len),
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

#[allow(clippy::cast_precision_loss)] // file sizes are far below 2^52
fn bytes_to_mb(len: usize) -> f64 {
    len as f64 / (1024.0 * 1024.0)
}

/// Success body of an upload
#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

/// [`PhotoHost`] backed by the hosted image service.
#[derive(Clone)]
pub struct CloudinaryUploader {
    client: Client,
    api_root: String,
    cloud_name: String,
    upload_preset: String,
    folder: Option<String>,
}

impl CloudinaryUploader {
    /// Creates an uploader for one cloud and unsigned preset.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        cloud_name: impl Into<String>,
        upload_preset: impl Into<String>,
        folder: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            client,
            api_root: API_ROOT.to_string(),
            cloud_name: cloud_name.into(),
            upload_preset: upload_preset.into(),
            folder,
        })
    }

    fn upload_url(&self) -> String {
        format!("{}/{}/image/upload", self.api_root, self.cloud_name)
    }
}

#[async_trait]
impl PhotoHost for CloudinaryUploader {
    async fn upload(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedImage> {
        validate_upload(content_type, bytes.len())?;
        let size = bytes.len();

        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)?;
        let mut form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());
        if let Some(folder) = &self.folder {
            form = form.text("folder", folder.clone());
        }

        let response = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Upload failed"))
                .to_string();
            error!(status = status.as_u16(), %message, file_name, "Photo upload rejected");
            return Err(Error::ImageService { message });
        }

        let uploaded: UploadResponse = response.json().await?;
        info!(file_name, size, public_id = %uploaded.public_id, "Photo uploaded");
        Ok(UploadedImage {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_upload() {
        assert!(validate_upload("image/jpeg", 2048).is_ok());
        assert!(validate_upload("image/png", MAX_IMAGE_BYTES).is_ok());
        assert!(matches!(
            validate_upload("image/png", 0),
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            validate_upload("application/pdf", 2048),
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            validate_upload("image/png", MAX_IMAGE_BYTES + 1),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_upload_url() -> Result<()> {
        let uploader = CloudinaryUploader::new("shiplink", "unsigned_items", None)?;
        assert_eq!(
            uploader.upload_url(),
            "https://api.cloudinary.com/v1_1/shiplink/image/upload"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_before_network() -> Result<()> {
        // must fail validation before any request is sent
        let uploader = CloudinaryUploader::new("unused", "unused", None)?;
        let result = uploader.upload("notes.txt", "text/plain", b"hi".to_vec()).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }
}
