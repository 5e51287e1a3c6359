//! HTTP uploader adapter for the transcription backend

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::application::ports::{UploadError, UploadFile, UploadReceipt, Uploader};
use crate::domain::recording::Duration;

/// Upload endpoint, relative to the API base URL
const UPLOAD_PATH: &str = "/transcriptions/upload";

// Response types

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranscriptionId {
    Text(String),
    Number(u64),
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: TranscriptionId,
    #[serde(default)]
    status: Option<String>,
}

impl UploadResponse {
    fn into_receipt(self) -> UploadReceipt {
        UploadReceipt {
            transcription_id: match self.id {
                TranscriptionId::Text(id) => id,
                TranscriptionId::Number(id) => id.to_string(),
            },
            status: self.status.unwrap_or_else(|| "accepted".to_string()),
        }
    }
}

/// Multipart uploader for `POST {api_url}/transcriptions/upload`
pub struct HttpUploader {
    api_url: String,
    api_key: String,
    timeout: StdDuration,
    client: reqwest::Client,
}

impl HttpUploader {
    /// Create a new uploader for the given API base URL and key
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            timeout: Duration::default_upload_timeout().as_std(),
            client: reqwest::Client::new(),
        }
    }

    /// Override the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout.as_std();
        self
    }

    /// Build the upload URL
    fn upload_url(&self) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), UPLOAD_PATH)
    }

    /// Build the multipart body
    fn build_form(file: &UploadFile) -> Result<Form, UploadError> {
        let part = Part::bytes(file.audio.data().to_vec())
            .file_name(file.file_name.clone())
            .mime_str(file.audio.mime_type().as_str())
            .map_err(|e| UploadError::RequestFailed(e.to_string()))?;

        let metadata = &file.metadata;
        let mut form = Form::new()
            .part("file", part)
            .text("source", metadata.source.as_str().to_string())
            .text("duration_seconds", format!("{:.3}", metadata.duration_seconds))
            .text("recorded_at", metadata.recorded_at.to_rfc3339());
        if let Some(title) = &metadata.title {
            form = form.text("title", title.clone());
        }

        Ok(form)
    }

    /// Map a non-success status onto the upload error taxonomy
    fn status_error(status: StatusCode, body: String) -> UploadError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => UploadError::Unauthorized,
            StatusCode::PAYMENT_REQUIRED => UploadError::QuotaExceeded,
            StatusCode::PAYLOAD_TOO_LARGE => UploadError::PayloadTooLarge,
            StatusCode::TOO_MANY_REQUESTS => UploadError::RateLimited,
            _ => UploadError::ApiError(format!("HTTP {}: {}", status, body)),
        }
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, file: &UploadFile) -> Result<UploadReceipt, UploadError> {
        if self.api_key.trim().is_empty() {
            return Err(UploadError::MissingApiKey);
        }

        let url = self.upload_url();
        let form = Self::build_form(file)?;
        debug!(url = %url, file = %file.file_name, "Sending upload request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Self::status_error(status, error_text));
        }

        let response: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::ParseError(e.to_string()))?;

        Ok(response.into_receipt())
    }
}
