//! Upload port interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::audio::AudioData;
use crate::domain::recording::CaptureSourceKind;

/// Upload errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("Missing API key. Set SCRIBE_API_KEY or configure via 'scribe-recorder config set api_key <key>'")]
    MissingApiKey,

    #[error("Invalid or expired API key")]
    Unauthorized,

    #[error("Transcription quota exceeded")]
    QuotaExceeded,

    #[error("Recording is too large to upload")]
    PayloadTooLarge,

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Upload request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("API error: {0}")]
    ApiError(String),
}

/// Metadata sent with an upload
#[derive(Debug, Clone, PartialEq)]
pub struct UploadMetadata {
    pub title: Option<String>,
    pub source: CaptureSourceKind,
    pub duration_seconds: f64,
    pub recorded_at: DateTime<Utc>,
}

/// A named audio file ready to be submitted
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub audio: AudioData,
    pub metadata: UploadMetadata,
}

/// Backend acknowledgement of an accepted upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub transcription_id: String,
    pub status: String,
}

/// Port for submitting finished recordings
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload a recording.
    ///
    /// # Arguments
    /// * `file` - The packaged recording and its metadata
    ///
    /// # Returns
    /// The backend's receipt or an error
    async fn upload(&self, file: &UploadFile) -> Result<UploadReceipt, UploadError>;
}
