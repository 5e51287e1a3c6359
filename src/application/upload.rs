//! Upload coordinator use case

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::audio::AudioMimeType;
use crate::domain::recording::SessionId;

use super::ports::{
    CaptureSource, RecoveryError, RecoveryStore, UploadError, UploadFile, UploadMetadata,
    UploadReceipt, Uploader,
};
use super::recorder::{ChunkedRecorder, RecorderError};

/// Longest title slug used in file names
const MAX_SLUG_LEN: usize = 60;

/// Errors from the upload coordinator
#[derive(Debug, Error)]
pub enum UploadCoordinatorError {
    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Recorder(#[from] RecorderError),

    #[error(transparent)]
    Recovery(#[from] RecoveryError),

    #[error("Recording contains no audio")]
    EmptyRecording,
}

/// Hands finished recordings to the backend and clears local copies.
///
/// Failures are returned as-is and never retried here; the recording stays
/// where it was so the caller can offer a retry.
pub struct UploadCoordinator<U, S>
where
    U: Uploader,
    S: RecoveryStore,
{
    uploader: U,
    store: Arc<S>,
}

impl<U, S> UploadCoordinator<U, S>
where
    U: Uploader,
    S: RecoveryStore + 'static,
{
    pub fn new(uploader: U, store: Arc<S>) -> Self {
        Self { uploader, store }
    }

    /// Upload the recorder's stopped session.
    ///
    /// On success the recovery entry is deleted and the recorder reset to
    /// idle. On failure the recorder stays stopped with its audio intact.
    pub async fn upload_finished<C: CaptureSource>(
        &self,
        recorder: &ChunkedRecorder<C, S>,
        title: Option<&str>,
    ) -> Result<UploadReceipt, UploadCoordinatorError> {
        let finished = recorder.finished().await?;
        if finished.audio.is_empty() {
            return Err(UploadCoordinatorError::EmptyRecording);
        }

        let file = UploadFile {
            file_name: file_name(title, finished.audio.mime_type(), finished.created_at),
            metadata: UploadMetadata {
                title: normalize_title(title),
                source: finished.source,
                duration_seconds: finished.duration.as_secs_f64(),
                recorded_at: finished.created_at,
            },
            audio: finished.audio,
        };

        info!(
            session = %finished.id,
            file = %file.file_name,
            size = %file.audio.human_readable_size(),
            "Uploading recording"
        );
        let receipt = self.uploader.upload(&file).await?;

        // Queued writes must land before the entry is removed
        recorder.flush().await;
        self.forget(&finished.id).await;
        recorder.reset().await?;

        info!(
            session = %finished.id,
            transcription = %receipt.transcription_id,
            "Upload accepted"
        );
        Ok(receipt)
    }

    /// Upload a session left in the recovery store and delete it on success
    pub async fn upload_recovered(
        &self,
        id: &SessionId,
        title: Option<&str>,
    ) -> Result<UploadReceipt, UploadCoordinatorError> {
        let recovered = self.store.load(id).await?;
        if recovered.audio.is_empty() {
            return Err(UploadCoordinatorError::EmptyRecording);
        }

        let recording = recovered.recording;
        let file = UploadFile {
            file_name: file_name(title, recording.mime_type, recording.created_at),
            metadata: UploadMetadata {
                title: normalize_title(title),
                source: recording.source,
                duration_seconds: recording.duration_ms as f64 / 1000.0,
                recorded_at: recording.created_at,
            },
            audio: recovered.audio,
        };

        info!(session = %id, file = %file.file_name, "Uploading recovered recording");
        let receipt = self.uploader.upload(&file).await?;
        self.forget(id).await;

        Ok(receipt)
    }

    async fn forget(&self, id: &SessionId) {
        // The upload already succeeded; a stale entry is only a nuisance
        if let Err(e) = self.store.delete(id).await {
            warn!(session = %id, "Failed to delete recovery entry: {}", e);
        }
    }
}

fn normalize_title(title: Option<&str>) -> Option<String> {
    title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// `<title-slug>-<UTC timestamp>.<ext>`, or `recording-...` without a title
pub fn file_name(
    title: Option<&str>,
    mime_type: AudioMimeType,
    recorded_at: DateTime<Utc>,
) -> String {
    let slug = title.map(slugify).filter(|s| !s.is_empty());
    format!(
        "{}-{}.{}",
        slug.as_deref().unwrap_or("recording"),
        recorded_at.format("%Y%m%dT%H%M%SZ"),
        mime_type.extension()
    )
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
        if slug.len() >= MAX_SLUG_LEN {
            break;
        }
    }
    slug.trim_end_matches('-').to_string()
}
