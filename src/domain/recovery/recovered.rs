//! Records describing recordings kept for crash recovery

use chrono::{DateTime, Utc};

use crate::domain::audio::{AudioData, AudioMimeType, PcmFormat};
use crate::domain::recording::{CaptureSourceKind, SessionId};

/// Session metadata written alongside every persisted chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionManifest {
    pub id: SessionId,
    pub source: CaptureSourceKind,
    pub mime_type: AudioMimeType,
    /// Layout of the PCM held in every chunk
    pub format: PcmFormat,
    pub created_at: DateTime<Utc>,
    /// Tracked duration when the chunk was emitted
    pub duration_ms: u64,
}

/// Durable snapshot of an interrupted or not-yet-uploaded session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredRecording {
    pub id: SessionId,
    pub source: CaptureSourceKind,
    pub mime_type: AudioMimeType,
    pub chunk_count: u32,
    pub duration_ms: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecoveredRecording {
    /// Duration formatted as `m:ss` (or `h:mm:ss`)
    pub fn duration_label(&self) -> String {
        let total = self.duration_ms / 1000;
        let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
        if h > 0 {
            format!("{}:{:02}:{:02}", h, m, s)
        } else {
            format!("{}:{:02}", m, s)
        }
    }
}

/// A recovered recording reassembled into a single file
#[derive(Debug, Clone)]
pub struct RecoveredAudio {
    pub recording: RecoveredRecording,
    pub audio: AudioData,
}
