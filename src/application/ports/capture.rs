//! Audio capture port interface

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::audio::PcmFormat;
use crate::domain::recording::CaptureSourceKind;

/// Capture errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Permission to capture audio was denied: {0}")]
    PermissionDenied(String),

    #[error("Audio source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Audio capture failed: {0}")]
    CaptureFailure(String),
}

/// Non-fatal conditions reported when a stream opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CaptureWarning {
    #[error("The selected source has no audio track; recording silence")]
    NoAudioTrack,
}

/// Events delivered by a live capture stream
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// Interleaved 16-bit samples in the stream's format
    Samples(Vec<i16>),
    /// The device was lost; the stream delivers nothing further
    Failed(String),
}

/// Handle to a live capture stream.
///
/// Capture stops when the handle is dropped.
#[derive(Debug)]
pub struct CaptureStream {
    format: PcmFormat,
    warning: Option<CaptureWarning>,
    events: mpsc::UnboundedReceiver<CaptureEvent>,
}

impl CaptureStream {
    pub fn new(format: PcmFormat, events: mpsc::UnboundedReceiver<CaptureEvent>) -> Self {
        Self {
            format,
            warning: None,
            events,
        }
    }

    pub fn with_warning(mut self, warning: CaptureWarning) -> Self {
        self.warning = Some(warning);
        self
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn warning(&self) -> Option<CaptureWarning> {
        self.warning
    }

    /// Wait for the next event. `None` means the producer went away.
    pub async fn next_event(&mut self) -> Option<CaptureEvent> {
        self.events.recv().await
    }
}

/// Port for platform audio capture
#[async_trait]
pub trait CaptureSource: Send + Sync {
    /// Whether the host can capture from this source at all.
    /// Checked before any permission prompt or device is opened.
    fn supports(&self, kind: CaptureSourceKind) -> bool;

    /// Open a live stream for the given source.
    ///
    /// # Returns
    /// The stream handle, or `PermissionDenied` / `SourceUnavailable` /
    /// `CaptureFailure`
    async fn open(&self, kind: CaptureSourceKind) -> Result<CaptureStream, CaptureError>;
}
