//! Recording session state machine

use std::fmt;
use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{AudioChunk, CaptureSourceKind, SessionId, Stopwatch};
use crate::domain::audio::{wav, AudioData, AudioMimeType, PcmFormat};
use crate::domain::recovery::SessionManifest;

/// Recorder lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecorderState {
    #[default]
    Idle,
    RequestingPermission,
    Recording,
    Paused,
    Stopped,
}

impl RecorderState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::RequestingPermission => "requesting-permission",
            Self::Recording => "recording",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        }
    }

    /// Whether capture is live (recording or paused)
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Recording | Self::Paused)
    }
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a user-triggered transition.
///
/// Repeated clicks land on `Ignored` instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Ignored,
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, Error)]
#[error("Invalid state transition: cannot {action} while in {current_state} state")]
pub struct InvalidStateTransition {
    pub current_state: RecorderState,
    pub action: String,
}

/// Recording session entity.
///
/// State machine:
///   IDLE -> REQUESTING_PERMISSION (request_permission)
///   REQUESTING_PERMISSION -> RECORDING (permission_granted)
///   REQUESTING_PERMISSION -> IDLE (permission_failed)
///   RECORDING <-> PAUSED (pause / resume)
///   RECORDING | PAUSED -> STOPPED (stop)
///   STOPPED -> IDLE (reset)
///   any -> IDLE (fail)
#[derive(Debug)]
pub struct RecordingSession {
    id: SessionId,
    source: CaptureSourceKind,
    format: PcmFormat,
    mime_type: AudioMimeType,
    chunks: Vec<AudioChunk>,
    state: RecorderState,
    created_at: DateTime<Utc>,
    stopwatch: Stopwatch,
}

impl RecordingSession {
    /// Create a new session in idle state
    pub fn new() -> Self {
        Self {
            id: SessionId::generate(),
            source: CaptureSourceKind::default(),
            format: PcmFormat::speech(),
            mime_type: AudioMimeType::Wav,
            chunks: Vec::new(),
            state: RecorderState::Idle,
            created_at: Utc::now(),
            stopwatch: Stopwatch::new(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn source(&self) -> CaptureSourceKind {
        self.source
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn mime_type(&self) -> AudioMimeType {
        self.mime_type
    }

    pub fn chunks(&self) -> &[AudioChunk] {
        &self.chunks
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the current state
    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == RecorderState::Idle
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    pub fn is_paused(&self) -> bool {
        self.state == RecorderState::Paused
    }

    pub fn is_stopped(&self) -> bool {
        self.state == RecorderState::Stopped
    }

    /// Recorded time so far, excluding pauses
    pub fn elapsed(&self, now: Instant) -> StdDuration {
        self.stopwatch.elapsed(now)
    }

    fn invalid(&self, action: &str) -> InvalidStateTransition {
        InvalidStateTransition {
            current_state: self.state,
            action: action.to_string(),
        }
    }

    /// Transition from IDLE to REQUESTING_PERMISSION
    pub fn request_permission(
        &mut self,
        source: CaptureSourceKind,
    ) -> Result<(), InvalidStateTransition> {
        if self.state != RecorderState::Idle {
            return Err(self.invalid("start recording"));
        }
        self.source = source;
        self.state = RecorderState::RequestingPermission;
        Ok(())
    }

    /// Transition from REQUESTING_PERMISSION to RECORDING
    pub fn permission_granted(
        &mut self,
        format: PcmFormat,
        now: Instant,
    ) -> Result<(), InvalidStateTransition> {
        if self.state != RecorderState::RequestingPermission {
            return Err(self.invalid("begin capture"));
        }
        self.format = format;
        self.created_at = Utc::now();
        self.stopwatch.start(now);
        self.state = RecorderState::Recording;
        Ok(())
    }

    /// Transition from REQUESTING_PERMISSION back to IDLE
    pub fn permission_failed(&mut self) -> Result<(), InvalidStateTransition> {
        if self.state != RecorderState::RequestingPermission {
            return Err(self.invalid("abandon permission request"));
        }
        self.state = RecorderState::Idle;
        Ok(())
    }

    /// Transition from RECORDING to PAUSED
    pub fn pause(&mut self, now: Instant) -> Result<Transition, InvalidStateTransition> {
        match self.state {
            RecorderState::Recording => {
                self.stopwatch.pause(now);
                self.state = RecorderState::Paused;
                Ok(Transition::Applied)
            }
            RecorderState::Paused => Ok(Transition::Ignored),
            _ => Err(self.invalid("pause")),
        }
    }

    /// Transition from PAUSED to RECORDING
    pub fn resume(&mut self, now: Instant) -> Result<Transition, InvalidStateTransition> {
        match self.state {
            RecorderState::Paused => {
                self.stopwatch.start(now);
                self.state = RecorderState::Recording;
                Ok(Transition::Applied)
            }
            RecorderState::Recording => Ok(Transition::Ignored),
            _ => Err(self.invalid("resume")),
        }
    }

    /// Transition from RECORDING or PAUSED to STOPPED.
    /// Stopping an idle or already stopped session is a no-op.
    pub fn stop(&mut self, now: Instant) -> Result<Transition, InvalidStateTransition> {
        match self.state {
            RecorderState::Recording | RecorderState::Paused => {
                self.stopwatch.pause(now);
                self.state = RecorderState::Stopped;
                Ok(Transition::Applied)
            }
            RecorderState::Idle | RecorderState::Stopped => Ok(Transition::Ignored),
            RecorderState::RequestingPermission => Err(self.invalid("stop")),
        }
    }

    /// Transition from STOPPED (or IDLE) to a fresh IDLE session
    pub fn reset(&mut self) -> Result<(), InvalidStateTransition> {
        match self.state {
            RecorderState::Idle | RecorderState::Stopped => {
                *self = Self::new();
                Ok(())
            }
            _ => Err(self.invalid("reset")),
        }
    }

    /// Abort the session after a capture failure, from any state.
    /// Returns the id of the abandoned session.
    pub fn fail(&mut self) -> SessionId {
        let abandoned = self.id.clone();
        *self = Self::new();
        abandoned
    }

    /// Append encoded audio; only allowed while RECORDING
    pub fn append_chunk(
        &mut self,
        data: Vec<u8>,
        now: Instant,
    ) -> Result<&AudioChunk, InvalidStateTransition> {
        if self.state != RecorderState::Recording {
            return Err(self.invalid("append audio"));
        }
        let sequence = self.chunks.len() as u32;
        let offset_ms = self.elapsed(now).as_millis() as u64;
        self.chunks.push(AudioChunk::new(sequence, offset_ms, data));
        Ok(&self.chunks[self.chunks.len() - 1])
    }

    /// Snapshot of the metadata the recovery store keeps beside the chunks
    pub fn manifest(&self, now: Instant) -> SessionManifest {
        SessionManifest {
            id: self.id.clone(),
            source: self.source,
            mime_type: self.mime_type,
            format: self.format,
            created_at: self.created_at,
            duration_ms: self.elapsed(now).as_millis() as u64,
        }
    }

    /// Concatenate all chunks into a single playable file
    pub fn assemble(&self) -> Result<AudioData, wav::WavError> {
        let mut pcm: Vec<u8> =
            Vec::with_capacity(self.chunks.iter().map(AudioChunk::len).sum());
        for chunk in &self.chunks {
            pcm.extend_from_slice(chunk.data());
        }
        let bytes = match self.mime_type {
            AudioMimeType::Wav if !pcm.is_empty() => wav::wrap_pcm(self.format, &pcm)?,
            _ => pcm,
        };
        Ok(AudioData::new(bytes, self.mime_type))
    }
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}
