//! Domain layer - Core business logic
//!
//! Contains value objects, entities, and domain errors.
//! This layer performs no I/O.

pub mod audio;
pub mod config;
pub mod error;
pub mod recording;
pub mod recovery;

// Re-export common types
pub use audio::{AudioData, AudioMimeType, LevelSample, PcmFormat, VisualizationMode};
pub use config::AppConfig;
pub use error::*;
pub use recording::{
    AudioChunk, CaptureSourceKind, Duration, RecorderState, RecordingSession, SessionId,
    Transition,
};
pub use recovery::{RecoveredAudio, RecoveredRecording, RecoveryPrompts, RetentionPolicy, SessionManifest};
