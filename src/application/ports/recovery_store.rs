//! Recovery store port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::recording::{AudioChunk, SessionId};
use crate::domain::recovery::{
    RecoveredAudio, RecoveredRecording, RetentionPolicy, SessionManifest,
};

/// Recovery store errors
#[derive(Debug, Clone, Error)]
pub enum RecoveryError {
    #[error("No recoverable recording with id {0}")]
    NotFound(SessionId),

    #[error("Failed to persist recording: {0}")]
    PersistenceFailure(String),

    #[error("Failed to read recovery store: {0}")]
    ReadFailed(String),

    #[error("Recovered recording is corrupt: {0}")]
    Corrupt(String),

    #[error("Failed to export recording: {0}")]
    ExportFailed(String),
}

/// Port for durable, crash-safe storage of in-progress recordings
#[async_trait]
pub trait RecoveryStore: Send + Sync {
    /// Append a chunk to the session's entry and refresh its manifest.
    ///
    /// Chunks for a session must be saved in sequence order.
    async fn save(
        &self,
        manifest: &SessionManifest,
        chunk: &AudioChunk,
    ) -> Result<(), RecoveryError>;

    /// All sessions with at least one chunk, newest first
    async fn list_recoverable(&self) -> Result<Vec<RecoveredRecording>, RecoveryError>;

    /// Reassemble a session into a single playable file
    async fn load(&self, id: &SessionId) -> Result<RecoveredAudio, RecoveryError>;

    /// Remove all trace of a session. Deleting an unknown id succeeds.
    async fn delete(&self, id: &SessionId) -> Result<(), RecoveryError>;

    /// Delete entries the policy considers expired.
    ///
    /// # Returns
    /// The ids that were removed
    async fn prune(&self, policy: &RetentionPolicy) -> Result<Vec<SessionId>, RecoveryError>;
}
