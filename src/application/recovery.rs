//! Recovery use case

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::domain::recording::SessionId;
use crate::domain::recovery::{RecoveredRecording, RecoveryPrompts, RetentionPolicy};

use super::ports::{RecoveryError, RecoveryStore};

/// Browse, export and clean up recordings left in the recovery store
pub struct RecoveryService<S: RecoveryStore> {
    store: Arc<S>,
}

impl<S: RecoveryStore> RecoveryService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Recoverable sessions not offered before in this run.
    ///
    /// Everything returned is marked as offered in `prompts`.
    pub async fn offer(
        &self,
        prompts: &mut RecoveryPrompts,
    ) -> Result<Vec<RecoveredRecording>, RecoveryError> {
        let recoverable = self.store.list_recoverable().await?;
        Ok(prompts.take_unoffered(recoverable))
    }

    /// All recoverable sessions, newest first
    pub async fn list(&self) -> Result<Vec<RecoveredRecording>, RecoveryError> {
        self.store.list_recoverable().await
    }

    pub async fn discard(&self, id: &SessionId) -> Result<(), RecoveryError> {
        self.store.delete(id).await?;
        info!(session = %id, "Recovered recording discarded");
        Ok(())
    }

    /// Write the reassembled recording to `path`
    pub async fn export(
        &self,
        id: &SessionId,
        path: &Path,
    ) -> Result<RecoveredRecording, RecoveryError> {
        let recovered = self.store.load(id).await?;
        tokio::fs::write(path, recovered.audio.data())
            .await
            .map_err(|e| RecoveryError::ExportFailed(format!("{}: {}", path.display(), e)))?;

        info!(session = %id, path = %path.display(), "Recording exported");
        Ok(recovered.recording)
    }

    /// Delete entries older than the policy allows
    pub async fn prune(&self, policy: &RetentionPolicy) -> Result<Vec<SessionId>, RecoveryError> {
        let removed = self.store.prune(policy).await?;
        if !removed.is_empty() {
            info!(count = removed.len(), max_age = %policy.max_age(), "Pruned expired recordings");
        }
        Ok(removed)
    }
}
