//! Tracks which recovered sessions were already offered to the user

use std::collections::HashSet;

use super::RecoveredRecording;
use crate::domain::recording::SessionId;

/// Caller-owned record of recovery offers for one application lifetime.
///
/// Each recoverable session is offered at most once, whether the user then
/// loads it, discards it or ignores it.
#[derive(Debug, Default, Clone)]
pub struct RecoveryPrompts {
    offered: HashSet<SessionId>,
}

impl RecoveryPrompts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only recordings not offered before and mark them as offered
    pub fn take_unoffered(&mut self, recoverable: Vec<RecoveredRecording>) -> Vec<RecoveredRecording> {
        recoverable
            .into_iter()
            .filter(|rec| self.offered.insert(rec.id.clone()))
            .collect()
    }

    /// Mark a session as handled without offering it (e.g. the live session)
    pub fn mark_offered(&mut self, id: &SessionId) {
        self.offered.insert(id.clone());
    }

    pub fn was_offered(&self, id: &SessionId) -> bool {
        self.offered.contains(id)
    }
}
