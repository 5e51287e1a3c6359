//! Age-based eviction of recovery entries

use chrono::{DateTime, TimeDelta, Utc};

use super::RecoveredRecording;
use crate::domain::recording::Duration;

/// Entries whose last write is older than `max_age` are eligible for pruning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_age: Duration,
}

impl RetentionPolicy {
    pub const fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Oldest `updated_at` that is still kept
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let age = TimeDelta::try_milliseconds(self.max_age.as_millis() as i64)
            .unwrap_or(TimeDelta::MAX);
        now.checked_sub_signed(age).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn is_expired(&self, recording: &RecoveredRecording, now: DateTime<Utc>) -> bool {
        self.is_stale(recording.updated_at, now)
    }

    /// Whether something last written at `last_write` has outlived `max_age`
    pub fn is_stale(&self, last_write: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        last_write < self.cutoff(now)
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(Duration::default_retention())
    }
}
