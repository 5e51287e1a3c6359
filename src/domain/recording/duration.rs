//! Duration value object

use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use crate::domain::error::DurationParseError;

/// Default chunk cadence (1 second)
pub const DEFAULT_CHUNK_INTERVAL_MS: u64 = 1_000;

/// Default safety limit for a single recording (2 hours)
pub const DEFAULT_MAX_DURATION_SECS: u64 = 2 * 60 * 60;

/// Default age after which recovery entries are pruned (7 days)
pub const DEFAULT_RETENTION_SECS: u64 = 7 * 24 * 60 * 60;

/// Default timeout for the final upload request (5 minutes)
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 5 * 60;

const MS_PER_SEC: u64 = 1_000;
const MS_PER_MIN: u64 = 60 * MS_PER_SEC;
const MS_PER_HOUR: u64 = 60 * MS_PER_MIN;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// Value object representing a time duration.
/// Immutable and validated on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration {
    milliseconds: u64,
}

impl Duration {
    /// Create a Duration from milliseconds
    pub const fn from_millis(ms: u64) -> Self {
        Self { milliseconds: ms }
    }

    /// Create a Duration from seconds
    pub const fn from_secs(secs: u64) -> Self {
        Self {
            milliseconds: secs * MS_PER_SEC,
        }
    }

    /// Default chunk cadence
    pub const fn default_chunk_interval() -> Self {
        Self::from_millis(DEFAULT_CHUNK_INTERVAL_MS)
    }

    /// Default max recording duration
    pub const fn default_max_duration() -> Self {
        Self::from_secs(DEFAULT_MAX_DURATION_SECS)
    }

    /// Default recovery retention
    pub const fn default_retention() -> Self {
        Self::from_secs(DEFAULT_RETENTION_SECS)
    }

    /// Default upload timeout
    pub const fn default_upload_timeout() -> Self {
        Self::from_secs(DEFAULT_UPLOAD_TIMEOUT_SECS)
    }

    /// Get duration in whole seconds
    pub const fn as_secs(&self) -> u64 {
        self.milliseconds / MS_PER_SEC
    }

    /// Get duration in milliseconds
    pub const fn as_millis(&self) -> u64 {
        self.milliseconds
    }

    /// Convert to std::time::Duration
    pub const fn as_std(&self) -> StdDuration {
        StdDuration::from_millis(self.milliseconds)
    }
}

impl From<StdDuration> for Duration {
    fn from(value: StdDuration) -> Self {
        Self::from_millis(value.as_millis() as u64)
    }
}

impl FromStr for Duration {
    type Err = DurationParseError;

    /// Parse a duration string into a Duration value object.
    /// Supported formats: "500ms", "30s", "1m", "2m30s", "1h", "7d"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim().to_lowercase();
        let err = || DurationParseError {
            input: s.to_string(),
        };

        let mut total_ms: u64 = 0;
        let mut current_num = String::new();
        let mut found_any = false;
        let mut chars = input.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch.is_ascii_digit() {
                current_num.push(ch);
                continue;
            }

            if current_num.is_empty() {
                return Err(err());
            }

            let unit_ms = match ch {
                'm' if chars.peek() == Some(&'s') => {
                    chars.next();
                    1
                }
                'd' => MS_PER_DAY,
                'h' => MS_PER_HOUR,
                'm' => MS_PER_MIN,
                's' => MS_PER_SEC,
                _ => return Err(err()),
            };

            let value: u64 = current_num.parse().map_err(|_| err())?;
            total_ms = value
                .checked_mul(unit_ms)
                .and_then(|ms| total_ms.checked_add(ms))
                .ok_or_else(err)?;
            current_num.clear();
            found_any = true;
        }

        // Leftover digits without a unit are invalid
        if !current_num.is_empty() || !found_any || total_ms == 0 {
            return Err(err());
        }

        Ok(Self {
            milliseconds: total_ms,
        })
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rest = self.milliseconds;
        if rest == 0 {
            return write!(f, "0s");
        }

        let days = rest / MS_PER_DAY;
        rest %= MS_PER_DAY;
        let hours = rest / MS_PER_HOUR;
        rest %= MS_PER_HOUR;
        let minutes = rest / MS_PER_MIN;
        rest %= MS_PER_MIN;
        let seconds = rest / MS_PER_SEC;
        let millis = rest % MS_PER_SEC;

        for (value, unit) in [
            (days, "d"),
            (hours, "h"),
            (minutes, "m"),
            (seconds, "s"),
            (millis, "ms"),
        ] {
            if value > 0 {
                write!(f, "{}{}", value, unit)?;
            }
        }
        Ok(())
    }
}

impl Default for Duration {
    fn default() -> Self {
        Self::default_chunk_interval()
    }
}
