//! Capture source kinds

use std::fmt;
use std::str::FromStr;

use crate::domain::error::InvalidSourceError;

/// Where a recording takes its audio from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CaptureSourceKind {
    #[default]
    Microphone,
    /// Audio played by other applications (a browser tab, a meeting client),
    /// captured through the system's output monitor.
    TabAudio,
}

impl CaptureSourceKind {
    /// All supported sources
    pub const ALL: [CaptureSourceKind; 2] = [Self::Microphone, Self::TabAudio];

    /// Get the canonical string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Microphone => "microphone",
            Self::TabAudio => "tab-audio",
        }
    }

    /// Human-friendly label
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Microphone => "Microphone",
            Self::TabAudio => "Tab / system audio",
        }
    }
}

impl FromStr for CaptureSourceKind {
    type Err = InvalidSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "microphone" | "mic" => Ok(Self::Microphone),
            "tab-audio" | "tab" | "system" | "tab_audio" => Ok(Self::TabAudio),
            _ => Err(InvalidSourceError {
                input: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for CaptureSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_aliases() {
        assert_eq!("mic".parse::<CaptureSourceKind>().unwrap(), CaptureSourceKind::Microphone);
        assert_eq!("Tab".parse::<CaptureSourceKind>().unwrap(), CaptureSourceKind::TabAudio);
        assert_eq!("system".parse::<CaptureSourceKind>().unwrap(), CaptureSourceKind::TabAudio);
        assert!("speaker".parse::<CaptureSourceKind>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for kind in CaptureSourceKind::ALL {
            assert_eq!(kind.to_string().parse::<CaptureSourceKind>().unwrap(), kind);
        }
    }
}
