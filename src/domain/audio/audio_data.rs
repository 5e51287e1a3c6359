//! Audio data value objects

use std::fmt;
use std::str::FromStr;

use crate::domain::error::InvalidMimeType;

/// Supported audio MIME types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AudioMimeType {
    #[default]
    Wav,
    Webm,
    Ogg,
    Mp4,
    Mpeg,
}

impl AudioMimeType {
    /// Get the MIME type string
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Webm => "audio/webm",
            Self::Ogg => "audio/ogg",
            Self::Mp4 => "audio/mp4",
            Self::Mpeg => "audio/mpeg",
        }
    }

    /// Get the file extension
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Webm => "webm",
            Self::Ogg => "ogg",
            Self::Mp4 => "m4a",
            Self::Mpeg => "mp3",
        }
    }
}

impl FromStr for AudioMimeType {
    type Err = InvalidMimeType;

    /// Accepts the canonical names, common aliases, and parameters such as
    /// `audio/webm;codecs=opus`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let essence = s.split(';').next().unwrap_or_default().trim().to_lowercase();
        match essence.as_str() {
            "audio/wav" | "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => Ok(Self::Wav),
            "audio/webm" => Ok(Self::Webm),
            "audio/ogg" => Ok(Self::Ogg),
            "audio/mp4" | "audio/x-m4a" => Ok(Self::Mp4),
            "audio/mpeg" | "audio/mp3" => Ok(Self::Mpeg),
            _ => Err(InvalidMimeType {
                input: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for AudioMimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Layout of captured PCM frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmFormat {
    pub const fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    /// 16 kHz mono, used for degraded (silent) capture
    pub const fn speech() -> Self {
        Self::new(16_000, 1)
    }

    /// Bytes of 16-bit PCM per second of audio
    pub const fn byte_rate(&self) -> u64 {
        self.sample_rate as u64 * self.channels as u64 * 2
    }
}

/// Value object representing a complete audio file in memory.
/// Contains raw bytes and their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioData {
    data: Vec<u8>,
    mime_type: AudioMimeType,
}

impl AudioData {
    /// Create AudioData from raw bytes
    pub fn new(data: Vec<u8>, mime_type: AudioMimeType) -> Self {
        Self { data, mime_type }
    }

    /// Get the raw audio data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume and return the raw audio data
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Get the MIME type
    pub fn mime_type(&self) -> AudioMimeType {
        self.mime_type
    }

    /// Get the size in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get human-readable size
    pub fn human_readable_size(&self) -> String {
        let bytes = self.size_bytes();
        if bytes < 1024 {
            format!("{} B", bytes)
        } else if bytes < 1024 * 1024 {
            format!("{:.1} KB", bytes as f64 / 1024.0)
        } else {
            format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_type_as_str_and_extension() {
        assert_eq!(AudioMimeType::Wav.as_str(), "audio/wav");
        assert_eq!(AudioMimeType::Wav.extension(), "wav");
        assert_eq!(AudioMimeType::Webm.extension(), "webm");
        assert_eq!(AudioMimeType::Mpeg.extension(), "mp3");
    }

    #[test]
    fn mime_type_parses_aliases_and_parameters() {
        assert_eq!("audio/x-wav".parse::<AudioMimeType>().unwrap(), AudioMimeType::Wav);
        assert_eq!(
            "audio/webm;codecs=opus".parse::<AudioMimeType>().unwrap(),
            AudioMimeType::Webm
        );
        assert_eq!("AUDIO/MP3".parse::<AudioMimeType>().unwrap(), AudioMimeType::Mpeg);
        assert!("video/mp4".parse::<AudioMimeType>().is_err());
    }

    #[test]
    fn default_mime_type_is_wav() {
        assert_eq!(AudioMimeType::default(), AudioMimeType::Wav);
    }

    #[test]
    fn human_readable_sizes() {
        assert_eq!(AudioData::new(vec![0u8; 500], AudioMimeType::Wav).human_readable_size(), "500 B");
        assert_eq!(AudioData::new(vec![0u8; 2048], AudioMimeType::Wav).human_readable_size(), "2.0 KB");
        assert_eq!(
            AudioData::new(vec![0u8; 2 * 1024 * 1024], AudioMimeType::Wav).human_readable_size(),
            "2.0 MB"
        );
    }

    #[test]
    fn pcm_byte_rate() {
        assert_eq!(PcmFormat::speech().byte_rate(), 32_000);
        assert_eq!(PcmFormat::new(48_000, 2).byte_rate(), 192_000);
    }
}
