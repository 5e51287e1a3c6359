//! Audio domain module

mod audio_data;
pub mod level;
pub mod wav;

pub use audio_data::{AudioData, AudioMimeType, PcmFormat};
pub use level::{AudioLevelAnalyzer, LevelSample, VisualizationMode};
