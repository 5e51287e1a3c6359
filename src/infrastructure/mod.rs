//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with external systems like cpal, the filesystem and the
//! transcription backend.

pub mod capture;
pub mod config;
pub mod recovery;
pub mod upload;

// Re-export adapters
pub use capture::CpalCapture;
pub use config::XdgConfigStore;
pub use recovery::FsRecoveryStore;
pub use upload::HttpUploader;
