//! Application layer - Use cases and port interfaces
//!
//! Contains the core business operations and trait definitions
//! for external system interactions.

pub mod persistence;
pub mod ports;
pub mod recorder;
pub mod recovery;
pub mod upload;

// Re-export use cases
pub use persistence::{PersistenceHandle, PersistenceWriter};
pub use recorder::{ChunkedRecorder, FinishedRecording, RecorderConfig, RecorderError};
pub use recovery::RecoveryService;
pub use upload::{UploadCoordinator, UploadCoordinatorError};
