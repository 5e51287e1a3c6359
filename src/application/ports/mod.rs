//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod capture;
pub mod config;
pub mod recovery_store;
pub mod uploader;

// Re-export common types
pub use capture::{CaptureError, CaptureEvent, CaptureSource, CaptureStream, CaptureWarning};
pub use config::ConfigStore;
pub use recovery_store::{RecoveryError, RecoveryStore};
pub use uploader::{UploadError, UploadFile, UploadMetadata, UploadReceipt, Uploader};
