//! Recovery domain module

mod prompts;
mod recovered;
mod retention;

pub use prompts::RecoveryPrompts;
pub use recovered::{RecoveredAudio, RecoveredRecording, SessionManifest};
pub use retention::RetentionPolicy;
