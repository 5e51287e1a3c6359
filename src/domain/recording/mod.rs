//! Recording domain module

mod chunk;
mod duration;
mod session;
mod session_id;
mod source;
mod stopwatch;

pub use chunk::AudioChunk;
pub use duration::Duration;
pub use session::{InvalidStateTransition, RecorderState, RecordingSession, Transition};
pub use session_id::SessionId;
pub use source::CaptureSourceKind;
pub use stopwatch::Stopwatch;
