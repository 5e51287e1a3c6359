//! ScribeRecorder - crash-safe audio recording for transcription
//!
//! This crate records microphone or tab audio in fixed-interval chunks,
//! persists every chunk locally as it is cut so an interrupted session can
//! be recovered, and uploads finished recordings to a transcription service.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Recording session state machine, audio values, WAV framing, config
//! - **Application**: Recorder, persistence, upload and recovery use cases plus port traits
//! - **Infrastructure**: Adapter implementations (cpal capture, filesystem store, HTTP upload, XDG config)
//! - **CLI**: Command-line interface, argument parsing, and signal handling

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
