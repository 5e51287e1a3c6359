//! Capture infrastructure module

mod cpal_capture;

pub use cpal_capture::CpalCapture;
