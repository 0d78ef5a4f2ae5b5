//! Application layer - Recording controller and port interfaces
//!
//! Drives the recording machine against the capture, cue and playback
//! ports defined here.

pub mod ports;
pub mod recorder;

pub use recorder::{
    RecorderClosed, RecorderCommand, RecorderConfig, RecorderHandle, RecordingController,
};
