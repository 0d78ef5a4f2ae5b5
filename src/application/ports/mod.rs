//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod audio_cue;
pub mod capture;
pub mod config;
pub mod playback;

// Re-export common types
pub use audio_cue::{AudioCue, AudioCueError, Cue};
pub use capture::{
    CaptureDevice, CaptureError, CaptureEvent, CaptureHandle, CaptureSink, DeviceEvent,
    DeviceLease,
};
pub use config::ConfigStore;
pub use playback::{Playback, PlaybackError};
