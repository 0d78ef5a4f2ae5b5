//! Infrastructure layer - Adapter implementations
//!
//! Concrete implementations of the port interfaces, backed by cpal for
//! capture, rodio for sound output and the XDG config directory.

pub mod audio_cue;
pub mod capture;
pub mod config;
pub mod playback;

// Re-export adapters
pub use audio_cue::{create_audio_cue, NoOpAudioCue, RodioAudioCue};
pub use capture::{list_input_devices, CpalCapture, InputDeviceInfo};
pub use config::XdgConfigStore;
pub use playback::RodioPlayback;
