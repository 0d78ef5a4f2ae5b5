//! Read-only recording snapshot handed to the presentation layer

use std::fmt;

use thiserror::Error;

use super::asset::{AudioAsset, PcmFormat};

/// Recorder status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordingStatus {
    #[default]
    Idle,
    CountingDown,
    Recording,
    Stopped,
}

impl RecordingStatus {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::CountingDown => "counting down",
            Self::Recording => "recording",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Non-fatal failure surfaced to the presentation layer.
/// None of these stop the recorder; it degrades to a safe status instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecorderError {
    #[error("Microphone access was denied")]
    PermissionDenied,

    #[error("No audio input device available: {0}")]
    DeviceUnavailable(String),

    #[error("Audio capture failed: {0}")]
    CaptureFailed(String),

    #[error("Audio device disconnected: {0}")]
    DeviceDisconnected(String),

    #[error("Input format changed from {previous} to {current}; the earlier take was dropped")]
    FormatChanged {
        previous: PcmFormat,
        current: PcmFormat,
    },
}

/// Snapshot of the recorder.
///
/// Only built by the recording machine, so `countdown_remaining` is present
/// exactly while counting down and `captured_asset` exactly while stopped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordingState {
    pub(super) status: RecordingStatus,
    pub(super) countdown_remaining: Option<u32>,
    pub(super) captured_asset: Option<AudioAsset>,
    pub(super) awaiting_device: bool,
    pub(super) error: Option<RecorderError>,
}

impl RecordingState {
    pub fn status(&self) -> RecordingStatus {
        self.status
    }

    pub fn countdown_remaining(&self) -> Option<u32> {
        self.countdown_remaining
    }

    pub fn captured_asset(&self) -> Option<&AudioAsset> {
        self.captured_asset.as_ref()
    }

    /// A device-access request is in flight
    pub fn awaiting_device(&self) -> bool {
        self.awaiting_device
    }

    /// Last error signal; cleared by the next start or resume
    pub fn error(&self) -> Option<&RecorderError> {
        self.error.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.status == RecordingStatus::Idle
    }

    pub fn is_counting_down(&self) -> bool {
        self.status == RecordingStatus::CountingDown
    }

    pub fn is_recording(&self) -> bool {
        self.status == RecordingStatus::Recording
    }

    pub fn is_stopped(&self) -> bool {
        self.status == RecordingStatus::Stopped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_snapshot_is_idle_and_empty() {
        let state = RecordingState::default();
        assert!(state.is_idle());
        assert!(state.countdown_remaining().is_none());
        assert!(state.captured_asset().is_none());
        assert!(state.error().is_none());
        assert!(!state.awaiting_device());
    }

    #[test]
    fn status_display() {
        assert_eq!(RecordingStatus::Idle.to_string(), "idle");
        assert_eq!(RecordingStatus::CountingDown.to_string(), "counting down");
        assert_eq!(RecordingStatus::Recording.to_string(), "recording");
        assert_eq!(RecordingStatus::Stopped.to_string(), "stopped");
    }

    #[test]
    fn error_display() {
        assert_eq!(
            RecorderError::PermissionDenied.to_string(),
            "Microphone access was denied"
        );
        let err = RecorderError::DeviceDisconnected("unplugged".to_string());
        assert!(err.to_string().contains("unplugged"));
    }
}
