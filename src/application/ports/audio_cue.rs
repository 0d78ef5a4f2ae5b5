//! Audio cue port for playing sound feedback
//!
//! Provides audible feedback for the countdown and for recording start,
//! stop, and discard.

use async_trait::async_trait;
use thiserror::Error;

pub use crate::domain::recording::Cue;

/// Errors that can occur during audio cue playback
#[derive(Error, Debug)]
pub enum AudioCueError {
    /// Failed to play the audio cue
    #[error("Playback failed: {0}")]
    PlaybackFailed(String),

    /// No audio output device available
    #[error("Audio device not available: {0}")]
    DeviceNotAvailable(String),
}

/// Port trait for audio cue playback
#[async_trait]
pub trait AudioCue: Send + Sync {
    /// Play an audio cue
    async fn play(&self, cue: Cue) -> Result<(), AudioCueError>;
}

/// Blanket implementation for boxed audio cue types
#[async_trait]
impl AudioCue for Box<dyn AudioCue> {
    async fn play(&self, cue: Cue) -> Result<(), AudioCueError> {
        self.as_ref().play(cue).await
    }
}
