//! No-op audio cue adapter
//!
//! Used when audio cues are disabled.

use async_trait::async_trait;

use crate::application::ports::{AudioCue, AudioCueError, Cue};

/// Audio cue that stays silent
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpAudioCue;

impl NoOpAudioCue {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioCue for NoOpAudioCue {
    async fn play(&self, _cue: Cue) -> Result<(), AudioCueError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_cue_is_accepted() {
        let player = NoOpAudioCue::new();
        for cue in [
            Cue::CountdownTick,
            Cue::RecordingStart,
            Cue::RecordingStop,
            Cue::RecordingDiscard,
        ] {
            assert!(player.play(cue).await.is_ok());
        }
    }
}
