//! Playback port for listening to a captured recording

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::recording::{AssetError, AudioAsset};

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Nothing to play: the recording is empty")]
    Empty,

    #[error("Could not prepare recording: {0}")]
    Encoding(#[from] AssetError),

    #[error("No audio output device available: {0}")]
    DeviceNotAvailable(String),

    #[error("Playback failed: {0}")]
    PlaybackFailed(String),
}

/// Port for playing a finalized asset
#[async_trait]
pub trait Playback: Send + Sync {
    /// Play the asset to the end.
    async fn play(&self, asset: &AudioAsset) -> Result<(), PlaybackError>;
}
