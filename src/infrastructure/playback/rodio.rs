//! Rodio-based playback adapter
//!
//! Wraps the captured PCM in a WAV container and hands it to rodio's decoder.

use std::io::Cursor;

use async_trait::async_trait;
use rodio::{Decoder, OutputStream, Sink};
use tracing::debug;

use crate::application::ports::{Playback, PlaybackError};
use crate::domain::recording::AudioAsset;

/// Plays assets on the default output device
#[derive(Debug, Clone, Copy, Default)]
pub struct RodioPlayback;

impl RodioPlayback {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Playback for RodioPlayback {
    async fn play(&self, asset: &AudioAsset) -> Result<(), PlaybackError> {
        if asset.is_empty() {
            return Err(PlaybackError::Empty);
        }

        let wav = asset.to_wav()?;
        debug!(
            bytes = asset.size_bytes(),
            seconds = asset.duration().as_secs_f32(),
            "playing recording"
        );

        tokio::task::spawn_blocking(move || play_blocking(wav))
            .await
            .map_err(|e| PlaybackError::PlaybackFailed(format!("Task join error: {}", e)))?
    }
}

fn play_blocking(wav: Vec<u8>) -> Result<(), PlaybackError> {
    let (_stream, stream_handle) = OutputStream::try_default()
        .map_err(|e| PlaybackError::DeviceNotAvailable(e.to_string()))?;
    let sink =
        Sink::try_new(&stream_handle).map_err(|e| PlaybackError::PlaybackFailed(e.to_string()))?;

    let source =
        Decoder::new(Cursor::new(wav)).map_err(|e| PlaybackError::PlaybackFailed(e.to_string()))?;
    sink.append(source);
    sink.sleep_until_end();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recording::PcmFormat;

    #[tokio::test]
    async fn empty_asset_is_rejected_before_touching_audio() {
        let player = RodioPlayback::new();
        let asset = AudioAsset::new(Vec::new(), PcmFormat::default());
        let err = player.play(&asset).await.unwrap_err();
        assert!(matches!(err, PlaybackError::Empty));
    }

    #[tokio::test]
    async fn misaligned_asset_fails_to_encode() {
        let player = RodioPlayback::new();
        let asset = AudioAsset::new(vec![1, 2, 3], PcmFormat::default());
        let err = player.play(&asset).await.unwrap_err();
        assert!(matches!(err, PlaybackError::Encoding(_)));
    }

    #[tokio::test]
    #[ignore = "Requires audio hardware"]
    async fn can_play_short_tone() {
        let samples: Vec<u8> = (0..1600i16)
            .map(|i| ((i as f32 * 0.3).sin() * 8000.0) as i16)
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let asset = AudioAsset::new(samples, PcmFormat::default());
        assert!(RodioPlayback::new().play(&asset).await.is_ok());
    }
}
