//! Rodio-based audio cue adapter
//!
//! Synthesizes short tones for the countdown and recording transitions.

use std::time::Duration;

use async_trait::async_trait;
use rodio::source::{SineWave, Source, Zero};
use rodio::{OutputStream, Sink};

use crate::application::ports::{AudioCue, AudioCueError, Cue};

const AMPLITUDE: f32 = 0.3;

/// One segment of a cue: a tone, or silence when `freq` is zero
#[derive(Debug, Clone, Copy, PartialEq)]
struct Note {
    freq: f32,
    millis: u64,
    gain: f32,
}

const fn note(freq: f32, millis: u64) -> Note {
    Note {
        freq,
        millis,
        gain: 1.0,
    }
}

const fn rest(millis: u64) -> Note {
    Note {
        freq: 0.0,
        millis,
        gain: 0.0,
    }
}

/// Audio cue implementation using rodio
#[derive(Debug, Clone, Copy, Default)]
pub struct RodioAudioCue;

impl RodioAudioCue {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioCue for RodioAudioCue {
    async fn play(&self, cue: Cue) -> Result<(), AudioCueError> {
        // rodio blocks until the sink drains
        tokio::task::spawn_blocking(move || play_blocking(cue))
            .await
            .map_err(|e| AudioCueError::PlaybackFailed(format!("Task join error: {}", e)))?
    }
}

fn melody(cue: Cue) -> Vec<Note> {
    match cue {
        // Short A5 blip, one per countdown tick
        Cue::CountdownTick => vec![note(880.0, 70)],
        // C5 -> E5
        Cue::RecordingStart => vec![note(523.0, 80), note(659.0, 120)],
        // E5 -> C5
        Cue::RecordingStop => vec![note(659.0, 80), note(523.0, 120)],
        // G4 twice, softer
        Cue::RecordingDiscard => vec![
            Note {
                gain: 0.8,
                ..note(392.0, 60)
            },
            rest(40),
            Note {
                gain: 0.8,
                ..note(392.0, 60)
            },
        ],
    }
}

/// Tone with a short fade-in so it does not click
fn gentle_tone(freq: f32, millis: u64, amplitude: f32) -> impl Source<Item = f32> + Send {
    let fade_ms = (millis / 5).min(30);
    SineWave::new(freq)
        .take_duration(Duration::from_millis(millis))
        .fade_in(Duration::from_millis(fade_ms))
        .amplify(amplitude)
}

fn play_blocking(cue: Cue) -> Result<(), AudioCueError> {
    let (_stream, stream_handle) = OutputStream::try_default()
        .map_err(|e| AudioCueError::DeviceNotAvailable(e.to_string()))?;
    let sink =
        Sink::try_new(&stream_handle).map_err(|e| AudioCueError::PlaybackFailed(e.to_string()))?;

    for segment in melody(cue) {
        if segment.freq > 0.0 {
            sink.append(gentle_tone(
                segment.freq,
                segment.millis,
                AMPLITUDE * segment.gain,
            ));
        } else {
            sink.append(
                Zero::<f32>::new(1, 44100).take_duration(Duration::from_millis(segment.millis)),
            );
        }
    }

    sink.sleep_until_end();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_is_shorter_than_transition_cues() {
        let length = |cue| melody(cue).iter().map(|n| n.millis).sum::<u64>();
        assert!(length(Cue::CountdownTick) < length(Cue::RecordingStart));
        assert!(length(Cue::CountdownTick) < length(Cue::RecordingDiscard));
    }

    #[test]
    fn start_and_stop_are_mirrored() {
        let start = melody(Cue::RecordingStart);
        let mut stop = melody(Cue::RecordingStop);
        stop.reverse();
        let freqs = |notes: &[Note]| notes.iter().map(|n| n.freq).collect::<Vec<_>>();
        assert_eq!(freqs(&start), freqs(&stop));
    }

    #[tokio::test]
    #[ignore = "Requires audio hardware"]
    async fn can_play_every_cue() {
        let player = RodioAudioCue::new();
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
