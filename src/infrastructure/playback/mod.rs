//! Playback adapters

mod rodio;

pub use rodio::RodioPlayback;
