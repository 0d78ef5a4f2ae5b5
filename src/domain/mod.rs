//! Domain layer - Core recording logic
//!
//! Contains value objects, the recorder state machine, and domain errors.
//! Nothing here touches devices or the async runtime.

pub mod config;
pub mod error;
pub mod recording;

// Re-export common types
pub use config::AppConfig;
pub use error::*;
pub use recording::{
    AudioAsset, Duration, PcmFormat, RecorderError, RecordingMachine, RecordingState,
    RecordingStatus,
};
