//! Recording domain: captured audio values and the recorder state machine

pub mod asset;
pub mod buffer;
pub mod duration;
pub mod machine;
pub mod state;

pub use asset::{AssetError, AudioAsset, Fragment, PcmFormat};
pub use buffer::ChunkBuffer;
pub use duration::Duration;
pub use machine::{AccessId, Cue, Effect, Input, RecordingMachine, SessionId, DEFAULT_COUNTDOWN};
pub use state::{RecorderError, RecordingState, RecordingStatus};
