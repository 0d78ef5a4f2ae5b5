//! voice-recorder - countdown-gated microphone recorder
//!
//! Records from the microphone after a short countdown and keeps the take
//! in memory so it can be played back, extended or discarded.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Recording state machine, audio values, and errors
//! - **Application**: Port interfaces (traits) and the recording controller
//! - **Infrastructure**: Adapter implementations (cpal, rodio, XDG config)
//! - **CLI**: Command-line interface, argument parsing, and signal handling

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
