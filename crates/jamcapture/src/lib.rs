//! jamcapture - record, mix and play back jam sessions
//!
//! This library provides:
//! - `pipeline`: step sequences (`rmp`) and the engine that runs them
//! - `record`: supervisor for the FFmpeg capture process
//! - `mix`: mixdown with per-invocation overrides
//! - `play`: playback through the first available player
//! - `sources`: PulseAudio/PipeWire source discovery
//! - `session`: one invocation's profile wired to the backends
//! - `commands`: CLI command implementations

pub mod commands;
pub mod error;
pub mod interrupt;
pub mod mix;
pub mod paths;
pub mod pipeline;
pub mod play;
pub mod record;
pub mod session;
pub mod sources;
pub mod tool;

pub use error::JamError;
pub use interrupt::{Interrupts, StopTokens};
pub use mix::{MixOverrides, Mixer};
pub use pipeline::{Step, StepRunner, StepSequence};
pub use play::Player;
pub use record::{Recorder, RecordingOutcome};
pub use session::Session;
pub use sources::{AudioSources, PulseAudio};
