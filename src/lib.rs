//! Subliminal - silent subliminal audio mixing
//!
//! Hides a spoken affirmation inside a background track:
//! 1. The affirmation is amplitude-modulated onto a high-frequency carrier
//! 2. Both tracks are leveled and looped to a common length
//! 3. An optional binaural beat is laid underneath
//! 4. Everything is overlaid, normalized and encoded as a stereo WAV
//!
//! # Architecture
//!
//! - `engine`: the PCM buffer type and the WAV decode/encode boundary
//! - `dsp`: pure transforms (tone generation, modulation, gain, looping, overlay)
//! - `pipeline`: the eight-step orchestrator, its state machine and progress events
//! - `storage`: durable output naming and retention sweeps

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod storage;

pub use config::ProcessingConfig;
pub use error::{Result, SubliminalError};
pub use pipeline::{MixPipeline, MixResult};
