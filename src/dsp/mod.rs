//! Signal processing primitives
//!
//! Every transform takes its input by reference and returns a new buffer.

mod generator;
mod looper;
mod mixer;
mod modulator;
mod normalizer;

pub use generator::{generate_binaural_beat, generate_tone};
pub use looper::{loop_to_duration, loop_to_frames};
pub use mixer::overlay;
pub use modulator::modulate;
pub use normalizer::{apply_gain, normalize};

pub(crate) use generator::binaural_beat_frames;
