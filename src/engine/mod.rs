//! Audio Engine Module
//!
//! Buffer type and the decode/encode boundary:
//! - Audio buffer and level helpers
//! - WAV import/export, resampling, test fixtures

pub mod buffer;
pub mod io;

pub use buffer::{
    db_to_linear, frames_for_ms, linear_to_db, AudioBuffer, ChannelLayout, DEFAULT_SAMPLE_RATE,
};
pub use io::{
    conform, encode_wav, export_audio, generate_test_fixtures, generate_test_tone, import_audio,
    inspect, resample, AudioInfo, AudioSource, WavBytes, WavFile,
};
