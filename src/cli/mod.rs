//! CLI Module
//!
//! Command-line interface for the subliminal mixer.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ProcessingConfig;
use crate::storage::{DEFAULT_MAX_AGE_HOURS, DEFAULT_MAX_FILES};

/// Subliminal Mixer - hide affirmations in music with carrier modulation
#[derive(Parser, Debug)]
#[command(name = "subliminal-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mix one affirmation over a background track
    #[command(name = "mix")]
    Mix {
        /// Affirmation recording (WAV)
        affirmation: PathBuf,

        /// Background music or ambience (WAV)
        background: PathBuf,

        /// Where the finished mix is written
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        #[command(flatten)]
        settings: MixSettings,
    },

    /// Mix every WAV file in a folder over the same background
    #[command(name = "batch")]
    Batch {
        /// Folder of affirmation recordings
        folder: PathBuf,

        /// Background music or ambience (WAV)
        background: PathBuf,

        /// Where the finished mixes are written
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        #[command(flatten)]
        settings: MixSettings,
    },

    /// Validate an audio file and print its properties
    #[command(name = "inspect")]
    Inspect {
        /// Audio file to check
        path: PathBuf,
    },

    /// Write the 440Hz affirmation and 220Hz background test files
    #[command(name = "generate-test-audio")]
    GenerateTestAudio {
        /// Target directory
        #[arg(short, long, default_value = "test_audio")]
        dir: PathBuf,
    },

    /// Delete expired files and cap file counts
    #[command(name = "cleanup")]
    Cleanup {
        /// Folders to sweep
        #[arg(required = true)]
        folders: Vec<PathBuf>,

        /// Remove files older than this
        #[arg(long, default_value_t = DEFAULT_MAX_AGE_HOURS)]
        max_age_hours: u32,

        /// Keep at most this many files per folder
        #[arg(long, default_value_t = DEFAULT_MAX_FILES)]
        max_files: usize,
    },

    /// Print every setting with its default and allowed range (JSON)
    #[command(name = "limits")]
    Limits,
}

/// Mix settings shared by `mix` and `batch`
///
/// Flags override values from `--config`, which override the defaults.
#[derive(Args, Debug, Clone, Default)]
pub struct MixSettings {
    /// JSON config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Carrier frequency in Hz
    #[arg(long)]
    pub carrier_freq: Option<f64>,

    /// Subliminal volume in dB
    #[arg(long, allow_hyphen_values = true)]
    pub subliminal_volume: Option<f64>,

    /// Background volume in dB
    #[arg(long, allow_hyphen_values = true)]
    pub background_volume: Option<f64>,

    /// Leave out the binaural beat
    #[arg(long)]
    pub no_binaural: bool,

    /// Binaural left ear frequency in Hz
    #[arg(long)]
    pub binaural_left: Option<f64>,

    /// Binaural right ear frequency in Hz
    #[arg(long)]
    pub binaural_right: Option<f64>,

    /// Binaural volume in dB
    #[arg(long, allow_hyphen_values = true)]
    pub binaural_volume: Option<f64>,
}

impl MixSettings {
    /// Layer the flags over `base`
    pub fn apply(&self, base: ProcessingConfig) -> ProcessingConfig {
        let mut config = base;
        if let Some(v) = self.carrier_freq {
            config.carrier_freq_hz = v;
        }
        if let Some(v) = self.subliminal_volume {
            config.subliminal_volume_db = v;
        }
        if let Some(v) = self.background_volume {
            config.background_volume_db = v;
        }
        if self.no_binaural {
            config.enable_binaural = false;
        }
        if let Some(v) = self.binaural_left {
            config.binaural_left_freq_hz = v;
        }
        if let Some(v) = self.binaural_right {
            config.binaural_right_freq_hz = v;
        }
        if let Some(v) = self.binaural_volume {
            config.binaural_volume_db = v;
        }
        config
    }
}
