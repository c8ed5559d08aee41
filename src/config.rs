//! Processing configuration
//!
//! A [`ProcessingConfig`] is built once per pipeline run and never changes
//! while the run is in progress. Partial JSON objects are accepted; missing
//! fields take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SubliminalError};

// ============================================================================
// Defaults and limits
// ============================================================================

pub const DEFAULT_CARRIER_FREQ_HZ: f64 = 17_500.0;
pub const CARRIER_FREQ_RANGE: (f64, f64) = (15_000.0, 20_000.0);

pub const DEFAULT_SUBLIMINAL_VOLUME_DB: f64 = -23.0;
pub const SUBLIMINAL_VOLUME_RANGE: (f64, f64) = (-40.0, 0.0);

pub const DEFAULT_BACKGROUND_VOLUME_DB: f64 = 0.0;
pub const BACKGROUND_VOLUME_RANGE: (f64, f64) = (-20.0, 10.0);

/// Left ear 430Hz, right ear 434Hz: a 4Hz theta beat
pub const DEFAULT_BINAURAL_LEFT_HZ: f64 = 430.0;
pub const DEFAULT_BINAURAL_RIGHT_HZ: f64 = 434.0;
pub const BINAURAL_FREQ_RANGE: (f64, f64) = (200.0, 500.0);

pub const DEFAULT_BINAURAL_VOLUME_DB: f64 = -15.0;
pub const BINAURAL_VOLUME_RANGE: (f64, f64) = (-40.0, 0.0);

pub const DEFAULT_TARGET_SAMPLE_RATE_HZ: u32 = 44_100;
pub const SAMPLE_RATE_RANGE: (f64, f64) = (8_000.0, 192_000.0);

pub const DEFAULT_REFERENCE_LEVEL_DB: f64 = -20.0;
pub const DEFAULT_MASTER_LEVEL_DB: f64 = -1.0;
pub const LEVEL_RANGE: (f64, f64) = (-60.0, 0.0);

// ============================================================================
// ProcessingConfig
// ============================================================================

/// Settings for one mix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Carrier the affirmation is modulated onto
    pub carrier_freq_hz: f64,
    /// Gain applied to the affirmation after reference normalization
    pub subliminal_volume_db: f64,
    /// Gain applied to the background track
    pub background_volume_db: f64,
    pub enable_binaural: bool,
    pub binaural_left_freq_hz: f64,
    pub binaural_right_freq_hz: f64,
    pub binaural_volume_db: f64,
    pub target_sample_rate_hz: u32,
    /// Level the modulated affirmation is normalized to before
    /// `subliminal_volume_db` is applied
    pub reference_level_db: f64,
    /// Loudness of the final mix
    pub master_level_db: f64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            carrier_freq_hz: DEFAULT_CARRIER_FREQ_HZ,
            subliminal_volume_db: DEFAULT_SUBLIMINAL_VOLUME_DB,
            background_volume_db: DEFAULT_BACKGROUND_VOLUME_DB,
            enable_binaural: true,
            binaural_left_freq_hz: DEFAULT_BINAURAL_LEFT_HZ,
            binaural_right_freq_hz: DEFAULT_BINAURAL_RIGHT_HZ,
            binaural_volume_db: DEFAULT_BINAURAL_VOLUME_DB,
            target_sample_rate_hz: DEFAULT_TARGET_SAMPLE_RATE_HZ,
            reference_level_db: DEFAULT_REFERENCE_LEVEL_DB,
            master_level_db: DEFAULT_MASTER_LEVEL_DB,
        }
    }
}

impl ProcessingConfig {
    /// Parse a config from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SubliminalError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check every setting against its allowed range
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<()> {
        check("carrier_freq_hz", self.carrier_freq_hz, CARRIER_FREQ_RANGE)?;
        check(
            "subliminal_volume_db",
            self.subliminal_volume_db,
            SUBLIMINAL_VOLUME_RANGE,
        )?;
        check(
            "background_volume_db",
            self.background_volume_db,
            BACKGROUND_VOLUME_RANGE,
        )?;
        check(
            "binaural_left_freq_hz",
            self.binaural_left_freq_hz,
            BINAURAL_FREQ_RANGE,
        )?;
        check(
            "binaural_right_freq_hz",
            self.binaural_right_freq_hz,
            BINAURAL_FREQ_RANGE,
        )?;
        check(
            "binaural_volume_db",
            self.binaural_volume_db,
            BINAURAL_VOLUME_RANGE,
        )?;
        check(
            "target_sample_rate_hz",
            self.target_sample_rate_hz as f64,
            SAMPLE_RATE_RANGE,
        )?;
        check("reference_level_db", self.reference_level_db, LEVEL_RANGE)?;
        check("master_level_db", self.master_level_db, LEVEL_RANGE)?;
        Ok(())
    }

    /// Beat frequency heard when binaural is enabled
    pub fn beat_frequency_hz(&self) -> f64 {
        (self.binaural_right_freq_hz - self.binaural_left_freq_hz).abs()
    }
}

fn check(field: &'static str, value: f64, (min, max): (f64, f64)) -> Result<()> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(SubliminalError::InvalidConfig {
            field,
            value,
            min,
            max,
        })
    }
}

// ============================================================================
// Limits (for front ends)
// ============================================================================

/// Default, minimum and maximum of one setting
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamLimit {
    pub default: f64,
    pub min: f64,
    pub max: f64,
}

impl ParamLimit {
    fn new(default: f64, (min, max): (f64, f64)) -> Self {
        Self { default, min, max }
    }
}

/// Every user-adjustable setting with its default and range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigLimits {
    pub carrier_freq_hz: ParamLimit,
    pub subliminal_volume_db: ParamLimit,
    pub background_volume_db: ParamLimit,
    pub binaural_left_freq_hz: ParamLimit,
    pub binaural_right_freq_hz: ParamLimit,
    pub binaural_volume_db: ParamLimit,
}

impl ConfigLimits {
    pub fn current() -> Self {
        Self {
            carrier_freq_hz: ParamLimit::new(DEFAULT_CARRIER_FREQ_HZ, CARRIER_FREQ_RANGE),
            subliminal_volume_db: ParamLimit::new(
                DEFAULT_SUBLIMINAL_VOLUME_DB,
                SUBLIMINAL_VOLUME_RANGE,
            ),
            background_volume_db: ParamLimit::new(
                DEFAULT_BACKGROUND_VOLUME_DB,
                BACKGROUND_VOLUME_RANGE,
            ),
            binaural_left_freq_hz: ParamLimit::new(DEFAULT_BINAURAL_LEFT_HZ, BINAURAL_FREQ_RANGE),
            binaural_right_freq_hz: ParamLimit::new(
                DEFAULT_BINAURAL_RIGHT_HZ,
                BINAURAL_FREQ_RANGE,
            ),
            binaural_volume_db: ParamLimit::new(DEFAULT_BINAURAL_VOLUME_DB, BINAURAL_VOLUME_RANGE),
        }
    }
}
