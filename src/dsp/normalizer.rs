//! Loudness normalization and uniform gain

use tracing::debug;

use crate::engine::buffer::{db_to_linear, saturate, AudioBuffer};

/// Rescale a buffer so its RMS loudness equals `target_db` dBFS
///
/// A silent buffer has no defined loudness and is returned unchanged.
/// Samples pushed past the 16-bit range saturate.
pub fn normalize(buffer: &AudioBuffer, target_db: f64) -> AudioBuffer {
    let current_dbfs = buffer.dbfs();
    if !current_dbfs.is_finite() {
        debug!("skipping normalization of silent buffer");
        return buffer.clone();
    }

    let gain_db = target_db - current_dbfs;
    debug!(current_dbfs, target_db, gain_db, "normalizing");
    apply_gain(buffer, gain_db)
}

/// Apply a uniform gain of `gain_db` decibels to every sample
pub fn apply_gain(buffer: &AudioBuffer, gain_db: f64) -> AudioBuffer {
    if gain_db == 0.0 {
        return buffer.clone();
    }

    let gain = db_to_linear(gain_db);
    let samples = buffer
        .samples()
        .iter()
        .map(|&s| saturate((s as f64 * gain).round()))
        .collect();

    buffer.with_samples(samples)
}
