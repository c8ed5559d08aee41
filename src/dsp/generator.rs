//! Tone and binaural beat generation
//!
//! Tones are computed from the absolute sample index, so the same arguments
//! always produce the same samples.

use tracing::debug;

use crate::engine::buffer::{frames_for_ms, saturate, AudioBuffer, ChannelLayout, SAMPLE_MAX};
use crate::error::Result;

use super::normalizer::apply_gain;

/// Generate a full-scale mono sine tone starting at phase zero
///
/// # Arguments
/// * `frequency_hz` - Tone frequency
/// * `duration_ms` - Length of the tone
/// * `sample_rate_hz` - Sample rate of the output buffer; 0 is clamped to
///   1 Hz, which yields an empty tone
pub fn generate_tone(frequency_hz: f64, duration_ms: u64, sample_rate_hz: u32) -> AudioBuffer {
    let frames = frames_for_ms(duration_ms, sample_rate_hz);
    AudioBuffer::from_parts(
        tone_samples(frequency_hz, frames, sample_rate_hz),
        ChannelLayout::Mono,
        sample_rate_hz.max(1),
    )
}

/// Generate a stereo binaural beat
///
/// The left channel carries a steady tone at `left_freq_hz`, the right one at
/// `right_freq_hz`. Both channels are then attenuated by `volume_db`. The
/// perceived beat of `|right - left|` Hz only exists in the listener's head;
/// the two tones are never summed here.
pub fn generate_binaural_beat(
    duration_ms: u64,
    left_freq_hz: f64,
    right_freq_hz: f64,
    volume_db: f64,
    sample_rate_hz: u32,
) -> Result<AudioBuffer> {
    debug!(
        left_freq_hz,
        right_freq_hz,
        beat_hz = (right_freq_hz - left_freq_hz).abs(),
        "generating binaural beat"
    );

    let frames = frames_for_ms(duration_ms, sample_rate_hz);
    binaural_beat_frames(frames, left_freq_hz, right_freq_hz, volume_db, sample_rate_hz)
}

/// Frame-exact variant of [`generate_binaural_beat`]
pub(crate) fn binaural_beat_frames(
    frames: usize,
    left_freq_hz: f64,
    right_freq_hz: f64,
    volume_db: f64,
    sample_rate_hz: u32,
) -> Result<AudioBuffer> {
    let left = tone_samples(left_freq_hz, frames, sample_rate_hz);
    let right = tone_samples(right_freq_hz, frames, sample_rate_hz);

    let beat = AudioBuffer::from_channels(&left, &right, sample_rate_hz)?;
    Ok(apply_gain(&beat, volume_db))
}

fn tone_samples(frequency_hz: f64, frames: usize, sample_rate_hz: u32) -> Vec<i16> {
    let step = 2.0 * std::f64::consts::PI * frequency_hz / sample_rate_hz.max(1) as f64;
    (0..frames)
        .map(|i| saturate((step * i as f64).sin() * SAMPLE_MAX as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::db_to_linear;

    #[test]
    fn test_tone_starts_at_zero_phase() {
        let tone = generate_tone(440.0, 100, 44100);
        assert_eq!(tone.frames(), 4410);
        assert_eq!(tone.samples()[0], 0);
        assert!(tone.samples()[1] > 0);
    }

    #[test]
    fn test_tone_at_zero_rate_is_empty() {
        let tone = generate_tone(440.0, 100, 0);
        assert_eq!(tone.sample_rate(), 1);
        assert!(tone.is_empty());
        assert_eq!(tone.duration_ms(), 0);
    }

    #[test]
    fn test_tone_uses_full_range() {
        let tone = generate_tone(441.0, 1000, 44100);
        assert!(tone.peak() >= 32760);
        assert!(tone.peak() <= 32767);
    }

    #[test]
    fn test_tone_is_deterministic() {
        assert_eq!(generate_tone(523.25, 250, 48000), generate_tone(523.25, 250, 48000));
    }

    #[test]
    fn test_binaural_beat_scenario() {
        let beat = generate_binaural_beat(5000, 430.0, 434.0, -15.0, 44100).unwrap();

        assert_eq!(beat.channels(), 2);
        assert_eq!(beat.frames(), 220_500);
        assert_eq!(beat.samples().len(), 441_000);
        assert_eq!(beat.duration_ms(), 5000);
    }

    #[test]
    fn test_binaural_channels_hold_separate_tones() {
        let beat = generate_binaural_beat(200, 430.0, 434.0, 0.0, 44100).unwrap();
        let left = generate_tone(430.0, 200, 44100);
        let right = generate_tone(434.0, 200, 44100);

        assert_eq!(beat.channel(0), left.samples());
        assert_eq!(beat.channel(1), right.samples());
    }

    #[test]
    fn test_binaural_volume_applied_to_both_channels() {
        let beat = generate_binaural_beat(1000, 300.0, 310.0, -15.0, 44100).unwrap();
        let expected_peak = 32767.0 * db_to_linear(-15.0);

        for ch in 0..2 {
            let peak = beat.channel(ch).iter().map(|s| (*s as f64).abs()).fold(0.0, f64::max);
            assert!(
                (peak - expected_peak).abs() < 10.0,
                "channel {} peak {} expected {}",
                ch,
                peak,
                expected_peak
            );
        }
    }
}
