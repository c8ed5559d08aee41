//! Carrier amplitude modulation ("silent subliminal" transform)
//!
//! The affirmation is multiplied by a high-frequency sine carrier, which moves
//! its energy to the sidebands `carrier ± f`. No filtering is applied.
//!
//! Carrier phase is always derived from the absolute sample index
//! (`t_i = i / sample_rate`), never from a running phase accumulator. Anything
//! that processes audio in chunks must carry the absolute index forward.

use tracing::{debug, warn};

use crate::engine::buffer::{saturate, AudioBuffer, ChannelLayout, SAMPLE_MAX};
use crate::engine::io::conform;

/// Amplitude-modulate `buffer` onto a `carrier_freq_hz` sine
///
/// The input is downmixed to mono and resampled to `sample_rate_hz` first.
/// The product is rescaled so its peak sits exactly at the 16-bit ceiling.
/// An all-zero input yields all-zero output of the same length, and an empty
/// input yields an empty buffer.
pub fn modulate(buffer: &AudioBuffer, carrier_freq_hz: f64, sample_rate_hz: u32) -> AudioBuffer {
    let mono = conform(buffer, ChannelLayout::Mono, sample_rate_hz);

    if mono.is_empty() {
        warn!("modulating empty audio, returning empty silence");
        return mono;
    }

    debug!(carrier_freq_hz, frames = mono.frames(), "amplitude modulating");

    let modulated = modulate_from(mono.samples(), 0, carrier_freq_hz, mono.sample_rate());
    let peak = modulated.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));

    let samples = if peak > 0.0 {
        let scale = SAMPLE_MAX as f64 / peak;
        modulated.iter().map(|v| saturate(v * scale)).collect()
    } else {
        vec![0; modulated.len()]
    };

    mono.with_samples(samples)
}

/// Multiply `samples` by the carrier, treating `samples[0]` as absolute
/// sample index `start_index`
fn modulate_from(
    samples: &[i16],
    start_index: usize,
    carrier_freq_hz: f64,
    sample_rate_hz: u32,
) -> Vec<f64> {
    let rate = sample_rate_hz as f64;
    samples
        .iter()
        .enumerate()
        .map(|(offset, &s)| {
            let t = (start_index + offset) as f64 / rate;
            let carrier = (2.0 * std::f64::consts::PI * carrier_freq_hz * t).sin();
            s as f64 * carrier
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CARRIER_FREQ_HZ;
    use crate::dsp::generate_tone;

    #[test]
    fn test_zeros_stay_zero() {
        let silent = AudioBuffer::silent(4410, ChannelLayout::Mono, 44100);
        let result = modulate(&silent, DEFAULT_CARRIER_FREQ_HZ, 44100);
        assert_eq!(result.frames(), 4410);
        assert!(result.is_silent());
    }

    #[test]
    fn test_empty_input_gives_empty_output() {
        let empty = AudioBuffer::silent(0, ChannelLayout::Stereo, 44100);
        let result = modulate(&empty, DEFAULT_CARRIER_FREQ_HZ, 44100);
        assert!(result.is_empty());
        assert_eq!(result.channels(), 1);
    }

    #[test]
    fn test_peak_is_at_ceiling() {
        let voice = generate_tone(440.0, 1000, 44100);
        let result = modulate(&voice, DEFAULT_CARRIER_FREQ_HZ, 44100);
        assert!(result.peak() <= 32767);
        assert!(result.peak() >= 32766);
    }

    #[test]
    fn test_output_is_mono_at_target_rate() {
        let left = generate_tone(440.0, 500, 48000);
        let right = generate_tone(660.0, 500, 48000);
        let stereo = AudioBuffer::from_channels(left.samples(), right.samples(), 48000).unwrap();

        let result = modulate(&stereo, 16_000.0, 44100);
        assert_eq!(result.channels(), 1);
        assert_eq!(result.sample_rate(), 44100);
        assert!((result.frames() as i64 - 22050).abs() <= 1);
    }

    #[test]
    fn test_carrier_uses_absolute_time() {
        let voice = generate_tone(300.0, 200, 44100);
        let whole = modulate_from(voice.samples(), 0, 17_500.0, 44100);

        let split = 3_333;
        let mut chunked = modulate_from(&voice.samples()[..split], 0, 17_500.0, 44100);
        chunked.extend(modulate_from(&voice.samples()[split..], split, 17_500.0, 44100));

        assert_eq!(whole, chunked);
    }

    #[test]
    fn test_constant_input_follows_carrier() {
        let dc = AudioBuffer::mono(vec![1000; 100], 44100).unwrap();
        let result = modulate(&dc, 11_025.0, 44100);
        // A quarter of the sample rate: sin(pi/2 * i) cycles 0, 1, 0, -1
        assert_eq!(result.samples()[0], 0);
        assert!(result.samples()[1] > 32700);
        assert!(result.samples()[2].abs() < 5);
        assert!(result.samples()[3] < -32700);
    }
}
