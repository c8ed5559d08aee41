//! Audio Buffer Management
//!
//! Provides the core audio buffer type and level utilities.
//! All internal math and the exported file use 16-bit signed PCM.

use crate::error::{Result, SubliminalError};

// ============================================================================
// Constants
// ============================================================================

/// Default processing and export sample rate (44.1kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Bit depth used for every buffer
pub const BIT_DEPTH: u16 = 16;

/// Largest positive sample value
pub const SAMPLE_MAX: i16 = i16::MAX;

/// Smallest negative sample value
pub const SAMPLE_MIN: i16 = i16::MIN;

/// Reference amplitude for dBFS (2^15)
pub const FULL_SCALE: f64 = 32768.0;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Returns negative infinity for zero input.
#[inline]
pub fn linear_to_db(linear: f64) -> f64 {
    if linear <= 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Number of frames covering `duration_ms` at `sample_rate` (floored)
#[inline]
pub fn frames_for_ms(duration_ms: u64, sample_rate: u32) -> usize {
    (duration_ms * sample_rate as u64 / 1000) as usize
}

/// Convert a floating point amplitude to a 16-bit sample
///
/// Values outside the 16-bit range saturate; the fractional part is
/// truncated toward zero.
#[inline]
pub fn saturate(value: f64) -> i16 {
    num_traits::clamp(value, SAMPLE_MIN as f64, SAMPLE_MAX as f64) as i16
}

// ============================================================================
// Channel Layout
// ============================================================================

/// Audio channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelLayout {
    /// Single channel (mono)
    #[default]
    Mono,
    /// Two channels (stereo: left, right)
    Stereo,
}

impl ChannelLayout {
    /// Returns the number of channels for this layout
    pub fn num_channels(&self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    /// Create a ChannelLayout from a channel count
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            _ => None,
        }
    }
}

// ============================================================================
// Audio Buffer
// ============================================================================

/// Raw 16-bit PCM samples plus format metadata
///
/// Samples are stored interleaved: `[L0, R0, L1, R1, ...]` for stereo.
/// A buffer with zero samples is valid and represents zero-length silence.
///
/// Buffers are never mutated by the transforms in [`crate::dsp`]; each
/// transform returns a fresh buffer.
///
/// # Example
/// ```
/// use subliminal::engine::{AudioBuffer, ChannelLayout};
///
/// let buffer = AudioBuffer::silent(44100, ChannelLayout::Stereo, 44100);
/// assert_eq!(buffer.channels(), 2);
/// assert_eq!(buffer.frames(), 44100);
/// assert_eq!(buffer.duration_ms(), 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBuffer {
    samples: Vec<i16>,
    sample_rate: u32,
    layout: ChannelLayout,
}

impl AudioBuffer {
    /// Create a buffer from interleaved samples
    ///
    /// # Errors
    /// * `InvalidFormat` - if the sample rate is zero or the sample count is
    ///   not a multiple of the channel count
    pub fn new(samples: Vec<i16>, layout: ChannelLayout, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(SubliminalError::InvalidFormat {
                reason: "Sample rate must be positive".to_string(),
                source: None,
            });
        }

        if samples.len() % layout.num_channels() != 0 {
            return Err(SubliminalError::InvalidFormat {
                reason: format!(
                    "Sample count {} is not divisible by channel count {}",
                    samples.len(),
                    layout.num_channels()
                ),
                source: None,
            });
        }

        Ok(Self {
            samples,
            sample_rate,
            layout,
        })
    }

    /// Create a mono buffer
    pub fn mono(samples: Vec<i16>, sample_rate: u32) -> Result<Self> {
        Self::new(samples, ChannelLayout::Mono, sample_rate)
    }

    /// Create a silent buffer holding `frames` frames
    ///
    /// Infallible, so a `sample_rate` of 0 is clamped to 1 Hz. Use
    /// [`AudioBuffer::new`] to reject it instead.
    pub fn silent(frames: usize, layout: ChannelLayout, sample_rate: u32) -> Self {
        Self {
            samples: vec![0; frames * layout.num_channels()],
            sample_rate: sample_rate.max(1),
            layout,
        }
    }

    /// Create a silent buffer lasting `duration_ms`
    pub fn silent_ms(duration_ms: u64, layout: ChannelLayout, sample_rate: u32) -> Self {
        Self::silent(frames_for_ms(duration_ms, sample_rate), layout, sample_rate)
    }

    /// Interleave two equally long mono channels into a stereo buffer
    pub fn from_channels(left: &[i16], right: &[i16], sample_rate: u32) -> Result<Self> {
        if left.len() != right.len() {
            return Err(SubliminalError::processing(format!(
                "Channel length mismatch: left {} vs right {}",
                left.len(),
                right.len()
            )));
        }

        let samples = left
            .iter()
            .zip(right.iter())
            .flat_map(|(&l, &r)| [l, r])
            .collect();

        Self::new(samples, ChannelLayout::Stereo, sample_rate)
    }

    /// Assemble a buffer whose invariants the caller already guarantees
    pub(crate) fn from_parts(samples: Vec<i16>, layout: ChannelLayout, sample_rate: u32) -> Self {
        debug_assert!(sample_rate > 0);
        debug_assert_eq!(samples.len() % layout.num_channels(), 0);
        Self {
            samples,
            sample_rate,
            layout,
        }
    }

    /// Build a buffer in this buffer's format from new interleaved samples
    pub(crate) fn with_samples(&self, samples: Vec<i16>) -> Self {
        debug_assert_eq!(samples.len() % self.channels(), 0);
        Self {
            samples,
            sample_rate: self.sample_rate,
            layout: self.layout,
        }
    }

    /// Interleaved sample data
    #[inline]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Consume the buffer and return its interleaved samples
    pub fn into_samples(self) -> Vec<i16> {
        self.samples
    }

    /// Sample rate in Hz
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel layout
    #[inline]
    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    /// Number of channels
    #[inline]
    pub fn channels(&self) -> usize {
        self.layout.num_channels()
    }

    /// Bit depth (always 16)
    #[inline]
    pub fn bit_depth(&self) -> u16 {
        BIT_DEPTH
    }

    /// Number of frames (samples per channel)
    #[inline]
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels()
    }

    /// Check if the buffer holds no samples
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in milliseconds, rounded to the nearest millisecond
    ///
    /// For any sample rate above 2kHz this round-trips exactly with
    /// [`frames_for_ms`].
    pub fn duration_ms(&self) -> u64 {
        (self.frames() as f64 * 1000.0 / self.sample_rate as f64).round() as u64
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Samples of a single channel, de-interleaved
    pub fn channel(&self, index: usize) -> Vec<i16> {
        self.samples
            .iter()
            .skip(index)
            .step_by(self.channels())
            .copied()
            .collect()
    }

    /// Root-mean-square amplitude over every sample of every channel
    pub fn rms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }

        let sum_squares: f64 = self
            .samples
            .iter()
            .map(|&s| (s as f64) * (s as f64))
            .sum();

        (sum_squares / self.samples.len() as f64).sqrt()
    }

    /// Loudness in dBFS derived from the RMS amplitude
    ///
    /// Returns negative infinity for empty or silent buffers.
    pub fn dbfs(&self) -> f64 {
        linear_to_db(self.rms() / FULL_SCALE)
    }

    /// Largest absolute sample value
    pub fn peak(&self) -> i32 {
        self.samples
            .iter()
            .map(|&s| (s as i32).abs())
            .max()
            .unwrap_or(0)
    }

    /// Check if every sample is zero
    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|&s| s == 0)
    }

    /// First `frames` frames of the buffer (or all of it, if shorter)
    pub fn truncate_frames(&self, frames: usize) -> Self {
        let end = frames.min(self.frames()) * self.channels();
        self.with_samples(self.samples[..end].to_vec())
    }

    /// Downmix to mono by averaging the channels
    pub fn to_mono(&self) -> Self {
        match self.layout {
            ChannelLayout::Mono => self.clone(),
            ChannelLayout::Stereo => {
                let samples = self
                    .samples
                    .chunks_exact(2)
                    .map(|frame| ((frame[0] as i32 + frame[1] as i32) / 2) as i16)
                    .collect();
                Self {
                    samples,
                    sample_rate: self.sample_rate,
                    layout: ChannelLayout::Mono,
                }
            }
        }
    }

    /// Promote to stereo by duplicating the single channel
    pub fn to_stereo(&self) -> Self {
        match self.layout {
            ChannelLayout::Stereo => self.clone(),
            ChannelLayout::Mono => {
                let samples = self.samples.iter().flat_map(|&s| [s, s]).collect();
                Self {
                    samples,
                    sample_rate: self.sample_rate,
                    layout: ChannelLayout::Stereo,
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_db_to_linear() {
        assert_relative_eq!(db_to_linear(0.0), 1.0);
        assert_relative_eq!(db_to_linear(-20.0), 0.1, epsilon = 1e-12);
        assert!((db_to_linear(-6.0206) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_linear_to_db() {
        assert_relative_eq!(linear_to_db(1.0), 0.0);
        assert!((linear_to_db(0.1) - (-20.0)).abs() < 1e-9);
        assert!(linear_to_db(0.0).is_infinite() && linear_to_db(0.0).is_sign_negative());
    }

    #[test]
    fn test_frames_for_ms() {
        assert_eq!(frames_for_ms(5000, 44100), 220500);
        assert_eq!(frames_for_ms(1, 44100), 44);
        assert_eq!(frames_for_ms(0, 44100), 0);
    }

    #[test]
    fn test_duration_round_trips_with_frames() {
        for ms in [1_u64, 7, 999, 1000, 2000, 4321, 10_000] {
            let buffer = AudioBuffer::silent_ms(ms, ChannelLayout::Mono, 44100);
            assert_eq!(buffer.duration_ms(), ms, "duration mismatch for {}ms", ms);
        }
    }

    #[test]
    fn test_saturate() {
        assert_eq!(saturate(40000.0), SAMPLE_MAX);
        assert_eq!(saturate(-40000.0), SAMPLE_MIN);
        assert_eq!(saturate(12.9), 12);
        assert_eq!(saturate(-12.9), -12);
    }

    #[test]
    fn test_new_rejects_ragged_stereo() {
        let result = AudioBuffer::new(vec![1, 2, 3], ChannelLayout::Stereo, 44100);
        assert!(matches!(result, Err(SubliminalError::InvalidFormat { .. })));
    }

    #[test]
    fn test_new_rejects_zero_rate() {
        assert!(AudioBuffer::mono(vec![1, 2, 3], 0).is_err());
    }

    #[test]
    fn test_silent_clamps_zero_rate() {
        let buffer = AudioBuffer::silent(10, ChannelLayout::Mono, 0);
        assert_eq!(buffer.sample_rate(), 1);
        assert_eq!(buffer.frames(), 10);
        assert_eq!(buffer.duration_ms(), 10_000);
    }

    #[test]
    fn test_empty_buffer_is_valid() {
        let buffer = AudioBuffer::mono(Vec::new(), 44100).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.duration_ms(), 0);
        assert!(buffer.dbfs().is_infinite());
    }

    #[test]
    fn test_dbfs_full_scale_square() {
        let buffer = AudioBuffer::mono(vec![SAMPLE_MAX, SAMPLE_MIN].repeat(500), 44100).unwrap();
        assert!(buffer.dbfs().abs() < 0.01);
    }

    #[test]
    fn test_dbfs_half_scale() {
        let buffer = AudioBuffer::mono(vec![16384; 1000], 44100).unwrap();
        assert!((buffer.dbfs() - (-6.0206)).abs() < 0.01);
    }

    #[test]
    fn test_channel_helpers() {
        let stereo = AudioBuffer::from_channels(&[1, 2, 3], &[10, 20, 30], 44100).unwrap();
        assert_eq!(stereo.samples(), &[1, 10, 2, 20, 3, 30]);
        assert_eq!(stereo.channel(1), vec![10, 20, 30]);
        assert_eq!(stereo.frames(), 3);

        let mono = stereo.to_mono();
        assert_eq!(mono.samples(), &[5, 11, 16]);

        let back = mono.to_stereo();
        assert_eq!(back.samples(), &[5, 5, 11, 11, 16, 16]);
    }

    #[test]
    fn test_truncate_frames() {
        let stereo = AudioBuffer::from_channels(&[1, 2, 3], &[4, 5, 6], 44100).unwrap();
        let head = stereo.truncate_frames(2);
        assert_eq!(head.samples(), &[1, 4, 2, 5]);
        assert_eq!(stereo.truncate_frames(10), stereo);
    }

    #[test]
    fn test_peak_handles_min_value() {
        let buffer = AudioBuffer::mono(vec![0, SAMPLE_MIN, 5], 44100).unwrap();
        assert_eq!(buffer.peak(), 32768);
    }
}
