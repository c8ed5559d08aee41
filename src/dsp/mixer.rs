//! Additive overlay of equally long buffers

use crate::engine::buffer::{AudioBuffer, ChannelLayout, SAMPLE_MAX, SAMPLE_MIN};
use crate::error::{Result, SubliminalError};

/// Layer `overlay_buffer` on top of `base`
///
/// Samples are summed per channel and saturate at the 16-bit range. If one
/// side is mono and the other stereo, the mono side is duplicated into both
/// channels first and the result is stereo; otherwise the result has the
/// base's format.
///
/// # Errors
/// * `Processing` - if the buffers differ in sample rate or length
pub fn overlay(base: &AudioBuffer, overlay_buffer: &AudioBuffer) -> Result<AudioBuffer> {
    if base.sample_rate() != overlay_buffer.sample_rate() {
        return Err(SubliminalError::processing(format!(
            "Cannot overlay {} Hz audio onto {} Hz audio",
            overlay_buffer.sample_rate(),
            base.sample_rate()
        )));
    }

    if base.frames() != overlay_buffer.frames() {
        return Err(SubliminalError::processing(format!(
            "Cannot overlay {} frames onto {} frames",
            overlay_buffer.frames(),
            base.frames()
        )));
    }

    let (base, top) = match (base.layout(), overlay_buffer.layout()) {
        (ChannelLayout::Mono, ChannelLayout::Stereo) => (base.to_stereo(), overlay_buffer.clone()),
        (ChannelLayout::Stereo, ChannelLayout::Mono) => (base.clone(), overlay_buffer.to_stereo()),
        _ => (base.clone(), overlay_buffer.clone()),
    };

    let samples = base
        .samples()
        .iter()
        .zip(top.samples())
        .map(|(&a, &b)| (a as i32 + b as i32).clamp(SAMPLE_MIN as i32, SAMPLE_MAX as i32) as i16)
        .collect();

    Ok(base.with_samples(samples))
}
