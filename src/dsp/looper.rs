//! Looping and truncation to an exact duration

use tracing::debug;

use crate::engine::buffer::{frames_for_ms, AudioBuffer};

/// Extend or cut `buffer` so it lasts exactly `target_duration_ms`
///
/// - Long enough already: keep the first `target_duration_ms`.
/// - Empty: silence of the target duration.
/// - Otherwise: tile the whole buffer `ceil(target / current)` times in one
///   allocation, then cut to length.
pub fn loop_to_duration(buffer: &AudioBuffer, target_duration_ms: u64) -> AudioBuffer {
    loop_to_frames(buffer, frames_for_ms(target_duration_ms, buffer.sample_rate()))
}

/// Frame-exact variant of [`loop_to_duration`]
pub fn loop_to_frames(buffer: &AudioBuffer, target_frames: usize) -> AudioBuffer {
    let current_frames = buffer.frames();

    if current_frames >= target_frames {
        return buffer.truncate_frames(target_frames);
    }

    if current_frames == 0 {
        return AudioBuffer::silent(target_frames, buffer.layout(), buffer.sample_rate());
    }

    let repeats = target_frames.div_ceil(current_frames);
    debug!(current_frames, target_frames, repeats, "looping audio");

    let mut samples = buffer.samples().repeat(repeats);
    samples.truncate(target_frames * buffer.channels());

    buffer.with_samples(samples)
}
