//! Mix pipeline
//!
//! Turns an affirmation recording and a background track into one stereo
//! subliminal master:
//!
//! 1. Load both inputs
//! 2. Modulate the affirmation onto the carrier, normalize it to the
//!    reference level, then apply the subliminal volume
//! 3. Apply the background volume
//! 4. Loop the shorter track up to the length of the longer one
//! 5. Generate the binaural beat (optional)
//! 6. Overlay everything onto the background
//! 7. Normalize the mix to the master level
//! 8. Encode to WAV
//!
//! Load failures are returned as-is. Anything that fails from step 2 on is
//! logged in full and reported as [`SubliminalError::ProcessingFailure`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error, info, warn};

use crate::config::ProcessingConfig;
use crate::dsp::{apply_gain, binaural_beat_frames, loop_to_frames, modulate, normalize, overlay};
use crate::engine::buffer::AudioBuffer;
use crate::engine::io::{conform, encode_wav, AudioSource};
use crate::error::{Result, SubliminalError};
use crate::pipeline::progress::{ProgressEvent, ProgressObserver};
use crate::pipeline::stage::{PipelineStage, StageTracker, STEP_COUNT};

/// Output of a successful run
#[derive(Debug, Clone)]
pub struct MixResult {
    /// Final stereo 16-bit mix
    pub buffer: AudioBuffer,
    pub duration_ms: u64,
    /// Size of `wav_bytes`
    pub byte_size: usize,
    /// The mix serialized as a 16-bit PCM WAV file
    pub wav_bytes: Vec<u8>,
    /// States the run passed through, in order
    pub stages: Vec<PipelineStage>,
}

/// Runs the subliminal mix for one fixed configuration
///
/// A pipeline holds no mutable state; one instance can serve any number of
/// runs, including concurrent ones.
#[derive(Debug, Clone)]
pub struct MixPipeline {
    config: ProcessingConfig,
}

impl MixPipeline {
    /// Create a pipeline
    ///
    /// # Errors
    /// * `InvalidConfig` - if any setting is outside its allowed range
    pub fn new(config: ProcessingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Mix `affirmation` over `background`
    ///
    /// # Arguments
    /// * `affirmation` - Spoken affirmation, any rate, mono or stereo
    /// * `background` - Music or ambience the affirmation is hidden in
    /// * `progress` - Receives one event before each of the eight steps
    ///
    /// # Errors
    /// * `FileNotFound`, `InvalidFormat`, `UnsupportedFormat` - an input
    ///   could not be decoded
    /// * `EmptyInput` - an input decoded to zero frames
    /// * `ProcessingFailure` - any later step failed (details are logged)
    pub fn run(
        &self,
        affirmation: &dyn AudioSource,
        background: &dyn AudioSource,
        progress: &dyn ProgressObserver,
    ) -> Result<MixResult> {
        let mut tracker = StageTracker::new();

        report(progress, 1, "Loading audio files...");
        let affirmation = load_track(affirmation, "affirmation")?;
        let background = load_track(background, "background")?;
        tracker.advance(PipelineStage::Loaded)?;

        info!(
            affirmation_ms = affirmation.duration_ms(),
            background_ms = background.duration_ms(),
            "loaded input tracks"
        );

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.process(&affirmation, &background, tracker, progress)
        }));

        match outcome {
            Ok(Ok(result)) => {
                info!(
                    duration_ms = result.duration_ms,
                    byte_size = result.byte_size,
                    "mix complete"
                );
                Ok(result)
            }
            Ok(Err(e)) => {
                error!(code = e.error_code(), error = %e, "mix failed");
                Err(SubliminalError::ProcessingFailure)
            }
            Err(payload) => {
                error!(panic = %panic_detail(payload.as_ref()), "mix stage panicked");
                Err(SubliminalError::ProcessingFailure)
            }
        }
    }

    /// Steps 2 to 8
    fn process(
        &self,
        affirmation: &AudioBuffer,
        background: &AudioBuffer,
        mut tracker: StageTracker,
        progress: &dyn ProgressObserver,
    ) -> Result<MixResult> {
        let config = &self.config;
        let rate = config.target_sample_rate_hz;

        begin_step(progress, 2, "Applying silent subliminal modulation...")?;
        let modulated = modulate(affirmation, config.carrier_freq_hz, rate);
        tracker.advance(PipelineStage::Modulated)?;

        let normalized = normalize(&modulated, config.reference_level_db);
        tracker.advance(PipelineStage::TrackNormalized)?;

        let subliminal = apply_gain(&normalized, config.subliminal_volume_db);
        debug!(
            reference_db = config.reference_level_db,
            subliminal_volume_db = config.subliminal_volume_db,
            level_dbfs = subliminal.dbfs(),
            "subliminal track ready"
        );

        begin_step(progress, 3, "Adjusting background volume...")?;
        let background = conform(background, background.layout(), rate);
        let background = apply_gain(&background, config.background_volume_db);
        tracker.advance(PipelineStage::VolumeAdjusted)?;
        debug!(
            background_volume_db = config.background_volume_db,
            "background track ready"
        );

        begin_step(progress, 4, "Matching track lengths...")?;
        let target_frames = subliminal.frames().max(background.frames());
        let subliminal = extend_to(subliminal, target_frames);
        let background = extend_to(background, target_frames);
        tracker.advance(PipelineStage::Aligned)?;
        debug!(
            frames = target_frames,
            duration_ms = background.duration_ms(),
            "tracks aligned"
        );

        let beat = if config.enable_binaural {
            begin_step(progress, 5, "Generating binaural beats...")?;
            let beat = binaural_beat_frames(
                target_frames,
                config.binaural_left_freq_hz,
                config.binaural_right_freq_hz,
                config.binaural_volume_db,
                rate,
            )?;
            tracker.advance(PipelineStage::BinauralGenerated)?;
            info!(
                left_hz = config.binaural_left_freq_hz,
                right_hz = config.binaural_right_freq_hz,
                beat_hz = config.beat_frequency_hz(),
                volume_db = config.binaural_volume_db,
                "binaural beat generated"
            );
            Some(beat)
        } else {
            begin_step(progress, 5, "Binaural beats disabled, skipping...")?;
            None
        };

        begin_step(progress, 6, "Mixing tracks...")?;
        let mut mixed = overlay(&background, &subliminal.to_stereo())?;
        if let Some(beat) = &beat {
            mixed = overlay(&mixed, beat)?;
        }
        tracker.advance(PipelineStage::Mixed)?;

        begin_step(progress, 7, "Normalizing final mix...")?;
        let master = normalize(&mixed, config.master_level_db);
        tracker.advance(PipelineStage::FinalNormalized)?;

        begin_step(progress, 8, "Exporting final audio...")?;
        let wav_bytes = encode_wav(&master)?;
        tracker.advance(PipelineStage::Exported)?;

        Ok(MixResult {
            duration_ms: master.duration_ms(),
            byte_size: wav_bytes.len(),
            wav_bytes,
            buffer: master,
            stages: tracker.visited().to_vec(),
        })
    }
}

fn load_track(source: &dyn AudioSource, track: &str) -> Result<AudioBuffer> {
    let buffer = source.load()?;
    if buffer.is_empty() {
        return Err(SubliminalError::EmptyInput {
            track: track.to_string(),
        });
    }
    debug!(track, source = %source.describe(), frames = buffer.frames(), "decoded");
    Ok(buffer)
}

/// Loop `buffer` up to `frames`; never shortens it
fn extend_to(buffer: AudioBuffer, frames: usize) -> AudioBuffer {
    if buffer.frames() < frames {
        loop_to_frames(&buffer, frames)
    } else {
        buffer
    }
}

/// Announce a step to the log and the observer
///
/// A panicking observer is logged and otherwise ignored.
fn report(progress: &dyn ProgressObserver, step: u32, message: &str) {
    info!("[step {}/{}] {}", step, STEP_COUNT, message);
    let event = ProgressEvent {
        step,
        total: STEP_COUNT,
        message: message.to_string(),
    };
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| progress.on_progress(&event))) {
        warn!(step, panic = %panic_detail(payload.as_ref()), "progress observer panicked");
    }
}

fn begin_step(progress: &dyn ProgressObserver, step: u32, message: &str) -> Result<()> {
    report(progress, step, message);
    checkpoint(step)
}

#[cfg(not(test))]
#[inline]
fn checkpoint(_step: u32) -> Result<()> {
    Ok(())
}

#[cfg(test)]
thread_local! {
    /// Step at which the current thread's runs fail, and whether by panic
    static INJECTED_FAILURE: std::cell::Cell<Option<(u32, bool)>> =
        const { std::cell::Cell::new(None) };
}

#[cfg(test)]
fn checkpoint(step: u32) -> Result<()> {
    match INJECTED_FAILURE.with(|f| f.get()) {
        Some((at, true)) if at == step => panic!("injected panic at step {} in /tmp/work", step),
        Some((at, false)) if at == step => Err(SubliminalError::processing(format!(
            "injected error at step {} in /tmp/work",
            step
        ))),
        _ => Ok(()),
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
