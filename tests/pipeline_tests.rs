//! Integration Tests
//!
//! End-to-end runs of the subliminal mix pipeline.

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use subliminal::config::ProcessingConfig;
use subliminal::dsp::{generate_tone, loop_to_duration, overlay};
use subliminal::engine::{
    encode_wav, generate_test_fixtures, import_audio, AudioBuffer, ChannelLayout, WavBytes,
    WavFile,
};
use subliminal::pipeline::{
    MixPipeline, NoProgress, PipelineStage, ProgressEvent, RecordingProgress, STEP_COUNT,
};
use subliminal::SubliminalError;

fn default_pipeline() -> MixPipeline {
    MixPipeline::new(ProcessingConfig::default()).unwrap()
}

// === Full Pipeline Tests ===

#[test]
fn test_reference_scenario_from_files() {
    let dir = tempdir().unwrap();
    let (affirmation, background) = generate_test_fixtures(dir.path(), 44100).unwrap();

    let result = default_pipeline()
        .run(
            &WavFile::new(&affirmation),
            &WavFile::new(&background),
            &NoProgress,
        )
        .unwrap();

    assert_eq!(result.buffer.layout(), ChannelLayout::Stereo);
    assert_eq!(result.buffer.sample_rate(), 44100);
    assert_eq!(result.buffer.frames(), 441_000);
    assert_eq!(result.duration_ms, 10_000);

    // The -1 dBFS target drives the loud 220Hz background into the ceiling,
    // so the measured level settles about 1 dB under the target
    let level = result.buffer.dbfs();
    assert!(
        (level - -1.98).abs() < 0.1,
        "Expected about -1.98 dBFS, got {:.3} dBFS",
        level
    );
    assert_eq!(result.buffer.peak(), 32768);
}

#[test]
fn test_wav_bytes_decode_to_result_buffer() {
    let dir = tempdir().unwrap();
    let affirmation = generate_tone(440.0, 1000, 44100);
    let background = generate_tone(220.0, 2000, 44100);

    let result = default_pipeline()
        .run(&affirmation, &background, &NoProgress)
        .unwrap();

    let path = dir.path().join("mix.wav");
    std::fs::write(&path, &result.wav_bytes).unwrap();
    let decoded = import_audio(&path).unwrap();

    assert_eq!(decoded, result.buffer);
}

#[test]
fn test_stages_with_binaural() {
    let result = default_pipeline()
        .run(
            &generate_tone(440.0, 500, 44100),
            &generate_tone(220.0, 800, 44100),
            &NoProgress,
        )
        .unwrap();

    assert_eq!(
        result.stages,
        vec![
            PipelineStage::Loaded,
            PipelineStage::Modulated,
            PipelineStage::TrackNormalized,
            PipelineStage::VolumeAdjusted,
            PipelineStage::Aligned,
            PipelineStage::BinauralGenerated,
            PipelineStage::Mixed,
            PipelineStage::FinalNormalized,
            PipelineStage::Exported,
        ]
    );
}

#[test]
fn test_binaural_disabled_skips_stage() {
    let config = ProcessingConfig {
        enable_binaural: false,
        ..ProcessingConfig::default()
    };
    let result = MixPipeline::new(config)
        .unwrap()
        .run(
            &generate_tone(440.0, 500, 44100),
            &generate_tone(220.0, 800, 44100),
            &NoProgress,
        )
        .unwrap();

    assert!(!result.stages.contains(&PipelineStage::BinauralGenerated));
    assert_eq!(result.stages.last(), Some(&PipelineStage::Exported));
}

#[test]
fn test_progress_events_in_order() {
    let recorder = RecordingProgress::new();
    default_pipeline()
        .run(
            &generate_tone(440.0, 300, 44100),
            &generate_tone(220.0, 600, 44100),
            &recorder,
        )
        .unwrap();

    let events = recorder.events();
    let steps: Vec<u32> = events.iter().map(|e| e.step).collect();
    assert_eq!(steps, (1..=STEP_COUNT).collect::<Vec<_>>());
    assert!(events.iter().all(|e| e.total == 8));
    assert!(events.iter().all(|e| !e.message.is_empty()));
}

#[test]
fn test_background_is_looped_when_shorter() {
    let result = default_pipeline()
        .run(
            &generate_tone(440.0, 1500, 44100),
            &generate_tone(220.0, 400, 44100),
            &NoProgress,
        )
        .unwrap();

    assert_eq!(result.duration_ms, 1500);
    assert_eq!(result.buffer.frames(), 66_150);
}

#[test]
fn test_inputs_at_other_rates_are_conformed() {
    let left = generate_tone(300.0, 600, 48000);
    let right = generate_tone(500.0, 600, 48000);
    let stereo_background = AudioBuffer::from_channels(left.samples(), right.samples(), 48000).unwrap();
    let affirmation = generate_tone(440.0, 400, 22050);

    let result = default_pipeline()
        .run(&affirmation, &stereo_background, &NoProgress)
        .unwrap();

    assert_eq!(result.buffer.sample_rate(), 44100);
    assert_eq!(result.buffer.channels(), 2);
    assert!((result.duration_ms as i64 - 600).abs() <= 1);
}

#[test]
fn test_subliminal_sits_far_below_background() {
    let background = generate_tone(220.0, 1000, 44100);
    let config = ProcessingConfig {
        enable_binaural: false,
        master_level_db: -20.0,
        ..ProcessingConfig::default()
    };
    let with_voice = MixPipeline::new(config.clone())
        .unwrap()
        .run(&generate_tone(440.0, 1000, 44100), &background, &NoProgress)
        .unwrap();
    let silent_voice = MixPipeline::new(config)
        .unwrap()
        .run(
            &AudioBuffer::mono(vec![0; 44100], 44100).unwrap(),
            &background,
            &NoProgress,
        )
        .unwrap();

    // Modulated voice at -43 dBFS barely moves a -3 dBFS background
    let difference = (with_voice.buffer.dbfs() - silent_voice.buffer.dbfs()).abs();
    assert!(difference < 0.1, "Level moved by {:.3} dB", difference);
}

// === Failure Tests ===

#[test]
fn test_empty_affirmation_reports_empty_input() {
    let recorder = RecordingProgress::new();
    let empty = AudioBuffer::silent(0, ChannelLayout::Mono, 44100);

    let err = default_pipeline()
        .run(&empty, &generate_tone(220.0, 500, 44100), &recorder)
        .unwrap_err();

    assert!(matches!(err, SubliminalError::EmptyInput { ref track } if track == "affirmation"));
    assert!(err.is_recoverable());
    assert_eq!(recorder.events().len(), 1);
}

#[test]
fn test_missing_file_reported_before_processing() {
    let dir = tempdir().unwrap();
    let recorder = RecordingProgress::new();

    let err = default_pipeline()
        .run(
            &WavFile::new(dir.path().join("missing.wav")),
            &generate_tone(220.0, 500, 44100),
            &recorder,
        )
        .unwrap_err();

    assert_eq!(err.error_code(), "FILE_NOT_FOUND");
    assert!(recorder.events().iter().all(|e| e.step == 1));
}

#[test]
fn test_corrupt_background_is_invalid_format() {
    let err = default_pipeline()
        .run(
            &generate_tone(440.0, 500, 44100),
            &WavBytes::new("upload.wav", vec![0x52, 0x49, 0x46, 0x46, 0, 0]),
            &NoProgress,
        )
        .unwrap_err();

    assert_eq!(err.error_code(), "INVALID_FORMAT");
}

#[test]
fn test_observer_panics_do_not_affect_the_mix() {
    let affirmation = generate_tone(440.0, 300, 44100);
    let background = generate_tone(220.0, 300, 44100);
    let reference = default_pipeline()
        .run(&affirmation, &background, &NoProgress)
        .unwrap();

    for panic_step in [1, 7] {
        let panicking = |event: &ProgressEvent| {
            if event.step == panic_step {
                panic!("observer failure on step {}", event.step);
            }
        };

        let result = default_pipeline()
            .run(&affirmation, &background, &panicking)
            .unwrap();

        assert_eq!(result.wav_bytes, reference.wav_bytes);
    }
}

// === Primitive Composition Tests ===

#[test]
fn test_loop_then_overlay_matches_lengths() {
    let voice = loop_to_duration(&generate_tone(440.0, 2000, 44100), 5000);
    let music = generate_tone(220.0, 5000, 44100);

    let mixed = overlay(&music, &voice).unwrap();
    assert_eq!(mixed.duration_ms(), 5000);
    assert!(encode_wav(&mixed).unwrap().starts_with(b"RIFF"));
}

#[test]
fn test_concurrent_runs_share_nothing() {
    let pipeline = default_pipeline();
    let handles: Vec<_> = (0..3)
        .map(|i| {
            let pipeline = pipeline.clone();
            std::thread::spawn(move || {
                pipeline
                    .run(
                        &generate_tone(440.0 + i as f64 * 10.0, 300, 44100),
                        &generate_tone(220.0, 500, 44100),
                        &NoProgress,
                    )
                    .map(|r| r.duration_ms)
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), 500);
    }
}
