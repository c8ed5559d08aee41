//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::path::{Path, PathBuf};

use log::{info, warn};
use walkdir::WalkDir;

use crate::cli::MixSettings;
use crate::config::{ConfigLimits, ProcessingConfig};
use crate::engine::io::{generate_test_fixtures, inspect, is_supported_file, WavFile};
use crate::engine::DEFAULT_SAMPLE_RATE;
use crate::error::Result;
use crate::pipeline::{MixPipeline, ProgressEvent};
use crate::storage::{OutputStore, RetentionPolicy, StoredOutput};

/// Build the effective config: defaults, then `--config`, then flags.
pub fn resolve_config(settings: &MixSettings) -> Result<ProcessingConfig> {
    let base = match &settings.config {
        Some(path) => {
            info!("Loading config: {}", path.display());
            ProcessingConfig::from_json_file(path)?
        }
        None => ProcessingConfig::default(),
    };
    let config = settings.apply(base);
    config.validate()?;
    Ok(config)
}

fn print_progress(event: &ProgressEvent) {
    println!("[{}/{}] {}", event.step, event.total, event.message);
}

/// Mix one affirmation over a background and store the result.
pub fn mix(
    affirmation: &Path,
    background: &Path,
    output_dir: &Path,
    settings: &MixSettings,
) -> Result<StoredOutput> {
    let config = resolve_config(settings)?;
    info!(
        "Mixing {} over {} (carrier {} Hz, subliminal {} dB, binaural {})",
        affirmation.display(),
        background.display(),
        config.carrier_freq_hz,
        config.subliminal_volume_db,
        if config.enable_binaural { "on" } else { "off" }
    );

    let pipeline = MixPipeline::new(config)?;
    let result = pipeline.run(
        &WavFile::new(affirmation),
        &WavFile::new(background),
        &print_progress,
    )?;

    let stored = OutputStore::new(output_dir).save(&result)?;

    println!("Mix complete: {}", stored.file_name);
    println!("  Size: {:.2} MB", stored.size_mb());
    println!("  Duration: {:.1} s", stored.duration_ms as f64 / 1000.0);
    println!("  SHA-256: {}", stored.sha256);

    Ok(stored)
}

/// Mix every supported file in `folder` over one background.
///
/// A failing file is reported and skipped; the batch carries on.
pub fn batch(
    folder: &Path,
    background: &Path,
    output_dir: &Path,
    settings: &MixSettings,
) -> Result<usize> {
    let config = resolve_config(settings)?;
    let pipeline = MixPipeline::new(config)?;
    let store = OutputStore::new(output_dir);
    let background_source = WavFile::new(background);

    let inputs = collect_inputs(folder);
    if inputs.is_empty() {
        warn!("No audio files found in {}", folder.display());
        println!("No audio files found in {}", folder.display());
        return Ok(0);
    }

    info!("Batch processing {} files", inputs.len());

    let mut succeeded = 0;
    for (index, input) in inputs.iter().enumerate() {
        println!("[{}/{}] {}", index + 1, inputs.len(), input.display());

        let outcome = pipeline
            .run(&WavFile::new(input), &background_source, &|_: &ProgressEvent| {})
            .and_then(|result| store.save(&result));

        match outcome {
            Ok(stored) => {
                println!("  -> {}", stored.file_name);
                succeeded += 1;
            }
            Err(e) => {
                warn!("Failed to process {}: {}", input.display(), e);
                println!("  FAILED: {}", e.friendly_message());
            }
        }
    }

    println!("Batch complete: {}/{} succeeded", succeeded, inputs.len());
    Ok(succeeded)
}

fn collect_inputs(folder: &Path) -> Vec<PathBuf> {
    let mut inputs: Vec<PathBuf> = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path().to_path_buf())
        .filter(|path| is_supported_file(path))
        .collect();
    inputs.sort();
    inputs
}

/// Validate an audio file and print its properties.
pub fn inspect_file(path: &Path) -> Result<()> {
    info!("Inspecting: {}", path.display());

    let info = inspect(path)?;
    println!("File: {}", path.display());
    println!("  Duration: {:.2} s", info.duration_secs);
    println!("  Channels: {}", info.channels);
    println!("  Sample rate: {} Hz", info.sample_rate);
    println!("  Sample width: {} bytes", info.sample_width);

    Ok(())
}

/// Write the standard test fixtures.
pub fn generate_test_audio(dir: &Path) -> Result<()> {
    let (affirmation, background) = generate_test_fixtures(dir, DEFAULT_SAMPLE_RATE)?;
    println!("Created {}", affirmation.display());
    println!("Created {}", background.display());
    Ok(())
}

/// Run one retention sweep.
pub fn cleanup(folders: &[PathBuf], max_age_hours: u32, max_files: usize) -> Result<()> {
    info!(
        "Sweeping {} folder(s): max age {} h, max {} files",
        folders.len(),
        max_age_hours,
        max_files
    );

    let report = RetentionPolicy::new(max_age_hours, max_files).sweep(folders);
    println!(
        "Removed {} file(s), freed {:.2} MB",
        report.removed_files,
        report.freed_bytes as f64 / (1024.0 * 1024.0)
    );
    Ok(())
}

/// Print the parameter limits as JSON.
pub fn print_limits() -> Result<()> {
    let json = serde_json::to_string_pretty(&ConfigLimits::current())?;
    println!("{}", json);
    Ok(())
}
