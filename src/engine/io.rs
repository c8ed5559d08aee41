//! Audio file I/O
//!
//! The decode/encode boundary around the processing core. WAV files are read
//! through `hound` and converted to 16-bit PCM; mixes are written back as
//! 16-bit PCM WAV. Sample rate conversion uses linear interpolation.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use serde::Serialize;
use tracing::debug;

use crate::engine::buffer::{saturate, AudioBuffer, ChannelLayout, BIT_DEPTH, SAMPLE_MAX};
use crate::error::{Result, SubliminalError};

/// File extensions the decoder accepts
pub const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "wave"];

// ============================================================================
// Audio sources
// ============================================================================

/// Something the pipeline can decode into an [`AudioBuffer`]
///
/// Decode failures must surface here, before any processing starts.
pub trait AudioSource {
    /// Decode the source into raw PCM
    fn load(&self) -> Result<AudioBuffer>;

    /// Short human-readable label for logs
    fn describe(&self) -> String;
}

/// A WAV file on disk
#[derive(Debug, Clone)]
pub struct WavFile {
    path: PathBuf,
}

impl WavFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AudioSource for WavFile {
    fn load(&self) -> Result<AudioBuffer> {
        import_audio(&self.path)
    }

    fn describe(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "wav file".to_string())
    }
}

/// WAV data already held in memory (e.g. an uploaded request body)
#[derive(Debug, Clone)]
pub struct WavBytes {
    name: String,
    bytes: Vec<u8>,
}

impl WavBytes {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

impl AudioSource for WavBytes {
    fn load(&self) -> Result<AudioBuffer> {
        let reader = WavReader::new(Cursor::new(&self.bytes[..])).map_err(invalid_wav)?;
        decode_reader(reader)
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

impl AudioSource for AudioBuffer {
    fn load(&self) -> Result<AudioBuffer> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        format!(
            "in-memory buffer ({} ch, {} Hz, {} ms)",
            self.channels(),
            self.sample_rate(),
            self.duration_ms()
        )
    }
}

// ============================================================================
// Import / export
// ============================================================================

/// Import a WAV file as 16-bit PCM
///
/// The file keeps its original sample rate and channel count; the pipeline
/// conforms it afterwards.
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * `InvalidFormat` - If the file is not a readable WAV file
/// * `UnsupportedFormat` - If the audio has more than 2 channels or an
///   unsupported bit depth
pub fn import_audio(path: &Path) -> Result<AudioBuffer> {
    if !path.exists() {
        return Err(SubliminalError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let reader = WavReader::open(path).map_err(invalid_wav)?;
    let buffer = decode_reader(reader)?;

    debug!(
        file = %path.display(),
        channels = buffer.channels(),
        sample_rate = buffer.sample_rate(),
        duration_ms = buffer.duration_ms(),
        "decoded audio"
    );

    Ok(buffer)
}

/// Serialize a buffer as a 16-bit PCM WAV file in memory
pub fn encode_wav(buffer: &AudioBuffer) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: buffer.channels() as u16,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: BIT_DEPTH,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + buffer.samples().len() * 2));
    {
        let mut writer = WavWriter::new(&mut cursor, spec).map_err(encode_error)?;
        let mut samples = writer.get_i16_writer(buffer.samples().len() as u32);
        for &sample in buffer.samples() {
            samples.write_sample(sample);
        }
        samples.flush().map_err(encode_error)?;
        writer.finalize().map_err(encode_error)?;
    }

    Ok(cursor.into_inner())
}

/// Write a buffer to disk as a 16-bit PCM WAV file
pub fn export_audio(buffer: &AudioBuffer, path: &Path) -> Result<()> {
    let bytes = encode_wav(buffer)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Basic facts about an audio file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioInfo {
    pub duration_ms: u64,
    pub duration_secs: f64,
    pub channels: u16,
    pub sample_rate: u32,
    /// Bytes per sample in the source file
    pub sample_width: u16,
}

/// Check that a file decodes to non-empty audio and describe it
pub fn inspect(path: &Path) -> Result<AudioInfo> {
    if !path.exists() {
        return Err(SubliminalError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let reader = WavReader::open(path).map_err(invalid_wav)?;
    let spec = reader.spec();
    let frames = reader.duration() as u64;

    if frames == 0 {
        return Err(SubliminalError::EmptyInput {
            track: "input".to_string(),
        });
    }
    if spec.sample_rate == 0 {
        return Err(SubliminalError::InvalidFormat {
            reason: "Sample rate is zero".to_string(),
            source: None,
        });
    }

    Ok(AudioInfo {
        duration_ms: (frames as f64 * 1000.0 / spec.sample_rate as f64).round() as u64,
        duration_secs: frames as f64 / spec.sample_rate as f64,
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        sample_width: spec.bits_per_sample.div_ceil(8),
    })
}

/// Check whether a path has an extension the decoder accepts
pub fn is_supported_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

// ============================================================================
// Format conforming
// ============================================================================

/// Bring a buffer to the given layout and sample rate
pub fn conform(buffer: &AudioBuffer, layout: ChannelLayout, sample_rate: u32) -> AudioBuffer {
    let resampled = resample(buffer, sample_rate);
    match layout {
        ChannelLayout::Mono => resampled.to_mono(),
        ChannelLayout::Stereo => resampled.to_stereo(),
    }
}

/// Resample every channel of a buffer to `target_rate`
///
/// Uses linear interpolation. Returns a clone when the rate already matches.
pub fn resample(buffer: &AudioBuffer, target_rate: u32) -> AudioBuffer {
    if buffer.sample_rate() == target_rate || target_rate == 0 {
        return buffer.clone();
    }

    let ratio = target_rate as f64 / buffer.sample_rate() as f64;
    let channels: Vec<Vec<i16>> = (0..buffer.channels())
        .map(|ch| resample_linear(&buffer.channel(ch), ratio))
        .collect();

    let frames = channels.first().map(|c| c.len()).unwrap_or(0);
    let mut samples = Vec::with_capacity(frames * channels.len());
    for frame in 0..frames {
        for channel in &channels {
            samples.push(channel[frame]);
        }
    }

    AudioBuffer::from_parts(samples, buffer.layout(), target_rate)
}

/// Linear interpolation resampling of one channel
fn resample_linear(samples: &[i16], ratio: f64) -> Vec<i16> {
    if samples.is_empty() {
        return Vec::new();
    }

    let source_len = samples.len();
    let target_len = ((source_len as f64) * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(target_len);

    for i in 0..target_len {
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = src_pos - src_idx as f64;

        let sample = if src_idx + 1 < source_len {
            samples[src_idx] as f64 * (1.0 - frac) + samples[src_idx + 1] as f64 * frac
        } else if src_idx < source_len {
            samples[src_idx] as f64
        } else {
            0.0
        };

        output.push(sample.round() as i16);
    }

    output
}

// ============================================================================
// Test fixtures
// ============================================================================

/// Generate a full-scale mono sine tone
pub fn generate_test_tone(frequency: f64, duration_secs: f64, sample_rate: u32) -> AudioBuffer {
    let num_samples = (sample_rate as f64 * duration_secs) as usize;
    let angular_freq = 2.0 * std::f64::consts::PI * frequency / sample_rate as f64;

    let samples = (0..num_samples)
        .map(|i| ((angular_freq * i as f64).sin() * SAMPLE_MAX as f64) as i16)
        .collect();

    AudioBuffer::from_parts(samples, ChannelLayout::Mono, sample_rate)
}

/// Write the standard affirmation (5s, 440Hz) and background (10s, 220Hz)
/// fixtures into `dir`, returning their paths
pub fn generate_test_fixtures(dir: &Path, sample_rate: u32) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)?;

    let affirmation = dir.join("affirmation_test.wav");
    export_audio(&generate_test_tone(440.0, 5.0, sample_rate), &affirmation)?;

    let background = dir.join("background_test.wav");
    export_audio(&generate_test_tone(220.0, 10.0, sample_rate), &background)?;

    Ok((affirmation, background))
}

// ============================================================================
// Internal helper functions
// ============================================================================

fn invalid_wav(e: hound::Error) -> SubliminalError {
    match e {
        hound::Error::IoError(io) if io.kind() != std::io::ErrorKind::UnexpectedEof => {
            SubliminalError::Io(io)
        }
        other => SubliminalError::InvalidFormat {
            reason: format!("Failed to read WAV data: {}", other),
            source: Some(Box::new(other)),
        },
    }
}

fn encode_error(e: hound::Error) -> SubliminalError {
    match e {
        hound::Error::IoError(io) => SubliminalError::Io(io),
        other => SubliminalError::processing(format!("WAV encoding failed: {}", other)),
    }
}

fn decode_reader<R: std::io::Read>(reader: WavReader<R>) -> Result<AudioBuffer> {
    let spec = reader.spec();
    let layout = ChannelLayout::from_count(spec.channels as usize).ok_or_else(|| {
        SubliminalError::UnsupportedFormat {
            format: format!("{}-channel audio (only mono/stereo supported)", spec.channels),
        }
    })?;

    let samples = read_samples_as_i16(reader, spec.bits_per_sample, spec.sample_format)?;
    AudioBuffer::new(samples, layout, spec.sample_rate)
}

/// Read samples from a WAV reader and convert them to 16-bit
fn read_samples_as_i16<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<i16>> {
    let read_failed = |e: hound::Error| SubliminalError::InvalidFormat {
        reason: format!("Failed to read {}-bit samples: {}", bits_per_sample, e),
        source: Some(Box::new(e)),
    };

    match (sample_format, bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .map(|s| s.map(|v| saturate(v as f64 * 32768.0)))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(read_failed),
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| (v as i16) << 8))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(read_failed),
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(read_failed),
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| (v >> 8) as i16))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(read_failed),
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| (v >> 16) as i16))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(read_failed),
        (format, bits) => Err(SubliminalError::UnsupportedFormat {
            format: format!("{}-bit {:?} audio", bits, format),
        }),
    }
}

// ============================================================================
// Tests
// ============================================================================
