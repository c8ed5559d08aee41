//! Output storage and retention
//!
//! Finished mixes are written into an output folder under a unique,
//! timestamped name. Files only ever appear there complete: the WAV data is
//! written to a hidden temp file first and renamed into place.
//!
//! Retention is a separate, explicit sweep that removes expired files and
//! caps how many files each folder may hold.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::Result;
use crate::pipeline::MixResult;

/// Prefix of every stored mix
const OUTPUT_PREFIX: &str = "Subliminal_Master_";

const OUTPUT_EXTENSION: &str = ".wav";

/// Prefix of in-flight temp files
const PARTIAL_PREFIX: &str = ".partial_";

/// Default age after which files are removed
pub const DEFAULT_MAX_AGE_HOURS: u32 = 24;

/// Default number of files kept per folder
pub const DEFAULT_MAX_FILES: usize = 100;

// ============================================================================
// OutputStore
// ============================================================================

/// A mix that has been written to disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredOutput {
    pub path: PathBuf,
    pub file_name: String,
    pub byte_size: u64,
    pub duration_ms: u64,
    /// Hex SHA-256 of the file contents
    pub sha256: String,
}

impl StoredOutput {
    pub fn size_mb(&self) -> f64 {
        self.byte_size as f64 / (1024.0 * 1024.0)
    }
}

/// Durable location for finished mixes
#[derive(Debug, Clone)]
pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a mix into the store
    ///
    /// # Arguments
    /// * `result` - A finished pipeline run
    ///
    /// # Returns
    /// Where the mix was written, with its size and checksum.
    pub fn save(&self, result: &MixResult) -> Result<StoredOutput> {
        fs::create_dir_all(&self.root)?;

        let file_name = output_file_name(Utc::now());
        let path = self.root.join(&file_name);
        let partial = self.root.join(format!("{}{}", PARTIAL_PREFIX, file_name));

        if let Err(e) = fs::write(&partial, &result.wav_bytes) {
            let _ = fs::remove_file(&partial);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&partial, &path) {
            let _ = fs::remove_file(&partial);
            return Err(e.into());
        }

        let sha256 = format!("{:x}", Sha256::digest(&result.wav_bytes));
        info!(file = %file_name, bytes = result.wav_bytes.len(), "stored mix");

        Ok(StoredOutput {
            path,
            file_name,
            byte_size: result.wav_bytes.len() as u64,
            duration_ms: result.duration_ms,
            sha256,
        })
    }

    /// All stored mixes, newest first
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let mut outputs: Vec<PathBuf> = list_files(&self.root)
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .map(|name| {
                        let name = name.to_string_lossy();
                        name.starts_with(OUTPUT_PREFIX) && name.ends_with(OUTPUT_EXTENSION)
                    })
                    .unwrap_or(false)
            })
            .collect();

        // Names embed the timestamp, so reverse lexical order is newest first
        outputs.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
        Ok(outputs)
    }
}

/// `Subliminal_Master_YYYYMMDD_HHMMSS_xxxxxxxx.wav`
fn output_file_name(now: DateTime<Utc>) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!(
        "{}{}_{}{}",
        OUTPUT_PREFIX,
        now.format("%Y%m%d_%H%M%S"),
        &id[..8],
        OUTPUT_EXTENSION
    )
}

// ============================================================================
// Retention
// ============================================================================

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub removed_files: usize,
    pub freed_bytes: u64,
}

/// Age and count limits for stored files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_age_hours: u32,
    pub max_files: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age_hours: DEFAULT_MAX_AGE_HOURS,
            max_files: DEFAULT_MAX_FILES,
        }
    }
}

impl RetentionPolicy {
    pub fn new(max_age_hours: u32, max_files: usize) -> Self {
        Self {
            max_age_hours,
            max_files,
        }
    }

    /// Apply the policy to every folder in `folders`
    ///
    /// Files older than `max_age_hours` go first; after that, the oldest
    /// files beyond `max_files` are removed from each folder. Files that
    /// cannot be inspected or deleted are logged and skipped.
    ///
    /// In-flight temp files from [`OutputStore::save`] never count toward
    /// `max_files`; they are only removed once they have expired.
    pub fn sweep<P: AsRef<Path>>(&self, folders: &[P]) -> SweepReport {
        let now = Utc::now();
        folders
            .iter()
            .map(|folder| self.sweep_folder(folder.as_ref(), now))
            .fold(SweepReport::default(), |acc, r| SweepReport {
                removed_files: acc.removed_files + r.removed_files,
                freed_bytes: acc.freed_bytes + r.freed_bytes,
            })
    }

    fn sweep_folder(&self, folder: &Path, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();
        let max_age = Duration::try_hours(i64::from(self.max_age_hours));

        let mut survivors: Vec<(PathBuf, DateTime<Utc>, u64)> = Vec::new();
        for path in list_files(folder) {
            let (modified, size) = match file_stamp(&path) {
                Some(stamp) => stamp,
                None => continue,
            };

            let expired = max_age.map_or(false, |max| now.signed_duration_since(modified) > max);
            if expired {
                if remove(&path) {
                    report.removed_files += 1;
                    report.freed_bytes += size;
                }
            } else if !is_partial(&path) {
                survivors.push((path, modified, size));
            }
        }

        // Newest first; everything past max_files is surplus
        survivors.sort_by(|a, b| b.1.cmp(&a.1));
        for (path, _, size) in survivors.iter().skip(self.max_files) {
            if remove(path) {
                report.removed_files += 1;
                report.freed_bytes += size;
            }
        }

        if report.removed_files > 0 {
            info!(
                folder = %folder.display(),
                removed = report.removed_files,
                freed_bytes = report.freed_bytes,
                "retention sweep"
            );
        }
        report
    }
}

/// Regular files directly inside `dir`
fn list_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        return Vec::new();
    }

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path().to_path_buf())
        .collect()
}

fn is_partial(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with(PARTIAL_PREFIX))
        .unwrap_or(false)
}

fn file_stamp(path: &Path) -> Option<(DateTime<Utc>, u64)> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot stat file");
            return None;
        }
    };
    let modified: SystemTime = metadata.modified().ok()?;
    Some((DateTime::<Utc>::from(modified), metadata.len()))
}

fn remove(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed");
            true
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to remove file");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::generate_tone;
    use crate::engine::io::encode_wav;
    use std::time::Duration as StdDuration;
    use tempfile::tempdir;

    fn fake_result() -> MixResult {
        let buffer = generate_tone(440.0, 100, 8000).to_stereo();
        let wav_bytes = encode_wav(&buffer).unwrap();
        MixResult {
            duration_ms: buffer.duration_ms(),
            byte_size: wav_bytes.len(),
            wav_bytes,
            buffer,
            stages: Vec::new(),
        }
    }

    fn touch(dir: &Path, name: &str, age: StdDuration) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"data").unwrap();
        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
        path
    }

    #[test]
    fn test_output_file_name_format() {
        let now = DateTime::parse_from_rfc3339("2024-03-05T07:08:09Z")
            .unwrap()
            .with_timezone(&Utc);
        let name = output_file_name(now);
        assert!(name.starts_with("Subliminal_Master_20240305_070809_"));
        assert!(name.ends_with(".wav"));
        assert_eq!(name.len(), "Subliminal_Master_20240305_070809_".len() + 8 + 4);
    }

    #[test]
    fn test_save_writes_complete_file() {
        let dir = tempdir().unwrap();
        let store = OutputStore::new(dir.path().join("output"));
        let result = fake_result();

        let stored = store.save(&result).unwrap();

        assert_eq!(fs::read(&stored.path).unwrap(), result.wav_bytes);
        assert_eq!(stored.byte_size, result.wav_bytes.len() as u64);
        assert_eq!(stored.sha256.len(), 64);
        assert_eq!(store.list().unwrap(), vec![stored.path.clone()]);
    }

    #[test]
    fn test_save_leaves_no_partial_files() {
        let dir = tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        store.save(&fake_result()).unwrap();

        let leftovers = list_files(dir.path())
            .into_iter()
            .filter(|p| p.to_string_lossy().contains(PARTIAL_PREFIX))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_names_are_unique() {
        let dir = tempdir().unwrap();
        let store = OutputStore::new(dir.path());
        let a = store.save(&fake_result()).unwrap();
        let b = store.save(&fake_result()).unwrap();
        assert_ne!(a.file_name, b.file_name);
    }

    #[test]
    fn test_sweep_removes_expired_files() {
        let dir = tempdir().unwrap();
        let old = touch(dir.path(), "old.wav", StdDuration::from_secs(48 * 3600));
        let fresh = touch(dir.path(), "fresh.wav", StdDuration::from_secs(60));

        let report = RetentionPolicy::default().sweep(&[dir.path()]);

        assert_eq!(report.removed_files, 1);
        assert_eq!(report.freed_bytes, 4);
        assert!(!old.exists());
        assert!(fresh.exists());
    }

    #[test]
    fn test_sweep_caps_file_count() {
        let dir = tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..5)
            .map(|i| touch(dir.path(), &format!("f{}.wav", i), StdDuration::from_secs(60 * (i + 1))))
            .collect();

        let report = RetentionPolicy::new(24, 2).sweep(&[dir.path()]);

        assert_eq!(report.removed_files, 3);
        assert!(paths[0].exists());
        assert!(paths[1].exists());
        assert!(paths[2..].iter().all(|p| !p.exists()));
    }

    #[test]
    fn test_sweep_leaves_fresh_partial_files() {
        let dir = tempdir().unwrap();
        let partial = touch(dir.path(), ".partial_Subliminal_Master_x.wav", StdDuration::from_secs(5));
        let finished = touch(dir.path(), "Subliminal_Master_x.wav", StdDuration::from_secs(5));

        let report = RetentionPolicy::new(24, 0).sweep(&[dir.path()]);

        assert_eq!(report.removed_files, 1);
        assert!(partial.exists());
        assert!(!finished.exists());
    }

    #[test]
    fn test_sweep_removes_abandoned_partial_files() {
        let dir = tempdir().unwrap();
        let partial = touch(dir.path(), ".partial_old.wav", StdDuration::from_secs(30 * 3600));

        RetentionPolicy::default().sweep(&[dir.path()]);

        assert!(!partial.exists());
    }

    #[test]
    fn test_huge_max_age_keeps_old_files() {
        let dir = tempdir().unwrap();
        let old = touch(dir.path(), "old.wav", StdDuration::from_secs(400 * 24 * 3600));

        let report = RetentionPolicy::new(u32::MAX, 10).sweep(&[dir.path()]);

        assert_eq!(report, SweepReport::default());
        assert!(old.exists());
    }

    #[test]
    fn test_sweep_missing_folder_is_noop() {
        let dir = tempdir().unwrap();
        let report = RetentionPolicy::default().sweep(&[dir.path().join("nope")]);
        assert_eq!(report, SweepReport::default());
    }
}
