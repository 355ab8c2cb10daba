//! Recording file staging
//!
//! A recording lives in a single temporary file inside the recordings
//! directory until the visitor decides about it:
//! - accepted clips are promoted (transcoded) to `video_<timestamp>.<ext>`
//! - rejected or timed-out clips are discarded
//!
//! Lookups and deletes never fail loudly: a missing or unreadable file is
//! treated as "nothing staged".

pub mod transcode;

pub use transcode::{FfmpegTranscoder, OutputFormat, TranscodeError, Transcoder};

use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name prefix shared by every staged recording
pub const STAGING_PREFIX: &str = "temp_rec";

/// Container the recorder writes while a clip is staged
pub const STAGING_EXTENSION: &str = "webm";

/// Timestamp layout used in accepted file names
const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Staging-related errors
#[derive(Error, Debug)]
pub enum StagingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transcode failed: {0}")]
    Transcode(#[from] TranscodeError),
}

/// Owns the recordings directory and the one in-flight staged file
pub struct Staging {
    dir: PathBuf,
    format: OutputFormat,
    transcoder: Box<dyn Transcoder>,

    /// Path handed to the recorder for the current cycle
    slot: Option<PathBuf>,
}

impl Staging {
    pub fn new(
        dir: impl Into<PathBuf>,
        format: OutputFormat,
        transcoder: Box<dyn Transcoder>,
    ) -> Self {
        Self {
            dir: dir.into(),
            format,
            transcoder,
            slot: None,
        }
    }

    /// Recordings directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the recordings directory if it does not exist yet
    pub fn ensure_dir(&self) -> Result<(), StagingError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
            tracing::info!("Created recordings directory {:?}", self.dir);
        }
        Ok(())
    }

    /// Deterministic path of the next staged recording
    pub fn stage_path(&self) -> PathBuf {
        self.dir.join(format!("{}.{}", STAGING_PREFIX, STAGING_EXTENSION))
    }

    /// Reserve the staged path for a new recording cycle
    pub fn arm(&mut self) -> PathBuf {
        let path = self.stage_path();
        self.slot = Some(path.clone());
        path
    }

    /// Locate the staged recording, if any
    ///
    /// The reserved slot wins when its file exists. Otherwise the directory is
    /// scanned for files starting with the staging prefix and the first one
    /// (by name) is returned. An unreadable directory yields `None`.
    pub fn find_staged(&self) -> Option<PathBuf> {
        if let Some(slot) = &self.slot {
            if slot.is_file() {
                return Some(slot.clone());
            }
        }

        self.scan_staged().into_iter().next()
    }

    /// Promote a staged recording to a permanent, timestamped output file
    ///
    /// Blocks until the transcoder finishes. The staged file is left in place;
    /// the caller discards it as part of the reset.
    pub fn promote(&mut self, staged: &Path) -> Result<PathBuf, StagingError> {
        self.promote_at(staged, Local::now())
    }

    /// Same as [`Staging::promote`] with an explicit timestamp
    pub fn promote_at(
        &mut self,
        staged: &Path,
        timestamp: DateTime<Local>,
    ) -> Result<PathBuf, StagingError> {
        let output = self.output_path(timestamp);
        tracing::info!("Promoting {:?} to {:?}", staged, output);

        self.transcoder.transcode(staged, &output)?;
        Ok(output)
    }

    /// Output path for a clip accepted at `timestamp`
    pub fn output_path(&self, timestamp: DateTime<Local>) -> PathBuf {
        self.dir.join(format!(
            "video_{}.{}",
            timestamp.format(OUTPUT_TIMESTAMP_FORMAT),
            self.format.extension()
        ))
    }

    /// Delete every staged file; returns how many were removed
    ///
    /// Individual delete failures are ignored.
    pub fn discard_staged(&mut self) -> usize {
        self.slot = None;

        let mut removed = 0;
        for path in self.scan_staged() {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => tracing::debug!("Could not remove staged file {:?}: {}", path, e),
            }
        }

        if removed > 0 {
            tracing::debug!("Discarded {} staged file(s)", removed);
        }
        removed
    }

    /// All regular files in the recordings directory with the staging prefix
    fn scan_staged(&self) -> Vec<PathBuf> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("Recordings directory {:?} unreadable: {}", self.dir, e);
                return Vec::new();
            }
        };

        let mut staged: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .map(|name| name.starts_with(STAGING_PREFIX))
                    .unwrap_or(false)
            })
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();

        staged.sort();
        staged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    /// Copies the input instead of encoding it
    struct CopyTranscoder;

    impl Transcoder for CopyTranscoder {
        fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
            fs::copy(input, output).map_err(|e| TranscodeError::Spawn {
                program: "copy".to_string(),
                source: e,
            })?;
            Ok(())
        }
    }

    struct FailingTranscoder;

    impl Transcoder for FailingTranscoder {
        fn transcode(&self, _input: &Path, _output: &Path) -> Result<(), TranscodeError> {
            Err(TranscodeError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "boom".to_string(),
            })
        }
    }

    fn staging(dir: &Path, transcoder: Box<dyn Transcoder>) -> Staging {
        Staging::new(dir, OutputFormat::Mp4, transcoder)
    }

    #[test]
    fn test_stage_path_is_deterministic() {
        let dir = tempdir().unwrap();
        let staging = staging(dir.path(), Box::new(CopyTranscoder));
        assert_eq!(staging.stage_path(), dir.path().join("temp_rec.webm"));
        assert_eq!(staging.stage_path(), staging.stage_path());
    }

    #[test]
    fn test_ensure_dir_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let recordings = dir.path().join("recordings");
        let staging = staging(&recordings, Box::new(CopyTranscoder));

        staging.ensure_dir().unwrap();
        assert!(recordings.is_dir());
        // Second call is a no-op
        staging.ensure_dir().unwrap();
    }

    #[test]
    fn test_find_staged_prefers_slot_then_scans() {
        let dir = tempdir().unwrap();
        let mut staging = staging(dir.path(), Box::new(CopyTranscoder));
        assert_eq!(staging.find_staged(), None);

        // Recorder chose a different extension than requested
        fs::write(dir.path().join("temp_rec.mkv"), b"x").unwrap();
        fs::write(dir.path().join("video_old.mp4"), b"x").unwrap();
        assert_eq!(staging.find_staged(), Some(dir.path().join("temp_rec.mkv")));

        let armed = staging.arm();
        fs::write(&armed, b"x").unwrap();
        assert_eq!(staging.find_staged(), Some(armed));
    }

    #[test]
    fn test_find_staged_ignores_directories() {
        let dir = tempdir().unwrap();
        let staging = staging(dir.path(), Box::new(CopyTranscoder));
        fs::create_dir(dir.path().join("temp_rec_dir")).unwrap();
        assert_eq!(staging.find_staged(), None);
    }

    #[test]
    fn test_find_staged_unreadable_directory_is_none() {
        let dir = tempdir().unwrap();
        let staging = staging(&dir.path().join("missing"), Box::new(CopyTranscoder));
        assert_eq!(staging.find_staged(), None);
    }

    #[test]
    fn test_output_path_uses_timestamp() {
        let dir = tempdir().unwrap();
        let staging = staging(dir.path(), Box::new(CopyTranscoder));
        let ts = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            staging.output_path(ts),
            dir.path().join("video_2024-03-09_07-05-01.mp4")
        );
    }

    #[test]
    fn test_promote_writes_output() {
        let dir = tempdir().unwrap();
        let mut staging = staging(dir.path(), Box::new(CopyTranscoder));
        let staged = staging.arm();
        fs::write(&staged, b"clip").unwrap();

        let ts = Local.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let output = staging.promote_at(&staged, ts).unwrap();

        assert_eq!(output, dir.path().join("video_2024-01-01_12-00-00.mp4"));
        assert_eq!(fs::read(&output).unwrap(), b"clip");
    }

    #[test]
    fn test_promote_failure_is_reported() {
        let dir = tempdir().unwrap();
        let mut staging = staging(dir.path(), Box::new(FailingTranscoder));
        let staged = staging.arm();
        fs::write(&staged, b"clip").unwrap();

        let err = staging.promote(&staged).unwrap_err();
        assert!(matches!(err, StagingError::Transcode(TranscodeError::Failed { .. })));
    }

    #[test]
    fn test_discard_removes_all_staged_files() {
        let dir = tempdir().unwrap();
        let mut staging = staging(dir.path(), Box::new(CopyTranscoder));
        let armed = staging.arm();
        fs::write(&armed, b"a").unwrap();
        fs::write(dir.path().join("temp_rec.mkv"), b"b").unwrap();
        fs::write(dir.path().join("video_keep.mp4"), b"c").unwrap();

        assert_eq!(staging.discard_staged(), 2);
        assert_eq!(staging.find_staged(), None);
        assert!(dir.path().join("video_keep.mp4").exists());

        // Nothing left: tolerated
        assert_eq!(staging.discard_staged(), 0);
    }

    #[test]
    fn test_discard_on_missing_directory_is_noop() {
        let dir = tempdir().unwrap();
        let mut staging = staging(&dir.path().join("missing"), Box::new(CopyTranscoder));
        assert_eq!(staging.discard_staged(), 0);
    }
}
