//! FFmpeg transcoder for promoting staged recordings
//!
//! The booth records into a quick-to-write container and converts the clip
//! into a widely playable file only once the visitor accepts it.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

/// Output format of accepted recordings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Mp4,
    Webm,
}

impl OutputFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Webm => "webm",
        }
    }

    /// Get the FFmpeg video codec for this format
    pub fn video_codec(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "libx264",
            OutputFormat::Webm => "libvpx-vp9",
        }
    }

    /// Get the FFmpeg audio codec for this format
    pub fn audio_codec(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "aac",
            OutputFormat::Webm => "libopus",
        }
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Mp4
    }
}

/// Transcoding errors
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("Failed to start encoder '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Encoder exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Encoder reported success but produced no output at {0}")]
    MissingOutput(PathBuf),
}

/// Converts a staged recording into a permanent output file.
///
/// Implementations block until the conversion is finished.
pub trait Transcoder: Send {
    fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError>;
}

/// Transcoder backed by an external `ffmpeg` process
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: String,
    format: OutputFormat,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<String>, format: OutputFormat) -> Self {
        Self {
            program: program.into(),
            format,
        }
    }

    /// Build the encoder argument list for one conversion
    fn build_args(&self, input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-i".to_string(),
            input.to_string_lossy().to_string(),
            "-c:v".to_string(),
            self.format.video_codec().to_string(),
            "-preset".to_string(),
            "fast".to_string(),
            "-c:a".to_string(),
            self.format.audio_codec().to_string(),
            output.to_string_lossy().to_string(),
            "-y".to_string(),
        ]
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg", OutputFormat::default())
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        let args = self.build_args(input, output);
        tracing::info!("Starting FFmpeg transcode: {:?}", args);

        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| TranscodeError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            // FFmpeg prints its banner first; the cause is at the end
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            return Err(TranscodeError::Failed {
                status: result.status.to_string(),
                stderr: tail.into_iter().rev().collect::<Vec<_>>().join("\n"),
            });
        }

        if !output.is_file() {
            return Err(TranscodeError::MissingOutput(output.to_path_buf()));
        }

        tracing::info!("FFmpeg transcode finished: {:?}", output);
        Ok(())
    }
}
