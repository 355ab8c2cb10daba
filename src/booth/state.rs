//! Booth state and configuration
//!
//! Defines the session state machine states, the status-line presentation
//! values, and the startup configuration.

use crate::booth::input::{Key, KeyPress, Modifiers};
use crate::staging::OutputFormat;
use crate::utils::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Longest allowed recording before the timeout warning
pub const MAX_RECORDING_SECS: u32 = 600;

/// Seconds the visitor has to keep a timed-out recording
pub const WARNING_SECS: u32 = 10;

/// Wait after stopping the recorder before the file is read
pub const GRACE_DELAY_MS: u64 = 500;

/// Recordings directory name, relative to the working directory
pub const RECORDINGS_DIR: &str = "recordings";

/// Current state of the booth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// Live camera, waiting for a visitor
    Idle,
    /// Recording in progress
    Recording,
    /// Recording hit the time limit, counting down to a reset
    TimeoutWarning,
    /// Looping playback of the staged clip
    Review,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Styling of the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusStyle {
    Normal,
    Recording,
    Warning,
}

/// Surface shown in the main area of the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum View {
    Camera,
    Playback,
}

/// Which presenter renders the status line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PresenterKind {
    /// Colored status line on the terminal
    Console,
    /// Newline-delimited JSON directives for an external UI
    Json,
}

/// Startup configuration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoothConfig {
    /// Directory holding staged and accepted recordings
    pub recordings_dir: PathBuf,

    /// Recording length that triggers the timeout warning
    pub max_recording_secs: u32,

    /// Countdown before a timed-out recording is dropped
    pub warning_secs: u32,

    /// Delay between stopping the recorder and entering review
    #[serde(with = "duration_ms")]
    pub grace_delay: Duration,

    /// Interval of the elapsed and warning timers
    #[serde(with = "duration_ms")]
    pub tick_interval: Duration,

    /// Operator exit combination
    #[serde(skip)]
    pub exit_combo: KeyPress,

    /// Encoder executable used for promotion
    pub encoder: String,

    /// Format of accepted recordings
    #[serde(skip)]
    pub output_format: OutputFormat,

    /// Capture input passed to ffmpeg/ffplay (`-f <format> -i <device>`)
    pub capture_format: String,
    pub capture_device: String,

    pub presenter: PresenterKind,

    /// Log destination; stderr when unset
    pub log_file: Option<PathBuf>,
}

impl Default for BoothConfig {
    fn default() -> Self {
        let (capture_format, capture_device) = default_capture_input();
        Self {
            recordings_dir: PathBuf::from(RECORDINGS_DIR),
            max_recording_secs: MAX_RECORDING_SECS,
            warning_secs: WARNING_SECS,
            grace_delay: Duration::from_millis(GRACE_DELAY_MS),
            tick_interval: Duration::from_secs(1),
            exit_combo: KeyPress::new(
                Key::Char('q'),
                Modifiers {
                    ctrl: true,
                    shift: true,
                    alt: false,
                },
            ),
            encoder: "ffmpeg".to_string(),
            output_format: OutputFormat::Mp4,
            capture_format: capture_format.to_string(),
            capture_device: capture_device.to_string(),
            presenter: PresenterKind::Console,
            log_file: None,
        }
    }
}

impl BoothConfig {
    /// Defaults with deployment paths taken from the environment
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("BOOTH_RECORDINGS_DIR") {
            config.recordings_dir = PathBuf::from(dir);
        }
        if let Some(device) = lookup("BOOTH_CAPTURE_DEVICE") {
            config.capture_device = device;
        }
        if let Some(encoder) = lookup("BOOTH_ENCODER") {
            config.encoder = encoder;
        }
        if let Some(path) = lookup("BOOTH_LOG_FILE") {
            config.log_file = Some(PathBuf::from(path));
        }
        if let Some(presenter) = lookup("BOOTH_PRESENTER") {
            config.presenter = match presenter.to_ascii_lowercase().as_str() {
                "console" => PresenterKind::Console,
                "json" => PresenterKind::Json,
                other => {
                    return Err(AppError::Config(format!(
                        "Unknown BOOTH_PRESENTER '{}', expected 'console' or 'json'",
                        other
                    )))
                }
            };
        }

        Ok(config)
    }
}

/// Platform default capture input as (ffmpeg format, device)
fn default_capture_input() -> (&'static str, &'static str) {
    #[cfg(target_os = "macos")]
    {
        ("avfoundation", "0:0")
    }

    #[cfg(target_os = "windows")]
    {
        ("dshow", "video=Integrated Camera")
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        ("v4l2", "/dev/video0")
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}
