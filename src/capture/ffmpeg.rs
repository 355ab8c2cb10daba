//! Process-backed collaborators
//!
//! Thin wrappers that drive `ffplay` for the camera preview and review
//! playback, and `ffmpeg` for recording. Capture devices must allow the
//! preview and the recorder to read at the same time (most V4L2 drivers need
//! a loopback device for that).

use super::traits::{Camera, DeviceError, DeviceResult, Player, Recorder};
use crate::booth::events::BoothEvent;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;

/// How long the recorder gets to finalize its file after `q`
const RECORDER_STOP_TIMEOUT: Duration = Duration::from_secs(3);

/// Capture input as understood by ffmpeg (`-f <format> -i <device>`)
#[derive(Debug, Clone)]
pub struct CaptureInput {
    pub format: String,
    pub device: String,
}

impl CaptureInput {
    fn args(&self) -> [String; 4] {
        [
            "-f".to_string(),
            self.format.clone(),
            "-i".to_string(),
            self.device.clone(),
        ]
    }
}

fn spawn(program: &str, args: &[String], stdin: Stdio) -> DeviceResult<Child> {
    tracing::debug!("Spawning {} {:?}", program, args);
    Command::new(program)
        .args(args)
        .stdin(stdin)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| DeviceError::Spawn {
            program: program.to_string(),
            source: e,
        })
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Fullscreen live preview through `ffplay`
pub struct FfplayCamera {
    program: String,
    input: CaptureInput,
    process: Option<Child>,
}

impl FfplayCamera {
    pub fn new(program: impl Into<String>, input: CaptureInput) -> Self {
        Self {
            program: program.into(),
            input,
            process: None,
        }
    }

    fn build_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-loglevel", "error", "-fs", "-window_title", "booth-camera"]
            .into_iter()
            .map(String::from)
            .collect();
        args.extend(self.input.args());
        args
    }
}

impl Camera for FfplayCamera {
    fn start(&mut self) -> DeviceResult<()> {
        if let Some(child) = self.process.as_mut() {
            if child.try_wait()?.is_none() {
                return Ok(());
            }
        }
        self.process = Some(spawn(&self.program, &self.build_args(), Stdio::null())?);
        tracing::info!("Camera preview started");
        Ok(())
    }

    fn stop(&mut self) -> DeviceResult<()> {
        if let Some(mut child) = self.process.take() {
            kill(&mut child);
            tracing::info!("Camera preview stopped");
        }
        Ok(())
    }
}

impl Drop for FfplayCamera {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Records the capture input to a file through `ffmpeg`
///
/// `stop()` returns immediately; the encoder finishes its file in a
/// background task. Must be used inside a Tokio runtime.
pub struct FfmpegRecorder {
    program: String,
    input: CaptureInput,
    output: Option<PathBuf>,
    process: Option<tokio::process::Child>,
}

impl FfmpegRecorder {
    pub fn new(program: impl Into<String>, input: CaptureInput) -> Self {
        Self {
            program: program.into(),
            input,
            output: None,
            process: None,
        }
    }

    fn build_args(&self, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = ["-loglevel", "error", "-y"]
            .into_iter()
            .map(String::from)
            .collect();
        args.extend(self.input.args());
        args.extend(
            [
                "-c:v",
                "libvpx",
                "-deadline",
                "realtime",
                "-cpu-used",
                "8",
                "-an",
            ]
            .into_iter()
            .map(String::from),
        );
        args.push(output.to_string_lossy().to_string());
        args
    }
}

impl Recorder for FfmpegRecorder {
    fn set_output_location(&mut self, path: &Path) {
        self.output = Some(path.to_path_buf());
    }

    fn record(&mut self) -> DeviceResult<()> {
        let output = self.output.clone().ok_or(DeviceError::NoOutputLocation)?;
        if self.process.is_some() {
            self.stop()?;
        }

        let args = self.build_args(&output);
        tracing::debug!("Spawning {} {:?}", self.program, args);
        let child = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DeviceError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        self.process = Some(child);
        tracing::info!("Recorder writing to {:?}", output);
        Ok(())
    }

    fn stop(&mut self) -> DeviceResult<()> {
        let Some(mut child) = self.process.take() else {
            return Ok(());
        };

        tokio::spawn(async move {
            // `q` asks ffmpeg to finish the container cleanly
            if let Some(mut stdin) = child.stdin.take() {
                let _ = stdin.write_all(b"q").await;
            }

            let waited = tokio::time::timeout(RECORDER_STOP_TIMEOUT, child.wait()).await;
            match waited {
                Ok(Ok(status)) => tracing::info!("Recorder stopped ({})", status),
                Ok(Err(e)) => tracing::warn!("Failed to wait for recorder: {}", e),
                Err(_) => {
                    tracing::warn!(
                        "Recorder did not finish in {:?}, killing it",
                        RECORDER_STOP_TIMEOUT
                    );
                    let _ = child.kill().await;
                }
            }
        });

        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.process.is_some()
    }
}

/// Fullscreen clip playback through `ffplay`
///
/// Playback ending on its own posts [`BoothEvent::PlaybackFinished`]; a
/// `stop()` does not. Must be used inside a Tokio runtime.
pub struct FfplayPlayer {
    program: String,
    source: Option<PathBuf>,
    events: UnboundedSender<BoothEvent>,
    cancel: Option<oneshot::Sender<()>>,
}

impl FfplayPlayer {
    pub fn new(program: impl Into<String>, events: UnboundedSender<BoothEvent>) -> Self {
        Self {
            program: program.into(),
            source: None,
            events,
            cancel: None,
        }
    }

    fn build_args(source: &Path) -> Vec<String> {
        let mut args: Vec<String> = [
            "-loglevel",
            "error",
            "-fs",
            "-autoexit",
            "-window_title",
            "booth-review",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        args.push(source.to_string_lossy().to_string());
        args
    }
}

impl Player for FfplayPlayer {
    fn set_source(&mut self, source: Option<PathBuf>) {
        self.source = source;
    }

    fn play(&mut self) -> DeviceResult<()> {
        self.stop()?;
        let Some(source) = self.source.clone() else {
            return Ok(());
        };

        let mut child = tokio::process::Command::new(&self.program)
            .args(Self::build_args(&source))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DeviceError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let events = self.events.clone();

        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => match status {
                    Ok(status) if status.success() => {
                        let _ = events.send(BoothEvent::PlaybackFinished);
                    }
                    Ok(status) => tracing::warn!("Playback exited with {}", status),
                    Err(e) => tracing::warn!("Failed to wait for playback: {}", e),
                },
                _ = cancel_rx => {
                    let _ = child.kill().await;
                }
            }
        });

        self.cancel = Some(cancel_tx);
        tracing::debug!("Playing {:?}", source);
        Ok(())
    }

    fn stop(&mut self) -> DeviceResult<()> {
        // Dropping the sender wakes the watcher, which kills the process
        self.cancel.take();
        Ok(())
    }
}
