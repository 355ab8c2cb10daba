//! Test doubles for driving the booth without devices

use crate::booth::controller::{Booth, Collaborators};
use crate::booth::events::{BoothEvent, Flow};
use crate::booth::input::{Key, KeyPress};
use crate::booth::state::{BoothConfig, StatusStyle, View};
use crate::capture::{Camera, DeviceResult, Player, Recorder};
use crate::staging::{OutputFormat, Staging, TranscodeError, Transcoder};
use crate::ui::Presenter;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Upper bound for `pump_until`, well above any scenario here
const MAX_PUMPED_EVENTS: usize = 2_000;

type CallLog = Arc<Mutex<Vec<String>>>;

/// Sorted file names in a recordings directory
pub fn list_recordings(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

struct MockCamera {
    log: CallLog,
}

impl Camera for MockCamera {
    fn start(&mut self) -> DeviceResult<()> {
        self.log.lock().push("camera.start".to_string());
        Ok(())
    }

    fn stop(&mut self) -> DeviceResult<()> {
        self.log.lock().push("camera.stop".to_string());
        Ok(())
    }
}

/// Writes the output file as soon as recording starts
struct MockRecorder {
    log: CallLog,
    writes: Arc<Mutex<bool>>,
    output: Option<PathBuf>,
    recording: bool,
}

impl Recorder for MockRecorder {
    fn set_output_location(&mut self, path: &Path) {
        self.output = Some(path.to_path_buf());
    }

    fn record(&mut self) -> DeviceResult<()> {
        self.log.lock().push("recorder.record".to_string());
        if *self.writes.lock() {
            if let Some(output) = &self.output {
                fs::write(output, b"frames")?;
            }
        }
        self.recording = true;
        Ok(())
    }

    fn stop(&mut self) -> DeviceResult<()> {
        self.log.lock().push("recorder.stop".to_string());
        self.recording = false;
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.recording
    }
}

struct MockPlayer {
    log: CallLog,
}

impl Player for MockPlayer {
    fn set_source(&mut self, source: Option<PathBuf>) {
        let name = source
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "none".to_string());
        self.log.lock().push(format!("player.set_source({})", name));
    }

    fn play(&mut self) -> DeviceResult<()> {
        self.log.lock().push("player.play".to_string());
        Ok(())
    }

    fn stop(&mut self) -> DeviceResult<()> {
        self.log.lock().push("player.stop".to_string());
        Ok(())
    }
}

/// What the status line currently shows
#[derive(Debug, Clone)]
pub struct UiSnapshot {
    pub text: String,
    pub style: StatusStyle,
    pub view: Option<View>,
    pub history: Vec<String>,
}

struct MockPresenter {
    ui: Arc<Mutex<UiSnapshot>>,
}

impl Presenter for MockPresenter {
    fn set_status_text(&mut self, text: &str) {
        let mut ui = self.ui.lock();
        ui.text = text.to_string();
        ui.history.push(text.to_string());
    }

    fn set_status_style(&mut self, style: StatusStyle) {
        self.ui.lock().style = style;
    }

    fn switch_view(&mut self, view: View) {
        self.ui.lock().view = Some(view);
    }
}

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
            stderr: "Unknown encoder".to_string(),
        })
    }
}

/// A booth wired to mocks and a temporary recordings directory
pub struct Harness {
    pub booth: Booth,
    tx: UnboundedSender<BoothEvent>,
    rx: UnboundedReceiver<BoothEvent>,
    log: CallLog,
    ui: Arc<Mutex<UiSnapshot>>,
    recorder_writes: Arc<Mutex<bool>>,
    dir: TempDir,
}

impl Harness {
    /// Started booth, sitting in Idle
    pub fn new(config: BoothConfig) -> Self {
        let mut harness = Self::build(config, Box::new(CopyTranscoder));
        harness.booth.start().expect("booth start");
        harness
    }

    /// Started booth whose transcodes always fail
    pub fn with_failing_transcoder(config: BoothConfig) -> Self {
        let mut harness = Self::build(config, Box::new(FailingTranscoder));
        harness.booth.start().expect("booth start");
        harness
    }

    /// Booth that has not run its startup actions yet
    pub fn unstarted(config: BoothConfig) -> Self {
        Self::build(config, Box::new(CopyTranscoder))
    }

    fn build(mut config: BoothConfig, transcoder: Box<dyn Transcoder>) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        config.recordings_dir = dir.path().to_path_buf();

        let (tx, rx) = mpsc::unbounded_channel();
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let ui = Arc::new(Mutex::new(UiSnapshot {
            text: String::new(),
            style: StatusStyle::Normal,
            view: None,
            history: Vec::new(),
        }));
        let recorder_writes = Arc::new(Mutex::new(true));

        let staging = Staging::new(&config.recordings_dir, OutputFormat::Mp4, transcoder);
        let collaborators = Collaborators {
            camera: Box::new(MockCamera { log: log.clone() }),
            recorder: Box::new(MockRecorder {
                log: log.clone(),
                writes: recorder_writes.clone(),
                output: None,
                recording: false,
            }),
            player: Box::new(MockPlayer { log: log.clone() }),
            presenter: Box::new(MockPresenter { ui: ui.clone() }),
        };

        let booth = Booth::new(config, staging, collaborators, tx.clone());

        Self {
            booth,
            tx,
            rx,
            log,
            ui,
            recorder_writes,
            dir,
        }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn ui(&self) -> UiSnapshot {
        self.ui.lock().clone()
    }

    /// Make the recorder produce no file, as if the device failed silently
    pub fn set_recorder_writes(&mut self, writes: bool) {
        *self.recorder_writes.lock() = writes;
    }

    pub fn press(&mut self, key: Key) -> Flow {
        self.booth.handle(BoothEvent::Key(KeyPress::plain(key)))
    }

    /// Wait for the next queued event and handle it
    pub async fn pump(&mut self) -> Flow {
        let event = self.rx.recv().await.expect("event queue closed");
        self.booth.handle(event)
    }

    /// Pump events until `done` holds
    pub async fn pump_until<F>(&mut self, done: F)
    where
        F: Fn(&Booth) -> bool,
    {
        for _ in 0..MAX_PUMPED_EVENTS {
            if done(&self.booth) {
                return;
            }
            self.pump().await;
        }
        panic!("condition not reached after {} events", MAX_PUMPED_EVENTS);
    }

    /// Handle everything already queued without waiting
    pub fn drain(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.booth.handle(event);
        }
    }

    /// Take the booth and its queue to run the real event loop
    pub fn into_parts(
        self,
    ) -> (
        Booth,
        UnboundedSender<BoothEvent>,
        UnboundedReceiver<BoothEvent>,
        TempDir,
    ) {
        (self.booth, self.tx, self.rx, self.dir)
    }
}
