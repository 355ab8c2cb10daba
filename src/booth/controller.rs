//! Booth controller
//!
//! Owns the session state and drives the timers, the file staging and the
//! capture/playback collaborators. All events arrive through one queue and
//! are handled one at a time; nothing here is shared across threads.

use crate::booth::events::{BoothEvent, Flow};
use crate::booth::input::{dispatch, BoothInput};
use crate::booth::state::{BoothConfig, SessionState, StatusStyle, View};
use crate::capture::{Camera, DeviceResult, Player, Recorder};
use crate::staging::Staging;
use crate::timer::{Tick, TimerKind, TimerService};
use crate::ui::Presenter;
use crate::utils::AppResult;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

const IDLE_TEXT: &str = "Press SPACE to start";
const REVIEW_TEXT: &str = "Review. ENTER: accept | ESC: reject";
const SAVING_TEXT: &str = "Saving... Please wait.";

/// Render a second count as `mm:ss`
pub fn format_elapsed(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn recording_text(secs: u32) -> String {
    format!("RECORDING: {} (SPACE to stop)", format_elapsed(secs))
}

fn warning_text(remaining: u32) -> String {
    format!("Time is up! Reset in {}s. Press 'A' to keep.", remaining)
}

fn log_device(action: &str, result: DeviceResult<()>) {
    if let Err(e) = result {
        tracing::warn!("{} failed: {}", action, e);
    }
}

/// Everything the booth commands but does not own the logic of
pub struct Collaborators {
    pub camera: Box<dyn Camera>,
    pub recorder: Box<dyn Recorder>,
    pub player: Box<dyn Player>,
    pub presenter: Box<dyn Presenter>,
}

/// The booth state machine
pub struct Booth {
    config: BoothConfig,
    state: SessionState,

    /// Seconds recorded in the current cycle
    elapsed_secs: u32,

    /// Seconds left before a timed-out recording is dropped
    warning_remaining: u32,

    /// Stop was pressed; waiting out the grace delay before review
    finalizing: bool,

    /// Log correlation id of the current recording cycle
    cycle_id: Option<Uuid>,

    timers: TimerService,
    staging: Staging,
    camera: Box<dyn Camera>,
    recorder: Box<dyn Recorder>,
    player: Box<dyn Player>,
    presenter: Box<dyn Presenter>,
}

impl Booth {
    /// Create a booth; timer ticks are posted to `events`
    pub fn new(
        config: BoothConfig,
        staging: Staging,
        collaborators: Collaborators,
        events: UnboundedSender<BoothEvent>,
    ) -> Self {
        Self {
            config,
            state: SessionState::Idle,
            elapsed_secs: 0,
            warning_remaining: 0,
            finalizing: false,
            cycle_id: None,
            timers: TimerService::new(events),
            staging,
            camera: collaborators.camera,
            recorder: collaborators.recorder,
            player: collaborators.player,
            presenter: collaborators.presenter,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    pub fn warning_remaining(&self) -> u32 {
        self.warning_remaining
    }

    pub fn is_finalizing(&self) -> bool {
        self.finalizing
    }

    pub fn is_timer_running(&self, kind: TimerKind) -> bool {
        self.timers.is_running(kind)
    }

    /// Prepare the recordings directory and show the idle screen
    ///
    /// Staged files left behind by an earlier run are discarded here.
    pub fn start(&mut self) -> AppResult<()> {
        self.staging.ensure_dir()?;
        tracing::info!("Booth ready, recordings in {:?}", self.staging.dir());
        self.enter_idle();
        Ok(())
    }

    /// Consume events until an exit is requested
    pub async fn run(mut self, mut events: UnboundedReceiver<BoothEvent>) {
        while let Some(event) = events.recv().await {
            if self.handle(event) == Flow::Exit {
                break;
            }
        }
        tracing::info!("Booth event loop finished");
    }

    /// Handle one event
    pub fn handle(&mut self, event: BoothEvent) -> Flow {
        match event {
            BoothEvent::Key(press) => {
                match dispatch(self.state, &press, &self.config.exit_combo) {
                    Some(input) => return self.on_input(input),
                    None => tracing::trace!("Ignoring {:?} in {:?}", press.key, self.state),
                }
            }
            BoothEvent::Tick(tick) => self.on_tick(tick),
            BoothEvent::PlaybackFinished => {
                if self.state == SessionState::Review {
                    // Loop the clip until the visitor decides
                    log_device("Restart playback", self.player.play());
                }
            }
            BoothEvent::Shutdown => {
                tracing::info!("Shutdown requested");
                self.shutdown();
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    fn on_input(&mut self, input: BoothInput) -> Flow {
        match input {
            BoothInput::Exit => {
                tracing::info!("Operator exit");
                self.shutdown();
                return Flow::Exit;
            }
            BoothInput::Start => self.start_recording(),
            BoothInput::Stop => self.stop_recording(),
            BoothInput::Keep => self.keep_recording(),
            BoothInput::Accept => self.accept_recording(),
            BoothInput::Reject => {
                tracing::info!(cycle = ?self.cycle_id, "Recording rejected");
                self.enter_idle();
            }
        }
        Flow::Continue
    }

    fn on_tick(&mut self, tick: Tick) {
        if !self.timers.is_current(&tick) {
            tracing::trace!("Dropping stale {:?}", tick);
            return;
        }

        match (self.state, tick.kind) {
            (SessionState::Recording, TimerKind::Elapsed) if !self.finalizing => {
                self.on_elapsed_tick()
            }
            (SessionState::Recording, TimerKind::Grace) if self.finalizing => {
                self.timers.complete_once(&tick);
                self.finalizing = false;
                self.enter_review();
            }
            (SessionState::TimeoutWarning, TimerKind::Warning) => self.on_warning_tick(),
            (state, kind) => tracing::trace!("Ignoring {:?} tick in {:?}", kind, state),
        }
    }

    fn start_recording(&mut self) {
        if self.state != SessionState::Idle {
            return;
        }

        let cycle_id = Uuid::new_v4();
        tracing::info!(cycle = %cycle_id, "Recording started");

        self.state = SessionState::Recording;
        self.cycle_id = Some(cycle_id);
        self.finalizing = false;

        let path = self.staging.arm();
        self.recorder.set_output_location(&path);
        log_device("Start recorder", self.recorder.record());

        self.elapsed_secs = 0;
        self.timers.start(TimerKind::Elapsed, self.config.tick_interval);

        self.presenter.set_status_text(&recording_text(0));
        self.presenter.set_status_style(StatusStyle::Recording);
    }

    fn stop_recording(&mut self) {
        if self.state != SessionState::Recording || self.finalizing {
            return;
        }

        tracing::info!(cycle = ?self.cycle_id, "Recording stopped after {}s", self.elapsed_secs);
        log_device("Stop recorder", self.recorder.stop());
        self.timers.stop(TimerKind::Elapsed);

        // The recorder may still be closing the file
        self.finalizing = true;
        self.timers.start_once(TimerKind::Grace, self.config.grace_delay);
    }

    fn on_elapsed_tick(&mut self) {
        self.elapsed_secs += 1;
        self.presenter.set_status_text(&recording_text(self.elapsed_secs));

        if self.elapsed_secs >= self.config.max_recording_secs {
            self.trigger_timeout_warning();
        }
    }

    fn trigger_timeout_warning(&mut self) {
        tracing::warn!(
            cycle = ?self.cycle_id,
            "Recording limit of {}s reached",
            self.config.max_recording_secs
        );

        self.state = SessionState::TimeoutWarning;
        log_device("Stop recorder", self.recorder.stop());
        self.timers.stop(TimerKind::Elapsed);

        self.warning_remaining = self.config.warning_secs;
        self.timers.start(TimerKind::Warning, self.config.tick_interval);
        self.show_warning();
    }

    fn on_warning_tick(&mut self) {
        self.warning_remaining = self.warning_remaining.saturating_sub(1);
        self.show_warning();

        if self.warning_remaining == 0 {
            tracing::info!(cycle = ?self.cycle_id, "Timed-out recording dropped");
            self.timers.stop(TimerKind::Warning);
            self.enter_idle();
        }
    }

    fn show_warning(&mut self) {
        self.presenter.set_status_text(&warning_text(self.warning_remaining));
        self.presenter.set_status_style(StatusStyle::Warning);
    }

    fn keep_recording(&mut self) {
        if self.state != SessionState::TimeoutWarning {
            return;
        }

        tracing::info!(cycle = ?self.cycle_id, "Timed-out recording kept");
        self.timers.stop(TimerKind::Warning);
        self.presenter.set_status_style(StatusStyle::Normal);
        self.enter_review();
    }

    fn enter_review(&mut self) {
        self.state = SessionState::Review;
        self.presenter.switch_view(View::Playback);
        log_device("Stop camera", self.camera.stop());

        match self.staging.find_staged() {
            Some(staged) => {
                tracing::debug!("Reviewing {:?}", staged);
                self.player.set_source(Some(staged));
                log_device("Start playback", self.player.play());
            }
            None => tracing::warn!(cycle = ?self.cycle_id, "No staged recording to review"),
        }

        self.presenter.set_status_text(REVIEW_TEXT);
        self.presenter.set_status_style(StatusStyle::Normal);
    }

    fn accept_recording(&mut self) {
        if self.state != SessionState::Review {
            return;
        }

        log_device("Stop playback", self.player.stop());

        match self.staging.find_staged() {
            Some(staged) => {
                // Transcoding blocks the booth; tell the visitor first
                self.presenter.set_status_text(SAVING_TEXT);
                match self.staging.promote(&staged) {
                    Ok(output) => {
                        tracing::info!(cycle = ?self.cycle_id, "Saved recording to {:?}", output)
                    }
                    Err(e) => {
                        tracing::error!(cycle = ?self.cycle_id, "Failed to save recording: {}", e)
                    }
                }
            }
            None => {
                tracing::warn!(cycle = ?self.cycle_id, "Accepted, but no staged recording found")
            }
        }

        self.enter_idle();
    }

    fn enter_idle(&mut self) {
        log_device("Stop playback", self.player.stop());
        self.player.set_source(None);

        self.state = SessionState::Idle;
        self.timers.stop_all();
        self.finalizing = false;
        self.elapsed_secs = 0;
        self.warning_remaining = 0;
        self.cycle_id = None;

        self.staging.discard_staged();

        self.presenter.switch_view(View::Camera);
        log_device("Start camera", self.camera.start());
        self.presenter.set_status_text(IDLE_TEXT);
        self.presenter.set_status_style(StatusStyle::Normal);
    }

    fn shutdown(&mut self) {
        self.timers.stop_all();
        if self.recorder.is_recording() {
            log_device("Stop recorder", self.recorder.stop());
        }
        log_device("Stop playback", self.player.stop());
        log_device("Stop camera", self.camera.stop());
    }
}
