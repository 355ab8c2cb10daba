//! Video Booth - a kiosk for recording short video messages.
//!
//! Visitors start and stop a recording with the space bar, review it in a
//! loop, then keep or discard it. Accepted clips are transcoded into the
//! recordings directory.

pub mod booth;
pub mod capture;
pub mod staging;
pub mod timer;
pub mod ui;
pub mod utils;

use booth::{Booth, BoothConfig, BoothEvent, Collaborators, PresenterKind};
use capture::{CaptureInput, FfmpegRecorder, FfplayCamera, FfplayPlayer};
use staging::{FfmpegTranscoder, Staging};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ui::{ConsolePresenter, JsonPresenter, Presenter, TerminalGuard};
use utils::{AppError, AppResult};

/// Run the booth until the operator exits
pub fn run() -> AppResult<()> {
    let config = BoothConfig::from_env()?;
    init_logging(&config)?;

    tracing::info!("Starting Video Booth v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Configuration: {}", serde_json::to_string(&config)?);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(serve(config))
}

/// Logs go to `BOOTH_LOG_FILE` when set, otherwise to stderr
///
/// stdout belongs to the status line. In raw mode stderr on the same
/// terminal would garble it, so kiosks should set a log file or redirect
/// stderr.
fn init_logging(config: &BoothConfig) -> AppResult<()> {
    let (writer, ansi) = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "video_booth=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(ansi),
        )
        .init();

    Ok(())
}

async fn serve(mut config: BoothConfig) -> AppResult<()> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

    let terminal = TerminalGuard::enter()?;
    if !terminal.keyboard_enhanced() {
        tracing::warn!("Exit combination falls back to its Ctrl-only form");
    }
    config.exit_combo = terminal.reachable_combo(config.exit_combo);

    let input = CaptureInput {
        format: config.capture_format.clone(),
        device: config.capture_device.clone(),
    };
    let staging = Staging::new(
        &config.recordings_dir,
        config.output_format,
        Box::new(FfmpegTranscoder::new(&config.encoder, config.output_format)),
    );

    let presenter: Box<dyn Presenter> = match config.presenter {
        PresenterKind::Console => Box::new(ConsolePresenter::new(std::io::stdout())),
        PresenterKind::Json => Box::new(JsonPresenter::new(std::io::stdout())),
    };

    let collaborators = Collaborators {
        camera: Box::new(FfplayCamera::new("ffplay", input.clone())),
        recorder: Box::new(FfmpegRecorder::new(&config.encoder, input)),
        player: Box::new(FfplayPlayer::new("ffplay", tx.clone())),
        presenter,
    };

    ui::spawn_key_reader(tx.clone())
        .map_err(|e| AppError::Terminal(format!("Failed to start key reader: {}", e)))?;

    let signal_tx = tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received");
            let _ = signal_tx.send(BoothEvent::Shutdown);
        }
    });

    let mut booth = Booth::new(config, staging, collaborators, tx);
    if let Err(e) = booth.start() {
        tracing::error!(code = e.code(), "Booth failed to start: {}", e);
        return Err(e);
    }
    booth.run(rx).await;

    tracing::info!("Video Booth stopped");
    Ok(())
}
