//! Capture and playback collaborator traits
//!
//! The booth only issues commands to these; rendering frames and talking to
//! camera hardware is the implementation's business.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Collaborator failures
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No output location set")]
    NoOutputLocation,
}

pub type DeviceResult<T> = Result<T, DeviceError>;

/// Live camera preview
pub trait Camera: Send {
    fn start(&mut self) -> DeviceResult<()>;
    fn stop(&mut self) -> DeviceResult<()>;
}

/// Records the camera into a file
pub trait Recorder: Send {
    fn set_output_location(&mut self, path: &Path);
    fn record(&mut self) -> DeviceResult<()>;
    /// Stop recording; the file may still be flushing when this returns
    fn stop(&mut self) -> DeviceResult<()>;
    fn is_recording(&self) -> bool;
}

/// Plays back a recorded clip
///
/// Implementations report end-of-media through the booth event queue.
pub trait Player: Send {
    fn set_source(&mut self, source: Option<PathBuf>);
    fn play(&mut self) -> DeviceResult<()>;
    fn stop(&mut self) -> DeviceResult<()>;
}
