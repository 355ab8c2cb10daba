//! Camera, recorder and player collaborators
//!
//! The booth talks to these through the traits in [`traits`]; the `ffmpeg`
//! module provides the process-backed implementations used by the binary.

pub mod ffmpeg;
pub mod traits;

pub use ffmpeg::{CaptureInput, FfmpegRecorder, FfplayCamera, FfplayPlayer};
pub use traits::{Camera, DeviceError, DeviceResult, Player, Recorder};
