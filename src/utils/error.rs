//! Error types and handling
//!
//! Application-level error type used at startup and by the event loop.
//! Component errors (staging, transcoding, devices) are defined next to
//! their components and folded in here.

use crate::capture::DeviceError;
use crate::staging::StagingError;
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Staging error: {0}")]
    Staging(#[from] StagingError),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Terminal error: {0}")]
    Terminal(String),
}

impl AppError {
    /// Short machine-readable code, used in log fields
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Staging(_) => "STAGING_ERROR",
            AppError::Device(_) => "DEVICE_ERROR",
            AppError::Terminal(_) => "TERMINAL_ERROR",
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
