//! Error types for hitmix-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for hitmix-player
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audio decoding or resampling errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Invalid caller input (rates, offsets, volumes)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Sound content could not be located
    #[error("Sound not found: {0}")]
    SoundNotFound(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Chart (JSON) parsing errors
    #[error("Chart parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors from the shared hitmix-common crate
    #[error(transparent)]
    Common(#[from] hitmix_common::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using hitmix-player Error
pub type Result<T> = std::result::Result<T, Error>;
