//! Error types for ofxio.

use thiserror::Error;

/// Main error type for reader/writer operations.
#[derive(Error, Debug)]
pub enum OfxIoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The sequence time fell outside the frame range and the policy is `Error`.
    #[error("Out of frame range")]
    OutOfRange,

    /// No file could be found for the frame within the search window.
    #[error("Cannot load frame {frame}: {filename}")]
    MissingFrame { frame: i64, filename: String },

    /// Host or decoder handed over data that does not match the contract.
    #[error("Format mismatch: {0}")]
    FormatMismatch(String),

    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    /// Invalid user configuration detected before any decode/encode.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Decoder error: {0}")]
    Decoder(String),

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("Color error: {0}")]
    Color(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// Cooperative abort requested by the host. Not reported to the user.
    #[error("Render aborted")]
    Aborted,
}

impl OfxIoError {
    /// Whether this error should be attached to the instance as a message.
    ///
    /// Cancellation is a clean early return, not a failure.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, Self::Aborted)
    }
}

/// Result type alias for ofxio operations.
pub type Result<T> = std::result::Result<T, OfxIoError>;
