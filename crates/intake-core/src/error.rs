//! Error types module
//!
//! Validation errors are the recoverable, user-facing tier: they are collected
//! by an upload session and reported back to the caller. They never abort the
//! batch. Fatal conditions live with the session in `intake-processing`.

use crate::models::TransportStatus;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// A recoverable validation failure for one upload batch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please select a file.")]
    NoFileSelected,

    #[error("Upload of {name} was interrupted: {status}")]
    Transport {
        name: String,
        status: TransportStatus,
    },

    #[error("File {name} is too big ({size_mb} MB, limit {max_mb} MB).")]
    FileTooLarge {
        name: String,
        size_mb: f64,
        max_mb: f64,
    },

    #[error("Mime type not allowed: {name} was detected as '{mime}'.")]
    MimeNotAllowed { name: String, mime: String },

    #[error("Staged file for {name} could not be read.")]
    Unreadable { name: String },

    #[error("{0}")]
    Custom(String),
}

impl ValidationError {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::NoFileSelected => "NO_FILE_SELECTED",
            ValidationError::Transport { .. } => "TRANSPORT_ERROR",
            ValidationError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            ValidationError::MimeNotAllowed { .. } => "MIME_NOT_ALLOWED",
            ValidationError::Unreadable { .. } => "FILE_UNREADABLE",
            ValidationError::Custom(_) => "VALIDATION_FAILED",
        }
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            ValidationError::Unreadable { .. } => LogLevel::Warn,
            ValidationError::Transport { status, .. } if status.is_server_side() => LogLevel::Error,
            _ => LogLevel::Debug,
        }
    }
}

/// Illegal state transition on a [`FileRecord`](crate::FileRecord).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("Record {name} has no assigned filename")]
    FilenameUnassigned { name: String },

    #[error("Record {name} is already {status}")]
    AlreadyTerminal { name: String, status: String },
}
