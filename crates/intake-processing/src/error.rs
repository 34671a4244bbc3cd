//! Fatal upload errors.
//!
//! These terminate the current operation (session construction or save). They
//! are never collected into the session's validation errors.

use intake_core::{LogLevel, StateError};
use intake_storage::StorageError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Can't create destination {}", .0.display())]
    DestinationUnavailable(PathBuf),

    #[error("Can't upload file {name}: {source}")]
    MoveFailed {
        name: String,
        #[source]
        source: StorageError,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Upload has not passed validation")]
    NotValidated,

    #[error("Upload session already finished")]
    AlreadyFinished,

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Filename {0} is assigned to more than one file")]
    DuplicateFilename(String),

    #[error("A file named {0} already exists in the destination")]
    FilenameTaken(String),

    #[error("No file at index {0}")]
    NoSuchRecord(usize),

    #[error(transparent)]
    State(#[from] StateError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl UploadError {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            UploadError::DestinationUnavailable(_) => "DESTINATION_UNAVAILABLE",
            UploadError::MoveFailed { .. } => "MOVE_FAILED",
            UploadError::InvalidConfig(_) => "INVALID_CONFIG",
            UploadError::NotValidated => "NOT_VALIDATED",
            UploadError::AlreadyFinished => "ALREADY_FINISHED",
            UploadError::InvalidFilename(_) => "INVALID_FILENAME",
            UploadError::DuplicateFilename(_) => "DUPLICATE_FILENAME",
            UploadError::FilenameTaken(_) => "FILENAME_TAKEN",
            UploadError::NoSuchRecord(_) => "NO_SUCH_RECORD",
            UploadError::State(_) => "INVALID_STATE",
            UploadError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Whether the caller can fix the input and try again on the same session
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            UploadError::InvalidFilename(_)
                | UploadError::DuplicateFilename(_)
                | UploadError::FilenameTaken(_)
                | UploadError::NoSuchRecord(_)
                | UploadError::InvalidConfig(_)
        )
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            UploadError::DestinationUnavailable(_)
            | UploadError::MoveFailed { .. }
            | UploadError::Storage(_) => LogLevel::Error,
            UploadError::State(_) | UploadError::AlreadyFinished | UploadError::NotValidated => {
                LogLevel::Warn
            }
            _ => LogLevel::Debug,
        }
    }
}
