//! Storage abstraction trait
//!
//! This module defines the move primitive that places staged files.

use std::path::Path;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Move failed: {0}")]
    MoveFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Moves a staged file to its final location.
///
/// Implementations must leave the source in place when they fail, so a caller
/// can still roll back or retry.
pub trait FileMover: Send + Sync {
    fn move_file(&self, from: &Path, to: &Path) -> StorageResult<()>;
}
