//! Intake Storage Library
//!
//! This crate places validated uploads on the local filesystem. It resolves
//! destination directories under a root, generates collision-resistant
//! filenames and moves staged files into place.
//!
//! # Path layout
//!
//! - **Destination directory**: `{root}/{destination}/`, always with a trailing separator
//! - **Stored file**: `{root}/{destination}/{filename}`
//!
//! Destinations must be relative and must not contain `..`, so every stored file
//! stays under the root.

pub mod destination;
pub mod filename;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use destination::{resolve_directory, DestinationResolver};
pub use filename::{generate_filename, original_extension, sanitize_filename};
pub use local::LocalMover;
pub use traits::{FileMover, StorageError, StorageResult};
