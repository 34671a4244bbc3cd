//! Intake Core Library
//!
//! This crate provides the domain model, error types, known-extension table and
//! configuration shared by the Intake upload crates.

pub mod config;
pub mod error;
pub mod mime_types;
pub mod models;

// Re-export commonly used types
pub use config::IntakeConfig;
pub use error::{LogLevel, StateError, ValidationError};
pub use mime_types::ExtensionTable;
pub use models::{
    DescriptorBatch, FileRecord, FileStatus, RawDescriptor, StagedUpload, TransportStatus,
    UploadField,
};
