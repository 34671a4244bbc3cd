//! Upload processing: ingest → probe → validate → save.
//!
//! An [`UploadSession`] takes the raw descriptors of one request, measures and
//! probes every staged file, runs the [`ValidationPipeline`] over the batch and,
//! only when no check reported an error, moves every file into its destination.

pub mod error;
pub mod pipeline;
pub mod probe;
pub mod session;

pub use error::UploadError;
pub use pipeline::{FnCheck, MimeCheck, SizeCheck, UploadCheck, ValidationPipeline};
pub use probe::{ContentSniffer, MimeProbe};
pub use session::{SessionStatus, UploadReport, UploadSession};
