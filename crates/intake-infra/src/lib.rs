//! Intake Infrastructure Library
//!
//! Process-level setup shared by applications embedding Intake.

pub mod telemetry;

pub use telemetry::{init_telemetry, TelemetryFormat};
