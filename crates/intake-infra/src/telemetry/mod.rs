//! Tracing initialization
//!
//! Installs a `tracing-subscriber` registry with an environment filter
//! (`RUST_LOG`, default `intake=debug`) and a human-readable or JSON fmt layer.

mod init_basic;

pub use init_basic::{init_telemetry, TelemetryFormat};
