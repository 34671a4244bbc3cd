//! Test helpers: staging and destination directories for upload sessions.

#![allow(dead_code)]

use intake_core::RawDescriptor;
use intake_infra::{init_telemetry, TelemetryFormat};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

pub const MB: usize = 1_048_576;

/// A web root and a separate staging directory standing in for the server's
/// temporary upload directory.
pub struct Fixture {
    pub root: TempDir,
    pub staging: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        init_telemetry(TelemetryFormat::from_features());
        Self {
            root: tempdir().unwrap(),
            staging: tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Write `data` to a staged temp file and describe it as the request layer would.
    pub fn stage(&self, name: &str, declared_type: &str, data: &[u8]) -> RawDescriptor {
        let tmp = self.staging.path().join(format!("upl_{}", staged_suffix(name)));
        fs::write(&tmp, data).unwrap();
        RawDescriptor::new(name, declared_type, tmp.to_string_lossy(), data.len() as u64)
    }

    pub fn files_in(&self, dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        files.sort();
        files
    }
}

fn staged_suffix(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Smallest byte sequence the content sniffer recognises as PNG.
pub fn create_minimal_png() -> Vec<u8> {
    let mut data = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend_from_slice(&[0u8; 24]);
    data
}
