//! Destination filename derivation.
//!
//! Generated names have the form `{sha1_hex}{unix_timestamp}[.{ext}]`, where the
//! digest covers a random number, the destination and a per-call unique token.
//! They avoid collisions; they are not meant to be unguessable.

use intake_core::ExtensionTable;
use rand::Rng;
use sha1::{Digest, Sha1};
use std::path::Path;
use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

const MAX_FILENAME_LEN: usize = 255;

/// Generate a collision-resistant filename for a file stored under `destination`.
///
/// The original extension is kept (lowercased) only when it appears in `extensions`.
pub fn generate_filename(
    original_name: &str,
    destination: &Path,
    extensions: &ExtensionTable,
) -> String {
    let salt: u32 = rand::rng().random_range(1..=9999);
    let unique_id = Uuid::new_v4().simple().to_string();

    let mut hasher = Sha1::new();
    hasher.update(salt.to_string().as_bytes());
    hasher.update(destination.to_string_lossy().as_bytes());
    hasher.update(unique_id.as_bytes());
    let digest = hex::encode(hasher.finalize());

    let stem = format!("{}{}", digest, chrono::Utc::now().timestamp());
    match original_extension(original_name, extensions) {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}

/// Lowercased extension of `name` if it is a known extension.
pub fn original_extension(name: &str, extensions: &ExtensionTable) -> Option<String> {
    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())?;

    extensions.contains(&extension).then_some(extension)
}

/// Reduce a caller-supplied filename to a safe single path component.
pub fn sanitize_filename(filename: &str) -> StorageResult<String> {
    let base = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);

    if base.contains("..") {
        return Err(StorageError::InvalidFilename(filename.to_string()));
    }

    let sanitized: String = base
        .chars()
        .take(MAX_FILENAME_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim_matches(|c| c == '.' || c == '_').is_empty() {
        return Err(StorageError::InvalidFilename(filename.to_string()));
    }

    Ok(sanitized)
}
