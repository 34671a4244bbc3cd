use std::fs;
use std::path::Path;

use crate::traits::{FileMover, StorageError, StorageResult};

/// Local filesystem move primitive.
///
/// Renames when source and target share a filesystem and falls back to
/// copy + remove otherwise (staging directories often live on tmpfs).
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalMover;

impl LocalMover {
    pub fn new() -> Self {
        LocalMover
    }

    fn copy_then_remove(from: &Path, to: &Path) -> StorageResult<u64> {
        let target_existed = to.exists();
        let bytes = fs::copy(from, to).map_err(|e| {
            // A failed copy may already have created a truncated target
            if !target_existed {
                let _ = fs::remove_file(to);
            }
            StorageError::MoveFailed(format!(
                "Failed to copy {} to {}: {}",
                from.display(),
                to.display(),
                e
            ))
        })?;

        if let Err(e) = fs::remove_file(from) {
            // Keep the source authoritative when it cannot be released
            let _ = fs::remove_file(to);
            return Err(StorageError::MoveFailed(format!(
                "Failed to remove staged file {}: {}",
                from.display(),
                e
            )));
        }

        Ok(bytes)
    }
}

impl FileMover for LocalMover {
    fn move_file(&self, from: &Path, to: &Path) -> StorageResult<()> {
        if !from.is_file() {
            return Err(StorageError::NotFound(from.display().to_string()));
        }

        let start = std::time::Instant::now();

        match fs::rename(from, to) {
            Ok(()) => {}
            Err(rename_err) => {
                tracing::debug!(
                    from = %from.display(),
                    to = %to.display(),
                    error = %rename_err,
                    "Rename failed, falling back to copy"
                );
                Self::copy_then_remove(from, to)?;
            }
        }

        tracing::info!(
            from = %from.display(),
            to = %to.display(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local move successful"
        );

        Ok(())
    }
}
