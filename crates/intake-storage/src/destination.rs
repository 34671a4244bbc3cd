use intake_core::ExtensionTable;
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR_STR};

use crate::traits::{StorageError, StorageResult};

const DEFAULT_DIR_PERMISSIONS: u32 = 0o750;

/// Join `relative` under `root`, with a trailing separator.
///
/// Does not touch the filesystem. Absolute destinations and `..` components
/// are rejected so the result cannot escape the root.
pub fn resolve_directory(root: &Path, relative: &str) -> StorageResult<PathBuf> {
    let relative_path = Path::new(relative);
    for component in relative_path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => {
                return Err(StorageError::InvalidPath(format!(
                    "Destination '{}' contains a parent directory reference",
                    relative
                )))
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(StorageError::InvalidPath(format!(
                    "Destination '{}' must be relative to the root",
                    relative
                )))
            }
        }
    }

    Ok(with_trailing_separator(root.join(relative_path)))
}

fn with_trailing_separator(path: PathBuf) -> PathBuf {
    let mut raw: OsString = path.into_os_string();
    if !raw.to_string_lossy().ends_with(MAIN_SEPARATOR_STR) {
        raw.push(MAIN_SEPARATOR_STR);
    }
    PathBuf::from(raw)
}

/// Resolves and prepares destination directories under a root.
#[derive(Clone, Debug)]
pub struct DestinationResolver {
    root: PathBuf,
    permissions: u32,
    extensions: ExtensionTable,
}

impl DestinationResolver {
    /// Create a resolver for `root` with `0750` directory permissions and the
    /// default extension table.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            permissions: DEFAULT_DIR_PERMISSIONS,
            extensions: ExtensionTable::default(),
        }
    }

    pub fn with_permissions(mut self, mode: u32) -> Self {
        self.permissions = mode;
        self
    }

    pub fn with_extensions(mut self, extensions: ExtensionTable) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn permissions(&self) -> u32 {
        self.permissions
    }

    pub fn extensions(&self) -> &ExtensionTable {
        &self.extensions
    }

    pub fn resolve_directory(&self, relative: &str) -> StorageResult<PathBuf> {
        resolve_directory(&self.root, relative)
    }

    /// Make sure `path` exists and is writable, creating it if needed.
    pub fn ensure_directory(&self, path: &Path) -> bool {
        if is_writable(path) {
            return true;
        }

        match create_dir_all(path, self.permissions) {
            // An existing read-only directory also lands here
            Ok(()) if !is_writable(path) => {
                tracing::warn!(
                    path = %path.display(),
                    "Destination directory is not writable"
                );
                false
            }
            Ok(()) => {
                tracing::info!(
                    path = %path.display(),
                    mode = %format_args!("{:o}", self.permissions),
                    "Created destination directory"
                );
                true
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to create destination directory"
                );
                false
            }
        }
    }

    /// Path of `filename` inside a resolved directory.
    pub fn full_path(&self, directory: &Path, filename: &str) -> PathBuf {
        directory.join(filename)
    }
}

fn is_writable(path: &Path) -> bool {
    path.is_dir() && tempfile::tempfile_in(path).is_ok()
}

#[cfg(unix)]
fn create_dir_all(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(mode).create(path)
}

#[cfg(not(unix))]
fn create_dir_all(path: &Path, _mode: u32) -> std::io::Result<()> {
    fs::DirBuilder::new().recursive(true).create(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_directory_appends_separator() {
        let dir = resolve_directory(Path::new("/srv/www"), "uploads/images").unwrap();
        assert_eq!(
            dir.to_string_lossy(),
            format!("/srv/www/uploads/images{}", MAIN_SEPARATOR_STR)
        );

        // Already terminated destinations are not doubled
        let dir = resolve_directory(Path::new("/srv/www"), "uploads/").unwrap();
        assert!(dir.to_string_lossy().ends_with("uploads/"));
        assert!(!dir.to_string_lossy().ends_with("//"));
    }

    #[test]
    fn test_resolve_directory_rejects_escapes() {
        assert!(matches!(
            resolve_directory(Path::new("/srv/www"), "../etc"),
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            resolve_directory(Path::new("/srv/www"), "uploads/../../etc"),
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            resolve_directory(Path::new("/srv/www"), "/etc"),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_ensure_directory_existing() {
        let dir = tempdir().unwrap();
        let resolver = DestinationResolver::new(dir.path());
        assert!(resolver.ensure_directory(dir.path()));
    }

    #[test]
    fn test_ensure_directory_creates_nested() {
        let dir = tempdir().unwrap();
        let resolver = DestinationResolver::new(dir.path());
        let target = resolver.resolve_directory("a/b/c").unwrap();

        assert!(!target.exists());
        assert!(resolver.ensure_directory(&target));
        assert!(target.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_directory_rejects_read_only_existing() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let resolver = DestinationResolver::new(dir.path());
        let target = resolver.resolve_directory("locked").unwrap();
        fs::create_dir_all(&target).unwrap();
        fs::set_permissions(&target, fs::Permissions::from_mode(0o555)).unwrap();

        // Privileged users bypass mode bits
        let bypassed = tempfile::tempfile_in(&target).is_ok();
        if !bypassed {
            assert!(!resolver.ensure_directory(&target));
        }
        fs::set_permissions(&target, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_directory_applies_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let resolver = DestinationResolver::new(dir.path()).with_permissions(0o700);
        let target = resolver.resolve_directory("private").unwrap();

        assert!(resolver.ensure_directory(&target));
        let mode = fs::metadata(&target).unwrap().permissions().mode() & 0o777;
        // umask can only remove bits
        assert_eq!(mode & !0o700, 0);
    }

    #[test]
    fn test_ensure_directory_fails_under_regular_file() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();

        let resolver = DestinationResolver::new(&blocker);
        let target = resolver.resolve_directory("uploads").unwrap();
        assert!(!resolver.ensure_directory(&target));
    }
}
