// Filesystem Port
// Blocking operations the executor needs: directory creation and path probing

use std::io;
use std::path::Path;

/// What a path currently points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Directory,
    Missing,
    /// Exists but is neither a regular file nor a directory (socket, fifo, ...)
    Other,
}

/// Filesystem interface (allows in-memory fakes in tests)
pub trait FileSystem: Send + Sync {
    /// Create `path` and all missing parents
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Classify `path`, following symlinks
    fn path_kind(&self, path: &Path) -> PathKind;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// In-memory filesystem
    #[derive(Debug, Default)]
    pub struct MockFileSystem {
        entries: Mutex<HashMap<PathBuf, PathKind>>,
        failures: Mutex<HashMap<PathBuf, io::ErrorKind>>,
        created: Mutex<Vec<PathBuf>>,
    }

    impl MockFileSystem {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_file(&self, path: impl Into<PathBuf>) {
            self.entries
                .lock()
                .unwrap()
                .insert(path.into(), PathKind::File);
        }

        pub fn add_dir(&self, path: impl Into<PathBuf>) {
            self.entries
                .lock()
                .unwrap()
                .insert(path.into(), PathKind::Directory);
        }

        /// Make `create_dir_all(path)` fail with `kind`
        pub fn fail_create(&self, path: impl Into<PathBuf>, kind: io::ErrorKind) {
            self.failures.lock().unwrap().insert(path.into(), kind);
        }

        /// Directories successfully created, in call order
        pub fn created_dirs(&self) -> Vec<PathBuf> {
            self.created.lock().unwrap().clone()
        }
    }

    impl FileSystem for MockFileSystem {
        fn create_dir_all(&self, path: &Path) -> io::Result<()> {
            if let Some(kind) = self.failures.lock().unwrap().get(path) {
                return Err(io::Error::new(*kind, "mock create_dir_all failure"));
            }
            self.created.lock().unwrap().push(path.to_path_buf());
            self.entries
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), PathKind::Directory);
            Ok(())
        }

        fn path_kind(&self, path: &Path) -> PathKind {
            self.entries
                .lock()
                .unwrap()
                .get(path)
                .copied()
                .unwrap_or(PathKind::Missing)
        }
    }
}
