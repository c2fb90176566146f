// std::fs adapter for the FileSystem port
use std::fs;
use std::io;
use std::path::Path;

use tracing::trace;

use taskbox_core::port::{FileSystem, PathKind};

/// Blocking filesystem backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl StdFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for StdFileSystem {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        trace!(path = %path.display(), "create_dir_all");
        fs::create_dir_all(path)
    }

    fn path_kind(&self, path: &Path) -> PathKind {
        match fs::metadata(path) {
            Ok(meta) if meta.is_file() => PathKind::File,
            Ok(meta) if meta.is_dir() => PathKind::Directory,
            Ok(_) => PathKind::Other,
            Err(_) => PathKind::Missing,
        }
    }
}
