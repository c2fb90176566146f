// Workspace preparation: directory side effects before the function runs

use std::io::ErrorKind;

use tracing::{debug, warn};

use crate::domain::Workspace;
use crate::error::{Result, TaskError};
use crate::port::{FileSystem, PathKind};

/// Create the key-material directory and every output's parent directory
///
/// Idempotent: an existing directory is success, including when creating it
/// again is refused with `PermissionDenied`.
///
/// # Errors
/// - `TaskError::WorkspacePreparation` for any other creation failure
pub fn prepare_workspace(workspace: &Workspace, fs: &dyn FileSystem) -> Result<()> {
    for dir in workspace.required_directories() {
        match fs.create_dir_all(&dir) {
            Ok(()) => debug!(path = %dir.display(), "Directory ready"),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %dir.display(), "Directory already exists");
            }
            Err(e)
                if e.kind() == ErrorKind::PermissionDenied
                    && fs.path_kind(&dir) == PathKind::Directory =>
            {
                warn!(path = %dir.display(), "Permission denied on existing directory, using it as is");
            }
            Err(source) => {
                return Err(TaskError::WorkspacePreparation { path: dir, source });
            }
        }
    }
    Ok(())
}
