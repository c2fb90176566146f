// Post-execution output contract: every declared output is a regular file

use std::path::Path;

use thiserror::Error;
use tracing::{error, info};

use crate::domain::DeclaredOutput;
use crate::error::{Result, TaskError};
use crate::port::{FileSystem, PathKind};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OutputViolation {
    #[error("output '{id}' is missing at {path}")]
    OutputMissing { id: String, path: String },

    #[error("output '{id}' at {path} is a directory")]
    OutputIsDirectory { id: String, path: String },

    #[error("output '{id}' at {path} is not a regular file")]
    NotRegularFile { id: String, path: String },
}

/// Check every output before failing, so one report lists all violations
///
/// Returns the validated paths in declaration order.
///
/// # Errors
/// - `TaskError::OutputContract` with one entry per violated output
pub fn validate_outputs(outputs: &[DeclaredOutput], fs: &dyn FileSystem) -> Result<Vec<String>> {
    let mut violations = Vec::new();

    for output in outputs {
        let (id, path) = (output.id.clone(), output.path.clone());
        match fs.path_kind(Path::new(&output.path)) {
            PathKind::File => {}
            PathKind::Missing => violations.push(OutputViolation::OutputMissing { id, path }),
            PathKind::Directory => violations.push(OutputViolation::OutputIsDirectory { id, path }),
            PathKind::Other => violations.push(OutputViolation::NotRegularFile { id, path }),
        }
    }

    if !violations.is_empty() {
        for violation in &violations {
            error!(violation = %violation, "Output contract violated");
        }
        return Err(TaskError::OutputContract { violations });
    }

    info!(count = outputs.len(), "All declared outputs present");
    Ok(outputs.iter().map(|o| o.path.clone()).collect())
}
