// Central Error Type for task execution

use std::path::PathBuf;

use thiserror::Error;

use crate::application::output_contract::OutputViolation;
use crate::application::registry::RegistryError;
use crate::application::resolver::ResolverError;

/// Application-level error type
///
/// Every variant is fatal for the task: there is no retry policy.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Interface error: {0}")]
    Resolver(#[from] ResolverError),

    #[error("Data source error: {0}")]
    DataSource(#[from] crate::port::DataSourceError),

    #[error("Function '{name}' failed: {source}")]
    Function {
        name: String,
        #[source]
        source: crate::port::FunctionError,
    },

    #[error("Reserved key conflict: '{0}' is provided by the platform and cannot be a task input")]
    ReservedKeyConflict(String),

    #[error("Failed to prepare workspace directory {}: {source}", .path.display())]
    WorkspacePreparation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Output contract violated: {}", join_violations(.violations))]
    OutputContract { violations: Vec<OutputViolation> },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using TaskError
pub type Result<T> = std::result::Result<T, TaskError>;

fn join_violations(violations: &[OutputViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
