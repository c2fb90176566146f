// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid task state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Malformed resource descriptor: {0}")]
    MalformedDescriptor(String),

    /// Covers every id bound to more values than its multiplicity allows,
    /// and ids whose entries disagree on `multiple`.
    #[error("Multiplicity violation for resource ids: {}", .ids.join(", "))]
    MultiplicityViolation { ids: Vec<String> },
}

pub type Result<T> = std::result::Result<T, DomainError>;
