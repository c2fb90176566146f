// Task lifecycle state machine

use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, Result};

/// Single-pass task lifecycle
///
/// INIT -> RESOURCES_LOADED -> WORKSPACE_READY -> DATA_LOADED -> INVOKED -> OUTPUTS_VALIDATED,
/// with FAILED reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Init,
    ResourcesLoaded,
    WorkspaceReady,
    DataLoaded,
    Invoked,
    OutputsValidated,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::OutputsValidated | TaskState::Failed)
    }

    /// The only forward state reachable from `self`
    pub fn successor(&self) -> Option<TaskState> {
        match self {
            TaskState::Init => Some(TaskState::ResourcesLoaded),
            TaskState::ResourcesLoaded => Some(TaskState::WorkspaceReady),
            TaskState::WorkspaceReady => Some(TaskState::DataLoaded),
            TaskState::DataLoaded => Some(TaskState::Invoked),
            TaskState::Invoked => Some(TaskState::OutputsValidated),
            TaskState::OutputsValidated | TaskState::Failed => None,
        }
    }

    pub fn can_transition_to(&self, next: TaskState) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == TaskState::Failed || self.successor() == Some(next)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Init => write!(f, "INIT"),
            TaskState::ResourcesLoaded => write!(f, "RESOURCES_LOADED"),
            TaskState::WorkspaceReady => write!(f, "WORKSPACE_READY"),
            TaskState::DataLoaded => write!(f, "DATA_LOADED"),
            TaskState::Invoked => write!(f, "INVOKED"),
            TaskState::OutputsValidated => write!(f, "OUTPUTS_VALIDATED"),
            TaskState::Failed => write!(f, "FAILED"),
        }
    }
}

/// Tracks the current state of one invocation
#[derive(Debug, Clone)]
pub struct TaskLifecycle {
    state: TaskState,
    last_active: TaskState,
}

impl Default for TaskLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskLifecycle {
    pub fn new() -> Self {
        Self {
            state: TaskState::Init,
            last_active: TaskState::Init,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Last non-failed state reached, i.e. where a failure happened
    pub fn last_active(&self) -> TaskState {
        self.last_active
    }

    pub fn advance(&mut self, next: TaskState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        if next != TaskState::Failed {
            self.last_active = next;
        }
        self.state = next;
        Ok(())
    }

    /// Mark as failed; a no-op once terminal
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = TaskState::Failed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_forward_path() {
        let mut lifecycle = TaskLifecycle::new();
        for next in [
            TaskState::ResourcesLoaded,
            TaskState::WorkspaceReady,
            TaskState::DataLoaded,
            TaskState::Invoked,
            TaskState::OutputsValidated,
        ] {
            assert!(lifecycle.advance(next).is_ok());
        }
        assert_eq!(lifecycle.state(), TaskState::OutputsValidated);
        assert!(lifecycle.state().is_terminal());
    }

    #[test]
    fn test_cannot_skip_or_reenter_states() {
        let mut lifecycle = TaskLifecycle::new();
        assert!(lifecycle.advance(TaskState::DataLoaded).is_err());

        lifecycle.advance(TaskState::ResourcesLoaded).unwrap();
        assert!(lifecycle.advance(TaskState::ResourcesLoaded).is_err());
        assert!(lifecycle.advance(TaskState::Init).is_err());
    }

    #[test]
    fn test_failed_reachable_from_any_non_terminal_state() {
        let mut lifecycle = TaskLifecycle::new();
        lifecycle.advance(TaskState::ResourcesLoaded).unwrap();
        lifecycle.advance(TaskState::WorkspaceReady).unwrap();

        lifecycle.fail();
        assert_eq!(lifecycle.state(), TaskState::Failed);
        assert_eq!(lifecycle.last_active(), TaskState::WorkspaceReady);

        // Terminal: no further transitions
        assert!(lifecycle.advance(TaskState::DataLoaded).is_err());
    }

    #[test]
    fn test_fail_after_success_is_ignored() {
        let mut lifecycle = TaskLifecycle::new();
        for next in [
            TaskState::ResourcesLoaded,
            TaskState::WorkspaceReady,
            TaskState::DataLoaded,
            TaskState::Invoked,
            TaskState::OutputsValidated,
        ] {
            lifecycle.advance(next).unwrap();
        }
        lifecycle.fail();
        assert_eq!(lifecycle.state(), TaskState::OutputsValidated);
    }
}
