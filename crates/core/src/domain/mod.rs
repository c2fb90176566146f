// Domain Layer - Pure task model: descriptors, layout, lifecycle

pub mod error;
pub mod performance;
pub mod resource;
pub mod task_state;
pub mod workspace;

// Re-exports
pub use error::DomainError;
pub use performance::PerformanceReport;
pub use resource::{
    AggregatedResource, ResourceEntry, ResourceId, ResourceValue, StaticResourceId, TaskResources,
};
pub use task_state::{TaskLifecycle, TaskState};
pub use workspace::{DeclaredOutput, Workspace, WorkspaceDefaults, WorkspaceLayout};
