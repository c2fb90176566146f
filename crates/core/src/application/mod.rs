// Application Layer - Use Cases

pub mod executor;
pub mod output_contract;
pub mod registry;
pub mod resolver;
pub mod workspace_setup;

// Re-exports
pub use executor::{ExecutionReport, ExecutionRequest, TaskExecutor, DATASAMPLES_KEY};
pub use output_contract::{validate_outputs, OutputViolation};
pub use registry::{FunctionRegistry, FunctionRegistryBuilder, RegisteredFunction, RegistryError};
pub use resolver::{InterfaceResolver, Resolution, ResolvedSource, ResolverError};
pub use workspace_setup::prepare_workspace;
