// Port Layer - Interfaces for external dependencies

pub mod data_source;
pub mod filesystem;
pub mod id_provider; // For deterministic testing
pub mod plugin_catalog;
pub mod task_function;
pub mod time_provider;

// Re-exports
pub use data_source::{
    load_data, Data, DataMode, DataSource, DataSourceError, FunctionSignatures, OPENER_CAPABILITY,
    OPENER_FUNCTIONS,
};
pub use filesystem::{FileSystem, PathKind};
pub use id_provider::IdProvider;
pub use plugin_catalog::{
    CatalogError, CodeUnit, Declaration, FreeFunction, PluginCatalog, StaticPluginCatalog,
};
pub use task_function::{
    input_path, output_path, FunctionError, TaskFunction, TaskInput, TaskInputs, TaskOutputs,
    TaskProperties,
};
pub use time_provider::TimeProvider;
