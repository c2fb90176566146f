//! One invocation from parsed flags to a validated report

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};

use taskbox_core::application::{ExecutionReport, FunctionRegistry, InterfaceResolver, TaskExecutor};
use taskbox_core::port::{FileSystem, StaticPluginCatalog};
use taskbox_infra_system::StdFileSystem;

use crate::cli::Cli;

/// Build the executor (DI wiring) and run the requested function
pub fn run(
    cli: &Cli,
    registry: FunctionRegistry,
    catalog: StaticPluginCatalog,
) -> Result<ExecutionReport> {
    let request = match cli.to_request() {
        Ok(request) => request,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(anyhow::Error::new(e).context("Invalid configuration"));
        }
    };

    let fs: Arc<dyn FileSystem> = Arc::new(StdFileSystem::new());
    let executor = TaskExecutor::new(
        Arc::new(registry),
        InterfaceResolver::new(Arc::new(catalog)),
        fs,
        cli.workspace_defaults(),
    );

    let report = executor
        .execute(&request)
        .with_context(|| format!("Task '{}' failed", request.function_name))?;

    info!(
        task_id = %report.task_id,
        state = %report.state,
        duration_ms = report.duration_ms,
        "Task finished"
    );
    Ok(report)
}
