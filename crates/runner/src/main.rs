//! Taskbox - Main Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use taskbox_runner::{builtin, logging, run, Cli};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<()> {
    let cli = Cli::parse();
    let registry = builtin::registry(&cli.workspace_defaults()).context("Failed to register builtin functions")?;

    if cli.list_functions {
        for name in registry.names() {
            println!("{}", name);
        }
        return Ok(());
    }

    // 1. Initialize logging (stderr + log file)
    let _guard = logging::init_logging(&cli.log_level, cli.log_format, &cli.log_file())?;
    info!(log_file = %cli.log_file().display(), "Taskbox v{} starting...", VERSION);

    // 2. Plugins, then one execution
    let catalog = builtin::catalog().context("Failed to build plugin catalog")?;
    run(&cli, registry, catalog)?;

    Ok(())
}
