//! Taskbox runner: command-line composition root
//!
//! Wires the builtin functions and openers, the std filesystem adapter and
//! the core executor.

pub mod builtin;
pub mod cli;
pub mod logging;
pub mod run;

pub use cli::{Cli, LogFormat};
pub use run::run;
