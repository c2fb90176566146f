// Taskbox Infrastructure - System Adapters
// Implements: FileSystem, performance report persistence

pub mod performance_store;
pub mod std_filesystem;

pub use performance_store::{load_performance, save_performance};
pub use std_filesystem::StdFileSystem;
