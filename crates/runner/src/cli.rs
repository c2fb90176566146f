//! Command-line configuration
//!
//! Every flag can also come from a `TASKBOX_*` environment variable.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::warn;

use taskbox_core::application::ExecutionRequest;
use taskbox_core::domain::WorkspaceDefaults;
use taskbox_core::port::{DataMode, TaskProperties};
use taskbox_core::{Result, TaskError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable, multi-line
    Pretty,
    /// One JSON object per event
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "taskbox")]
#[command(about = "Run one registered task function against its resources", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Registered function to invoke (train, predict, score, ...)
    #[arg(long, env = "TASKBOX_FUNCTION_NAME", required_unless_present = "list_functions")]
    pub function_name: Option<String>,

    /// Input resources: JSON array of {"id", "value", "multiple"}
    #[arg(long, env = "TASKBOX_INPUTS", default_value = "[]")]
    pub inputs: String,

    /// Output resources, same format as --inputs
    #[arg(long, env = "TASKBOX_OUTPUTS", default_value = "[]")]
    pub outputs: String,

    /// JSON object passed to the function untouched
    #[arg(long, env = "TASKBOX_TASK_PROPERTIES", default_value = "{}")]
    pub task_properties: String,

    /// Opener location; overrides the `opener` input resource
    #[arg(long, env = "TASKBOX_OPENER")]
    pub opener: Option<String>,

    /// Use synthetic samples instead of reading data folders
    #[arg(long, env = "TASKBOX_FAKE_DATA")]
    pub fake_data: bool,

    /// Number of synthetic samples (required with --fake-data)
    #[arg(long, env = "TASKBOX_N_FAKE_SAMPLES")]
    pub n_fake_samples: Option<usize>,

    /// Log file (default: <workdir>/model/log_model.log)
    #[arg(long, env = "TASKBOX_LOG_PATH")]
    pub log_path: Option<String>,

    /// Log filter directive; RUST_LOG wins when set
    #[arg(long, env = "TASKBOX_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "TASKBOX_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Base directory of the default layout
    #[arg(long, env = "TASKBOX_WORKDIR", default_value = ".")]
    pub workdir: String,

    /// Print registered function names and exit
    #[arg(long)]
    pub list_functions: bool,
}

impl Cli {
    pub fn workspace_defaults(&self) -> WorkspaceDefaults {
        let defaults = WorkspaceDefaults::new(expand(&self.workdir));
        match &self.log_path {
            Some(log_path) => defaults.with_log_path(expand(log_path)),
            None => defaults,
        }
    }

    /// Resolved log file location
    pub fn log_file(&self) -> PathBuf {
        self.workspace_defaults().log_path()
    }

    /// # Errors
    /// - `TaskError::Config` if --fake-data has no sample count
    pub fn data_mode(&self) -> Result<DataMode> {
        if !self.fake_data && self.n_fake_samples.is_some() {
            warn!(
                n_fake_samples = ?self.n_fake_samples,
                "--n-fake-samples ignored without --fake-data"
            );
        }
        DataMode::from_flags(self.fake_data, self.n_fake_samples)
    }

    /// # Errors
    /// - `TaskError::Config` if the properties are not a JSON object
    pub fn task_properties(&self) -> Result<TaskProperties> {
        match serde_json::from_str::<serde_json::Value>(&self.task_properties)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(TaskError::Config(format!(
                "task properties must be a JSON object, got: {}",
                other
            ))),
        }
    }

    /// Validate flags into one execution request
    pub fn to_request(&self) -> Result<ExecutionRequest> {
        let function_name = self
            .function_name
            .clone()
            .ok_or_else(|| TaskError::Config("--function-name is required".to_string()))?;

        let mut request = ExecutionRequest::new(function_name)
            .with_inputs(self.inputs.clone())
            .with_outputs(self.outputs.clone())
            .with_task_properties(self.task_properties()?)
            .with_data_mode(self.data_mode()?);
        if let Some(opener) = &self.opener {
            request = request.with_opener(expand(opener));
        }
        Ok(request)
    }
}

fn expand(path: &str) -> String {
    shellexpand::tilde(path).into_owned()
}
