// Task Function Port
// Signature of the user compute step (train, predict, score, ...)

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::domain::ResourceValue;
use crate::port::data_source::Data;

/// Opaque key/value bag passed through to the function untouched
pub type TaskProperties = serde_json::Map<String, serde_json::Value>;

/// Dynamic output resources, keyed by id
pub type TaskOutputs = BTreeMap<String, ResourceValue>;

/// Dynamic input resources plus the loaded data under `datasamples`
pub type TaskInputs = BTreeMap<String, TaskInput>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TaskInput {
    Resource(ResourceValue),
    Data(Data),
}

impl TaskInput {
    pub fn as_resource(&self) -> Option<&ResourceValue> {
        match self {
            TaskInput::Resource(value) => Some(value),
            TaskInput::Data(_) => None,
        }
    }

    pub fn as_data(&self) -> Option<&Data> {
        match self {
            TaskInput::Data(data) => Some(data),
            TaskInput::Resource(_) => None,
        }
    }

    /// Single path of a non-multiple resource
    pub fn as_path(&self) -> Option<&str> {
        self.as_resource().and_then(ResourceValue::as_single)
    }
}

/// Failure reported by user code
#[derive(Error, Debug)]
pub enum FunctionError {
    #[error("Missing {kind} '{id}'")]
    MissingResource { kind: &'static str, id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Failed(String),
}

impl FunctionError {
    pub fn failed(message: impl Into<String>) -> Self {
        FunctionError::Failed(message.into())
    }
}

/// Registered compute step
pub type TaskFunction = Arc<
    dyn Fn(&TaskInputs, &TaskOutputs, &TaskProperties) -> Result<(), FunctionError> + Send + Sync,
>;

/// Path of a single-valued input resource
pub fn input_path<'a>(inputs: &'a TaskInputs, id: &str) -> Result<&'a str, FunctionError> {
    inputs
        .get(id)
        .and_then(TaskInput::as_path)
        .ok_or_else(|| FunctionError::MissingResource {
            kind: "input",
            id: id.to_string(),
        })
}

/// Path of a single-valued output resource
pub fn output_path<'a>(outputs: &'a TaskOutputs, id: &str) -> Result<&'a str, FunctionError> {
    outputs
        .get(id)
        .and_then(ResourceValue::as_single)
        .ok_or_else(|| FunctionError::MissingResource {
            kind: "output",
            id: id.to_string(),
        })
}
