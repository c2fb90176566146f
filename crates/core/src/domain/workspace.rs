// Workspace Domain Model
//
// Concrete filesystem layout of one task invocation, derived either from the
// parsed descriptors or from directory conventions.

use std::path::{Path, PathBuf};

use crate::domain::resource::{StaticResourceId, TaskResources};

/// Input data folder (relative to the base directory)
pub const DEFAULT_DATA_DIR: &str = "data";

/// Model log file (relative to the base directory)
pub const DEFAULT_LOG_PATH: &str = "model/log_model.log";

/// Key material directory (relative to the base directory)
pub const DEFAULT_CHAINKEYS_DIR: &str = "chainkeys";

/// Predictions file (relative to the base directory)
pub const DEFAULT_PREDICTIONS_PATH: &str = "pred/pred";

/// Performance report (relative to the base directory)
pub const DEFAULT_PERFORMANCE_PATH: &str = "pred/perf.json";

/// Directory conventions used when no resources are supplied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceDefaults {
    pub base_dir: PathBuf,
    /// Explicit log location; wins over the conventional one in both layouts
    pub log_path: Option<PathBuf>,
}

impl Default for WorkspaceDefaults {
    fn default() -> Self {
        Self::new(".")
    }
}

impl WorkspaceDefaults {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            log_path: None,
        }
    }

    pub fn with_log_path(mut self, log_path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(log_path.into());
        self
    }

    pub fn data_dir(&self) -> PathBuf {
        self.base_dir.join(DEFAULT_DATA_DIR)
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_path
            .clone()
            .unwrap_or_else(|| self.base_dir.join(DEFAULT_LOG_PATH))
    }

    pub fn chainkeys_path(&self) -> PathBuf {
        self.base_dir.join(DEFAULT_CHAINKEYS_DIR)
    }

    pub fn predictions_path(&self) -> PathBuf {
        self.base_dir.join(DEFAULT_PREDICTIONS_PATH)
    }

    pub fn performance_path(&self) -> PathBuf {
        self.base_dir.join(DEFAULT_PERFORMANCE_PATH)
    }
}

/// Where the layout came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceLayout {
    Defaults,
    Resources,
}

/// One declared output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredOutput {
    pub id: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub layout: WorkspaceLayout,
    pub log_path: String,
    pub chainkeys_path: Option<String>,
    pub input_data_folder_paths: Vec<String>,
    pub opener_path: Option<String>,
    pub task_inputs: TaskResources,
    pub task_outputs: TaskResources,
}

impl Workspace {
    /// Resource-derived layout when any descriptor is non-empty, conventions otherwise
    pub fn resolve(
        inputs: TaskResources,
        outputs: TaskResources,
        defaults: &WorkspaceDefaults,
    ) -> Self {
        if inputs.is_empty() && outputs.is_empty() {
            Self::from_defaults(defaults)
        } else {
            Self::from_resources(inputs, outputs, defaults)
        }
    }

    pub fn from_defaults(defaults: &WorkspaceDefaults) -> Self {
        Self {
            layout: WorkspaceLayout::Defaults,
            log_path: path_string(&defaults.log_path()),
            chainkeys_path: Some(path_string(&defaults.chainkeys_path())),
            input_data_folder_paths: vec![path_string(&defaults.data_dir())],
            opener_path: None,
            task_inputs: TaskResources::default(),
            task_outputs: TaskResources::default(),
        }
    }

    /// Static resources replace the conventions wholesale: an absent static
    /// id leaves its field empty rather than falling back to a default.
    pub fn from_resources(
        inputs: TaskResources,
        outputs: TaskResources,
        defaults: &WorkspaceDefaults,
    ) -> Self {
        let input_data_folder_paths = inputs
            .get_static(StaticResourceId::Datasamples)
            .map(|v| v.values().to_vec())
            .unwrap_or_default();

        let opener_path = inputs
            .get_static(StaticResourceId::Opener)
            .and_then(|v| v.values().first().cloned());

        let chainkeys_path = inputs
            .get_static(StaticResourceId::Chainkeys)
            .and_then(|v| v.values().first().cloned());

        Self {
            layout: WorkspaceLayout::Resources,
            log_path: path_string(&defaults.log_path()),
            chainkeys_path,
            input_data_folder_paths,
            opener_path,
            task_inputs: inputs,
            task_outputs: outputs,
        }
    }

    /// Every value of every output id, in descriptor order
    pub fn declared_outputs(&self) -> Vec<DeclaredOutput> {
        self.task_outputs
            .iter()
            .flat_map(|(id, resource)| {
                resource.values.iter().map(move |path| DeclaredOutput {
                    id: id.to_string(),
                    path: path.clone(),
                })
            })
            .collect()
    }

    /// Directories that must exist before the function runs
    pub fn required_directories(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = Vec::new();

        if let Some(chainkeys) = &self.chainkeys_path {
            dirs.push(PathBuf::from(chainkeys));
        }

        for output in self.declared_outputs() {
            if let Some(parent) = Path::new(&output.path).parent() {
                if !parent.as_os_str().is_empty() {
                    dirs.push(parent.to_path_buf());
                }
            }
        }

        let mut seen = std::collections::HashSet::new();
        dirs.retain(|dir| seen.insert(dir.clone()));
        dirs
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
