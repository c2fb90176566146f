// Data Source Port
// Capability implemented by openers: load real samples from folders, or
// synthesize a given number of fake ones.

use thiserror::Error;
use tracing::debug;

use crate::error::{Result, TaskError};

/// Loaded samples, opaque to the executor
pub type Data = serde_json::Value;

/// Capability a type must declare to act as an opener
pub const OPENER_CAPABILITY: &str = "opener";

/// Free-function fallback for openers that declare no type
pub const OPENER_FUNCTIONS: FunctionSignatures = FunctionSignatures {
    load_real: "get_data",
    load_fake: "fake_data",
};

/// Names of the free functions standing in for the capability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSignatures {
    pub load_real: &'static str,
    pub load_fake: &'static str,
}

impl FunctionSignatures {
    pub fn names(&self) -> [&'static str; 2] {
        [self.load_real, self.load_fake]
    }
}

#[derive(Error, Debug)]
pub enum DataSourceError {
    #[error("Failed to load data from {path}: {message}")]
    Load { path: String, message: String },

    #[error("Data source error: {0}")]
    Other(String),
}

/// Opener capability
///
/// Implementations:
/// - user types registered in a `PluginCatalog`
/// - `FreeFunctionSource`: adapter over free `get_data`/`fake_data` functions
pub trait DataSource: Send + Sync {
    /// Load real samples; `folders` order is significant and must be kept
    fn load_real(&self, folders: &[String]) -> std::result::Result<Data, DataSourceError>;

    /// Generate `n_samples` synthetic samples without touching any folder
    fn load_fake(&self, n_samples: usize) -> std::result::Result<Data, DataSourceError>;
}

/// Real or synthetic loading, fixed before any loading happens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataMode {
    Real,
    Fake { n_samples: usize },
}

impl DataMode {
    /// # Errors
    /// - `TaskError::Config` if fake data is requested without a sample count
    pub fn from_flags(fake_data: bool, n_fake_samples: Option<usize>) -> Result<Self> {
        match (fake_data, n_fake_samples) {
            (true, Some(n_samples)) => Ok(DataMode::Fake { n_samples }),
            (true, None) => Err(TaskError::Config(
                "fake data requested without a number of fake samples".to_string(),
            )),
            (false, _) => Ok(DataMode::Real),
        }
    }
}

/// Load through exactly one code path
pub fn load_data(
    source: &dyn DataSource,
    mode: DataMode,
    folders: &[String],
) -> std::result::Result<Data, DataSourceError> {
    match mode {
        DataMode::Fake { n_samples } => {
            debug!(n_samples = n_samples, "Loading fake data");
            source.load_fake(n_samples)
        }
        DataMode::Real => {
            debug!(folders = ?folders, "Loading data from folders");
            source.load_real(folders)
        }
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum DataCall {
        Real(Vec<String>),
        Fake(usize),
    }

    /// Data source recording every call; clones share the record
    #[derive(Debug, Clone, Default)]
    pub struct RecordingDataSource {
        calls: Arc<Mutex<Vec<DataCall>>>,
    }

    impl RecordingDataSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<DataCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl DataSource for RecordingDataSource {
        fn load_real(&self, folders: &[String]) -> std::result::Result<Data, DataSourceError> {
            self.calls
                .lock()
                .unwrap()
                .push(DataCall::Real(folders.to_vec()));
            Ok(serde_json::json!(folders))
        }

        fn load_fake(&self, n_samples: usize) -> std::result::Result<Data, DataSourceError> {
            self.calls.lock().unwrap().push(DataCall::Fake(n_samples));
            Ok(serde_json::json!((0..n_samples).collect::<Vec<_>>()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::{DataCall, RecordingDataSource};
    use super::*;

    #[test]
    fn test_mode_from_flags() {
        assert_eq!(DataMode::from_flags(false, None).unwrap(), DataMode::Real);
        assert_eq!(DataMode::from_flags(false, Some(3)).unwrap(), DataMode::Real);
        assert_eq!(
            DataMode::from_flags(true, Some(7)).unwrap(),
            DataMode::Fake { n_samples: 7 }
        );
        assert!(matches!(
            DataMode::from_flags(true, None),
            Err(TaskError::Config(_))
        ));
    }

    #[test]
    fn test_fake_mode_never_reads_folders() {
        let source = RecordingDataSource::new();
        let folders = vec!["/data/a".to_string()];

        let data = load_data(&source, DataMode::Fake { n_samples: 7 }, &folders).unwrap();

        assert_eq!(source.calls(), vec![DataCall::Fake(7)]);
        assert_eq!(data.as_array().map(Vec::len), Some(7));
    }

    #[test]
    fn test_real_mode_keeps_folder_order() {
        let source = RecordingDataSource::new();
        let folders = vec!["/data/b".to_string(), "/data/a".to_string()];

        load_data(&source, DataMode::Real, &folders).unwrap();

        assert_eq!(source.calls(), vec![DataCall::Real(folders)]);
    }

    #[test]
    fn test_opener_function_names() {
        assert_eq!(OPENER_FUNCTIONS.names(), ["get_data", "fake_data"]);
    }
}
