// Performance report written by scoring functions: {"all": <score>}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub all: serde_json::Value,
}

impl PerformanceReport {
    pub fn new(all: impl Into<serde_json::Value>) -> Self {
        Self { all: all.into() }
    }

    /// Numeric score, if the report holds one
    pub fn score(&self) -> Option<f64> {
        self.all.as_f64()
    }
}
