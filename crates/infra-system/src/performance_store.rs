// Performance report persistence: {"all": <score>} as JSON
use std::fs;
use std::path::Path;

use tracing::info;

use taskbox_core::domain::PerformanceReport;
use taskbox_core::Result;

/// Write `report` to `path`, creating the parent directory
pub fn save_performance(report: &PerformanceReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string(report)?;
    fs::write(path, body)?;
    info!(path = %path.display(), score = ?report.score(), "Performance report saved");
    Ok(())
}

pub fn load_performance(path: &Path) -> Result<PerformanceReport> {
    let body = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use taskbox_core::TaskError;
    use tempfile::tempdir;

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pred/perf.json");

        save_performance(&PerformanceReport::new(0.42), &path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, json!({"all": 0.42}));
        assert_eq!(load_performance(&path).unwrap().score(), Some(0.42));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("perf.json");
        assert!(matches!(load_performance(&missing), Err(TaskError::Io(_))));

        fs::write(&missing, "{\"score\": 1}").unwrap();
        assert!(matches!(
            load_performance(&missing),
            Err(TaskError::Serialization(_))
        ));
    }
}
