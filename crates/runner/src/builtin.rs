//! Functions and openers compiled into the `taskbox` binary
//!
//! A line-count model: samples are text lines, `train` records how many it
//! saw, `predict` emits each sample's length, `score` writes the mean
//! prediction as the performance report.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::{debug, info};

use taskbox_core::application::{FunctionRegistry, RegistryError, DATASAMPLES_KEY};
use taskbox_core::domain::{PerformanceReport, WorkspaceDefaults};
use taskbox_core::port::{
    input_path, output_path, CatalogError, CodeUnit, Data, DataSource, DataSourceError,
    FunctionError, StaticPluginCatalog, TaskInputs, TaskOutputs, TaskProperties,
};
use taskbox_infra_system::save_performance;

/// Opener reading every non-empty line of every file in the data folders
#[derive(Debug, Default)]
pub struct LineOpener;

impl DataSource for LineOpener {
    fn load_real(&self, folders: &[String]) -> Result<Data, DataSourceError> {
        let mut samples = Vec::new();
        for folder in folders {
            samples.extend(read_folder_lines(Path::new(folder))?);
        }
        debug!(samples = samples.len(), folders = folders.len(), "Lines loaded");
        Ok(json!(samples))
    }

    fn load_fake(&self, n_samples: usize) -> Result<Data, DataSourceError> {
        Ok(json!(fake_lines(n_samples)))
    }
}

fn read_folder_lines(folder: &Path) -> Result<Vec<String>, DataSourceError> {
    let load_error = |e: std::io::Error| DataSourceError::Load {
        path: folder.display().to_string(),
        message: e.to_string(),
    };

    let mut files: Vec<_> = fs::read_dir(folder)
        .map_err(load_error)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let mut lines = Vec::new();
    for file in files {
        let content = fs::read_to_string(&file).map_err(load_error)?;
        lines.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
        );
    }
    Ok(lines)
}

fn fake_lines(n_samples: usize) -> Vec<String> {
    (0..n_samples).map(|i| format!("sample-{}", i)).collect()
}

/// Registry with `train`, `predict` and `score`
///
/// `predict` and `score` fall back to the `pred/` files of `defaults` when
/// the caller passes no predictions or performance resource.
pub fn registry(defaults: &WorkspaceDefaults) -> Result<FunctionRegistry, RegistryError> {
    let predict_defaults = defaults.clone();
    let score_defaults = defaults.clone();
    FunctionRegistry::builder()
        .function("train", train)
        .function(
            "predict",
            move |inputs: &TaskInputs, outputs: &TaskOutputs, props: &TaskProperties| {
                predict(inputs, outputs, props, &predict_defaults)
            },
        )
        .function(
            "score",
            move |inputs: &TaskInputs, outputs: &TaskOutputs, props: &TaskProperties| {
                score(inputs, outputs, props, &score_defaults)
            },
        )
        .build()
}

/// Catalog with `lines` (typed opener) and `legacy_lines` (free functions)
pub fn catalog() -> Result<StaticPluginCatalog, CatalogError> {
    StaticPluginCatalog::new()
        .with_unit(CodeUnit::new("lines").with_data_source::<LineOpener>("LineOpener"))?
        .with_unit(
            CodeUnit::new("legacy_lines")
                .with_real_loader("get_data", |folders: &[String]| {
                    LineOpener.load_real(folders)
                })
                .with_fake_loader("fake_data", |n_samples: usize| {
                    Ok(json!(fake_lines(n_samples)))
                }),
        )
}

fn samples(inputs: &TaskInputs) -> Vec<String> {
    inputs
        .get(DATASAMPLES_KEY)
        .and_then(|input| input.as_data())
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn path_or(found: Result<&str, FunctionError>, fallback: PathBuf) -> PathBuf {
    found.map(PathBuf::from).unwrap_or(fallback)
}

fn train(
    inputs: &TaskInputs,
    outputs: &TaskOutputs,
    task_properties: &TaskProperties,
) -> Result<(), FunctionError> {
    let samples = samples(inputs);
    let model = json!({
        "n_samples": samples.len(),
        "rank": task_properties.get("rank").cloned().unwrap_or(Value::Null),
    });

    let path = output_path(outputs, "model")?;
    fs::write(path, serde_json::to_vec(&model)?)?;
    info!(path = %path, n_samples = samples.len(), "Model written");
    Ok(())
}

fn predict(
    inputs: &TaskInputs,
    outputs: &TaskOutputs,
    _task_properties: &TaskProperties,
    defaults: &WorkspaceDefaults,
) -> Result<(), FunctionError> {
    let model: Value = serde_json::from_str(&fs::read_to_string(input_path(inputs, "model")?)?)?;
    if model.get("n_samples").is_none() {
        return Err(FunctionError::failed("model has no n_samples field"));
    }

    let predictions: Vec<usize> = samples(inputs).iter().map(|s| s.chars().count()).collect();
    let path = path_or(output_path(outputs, "predictions"), defaults.predictions_path());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, serde_json::to_vec(&predictions)?)?;
    info!(path = %path.display(), count = predictions.len(), "Predictions written");
    Ok(())
}

fn score(
    inputs: &TaskInputs,
    outputs: &TaskOutputs,
    _task_properties: &TaskProperties,
    defaults: &WorkspaceDefaults,
) -> Result<(), FunctionError> {
    let source = path_or(input_path(inputs, "predictions"), defaults.predictions_path());
    let predictions: Vec<f64> = serde_json::from_str(&fs::read_to_string(source)?)?;
    let mean = if predictions.is_empty() {
        0.0
    } else {
        predictions.iter().sum::<f64>() / predictions.len() as f64
    };

    let path = path_or(output_path(outputs, "performance"), defaults.performance_path());
    save_performance(&PerformanceReport::new(mean), &path)
        .map_err(|e| FunctionError::failed(e.to_string()))
}
