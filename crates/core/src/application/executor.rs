// Task Executor
//
// Runs one invocation through the lifecycle:
// INIT -> RESOURCES_LOADED -> WORKSPACE_READY -> DATA_LOADED -> INVOKED -> OUTPUTS_VALIDATED

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, info_span, warn};

use crate::application::output_contract::validate_outputs;
use crate::application::registry::{FunctionRegistry, RegisteredFunction};
use crate::application::resolver::{InterfaceResolver, Resolution, ResolvedSource};
use crate::application::workspace_setup::prepare_workspace;
use crate::domain::{
    StaticResourceId, TaskLifecycle, TaskResources, TaskState, Workspace, WorkspaceDefaults,
};
use crate::error::{Result, TaskError};
use crate::port::id_provider::UuidProvider;
use crate::port::time_provider::SystemTimeProvider;
use crate::port::{
    load_data, Data, DataMode, FileSystem, FunctionError, IdProvider, TaskInput, TaskInputs,
    TaskOutputs, TaskProperties, TimeProvider,
};

/// Key under which loaded samples are handed to the function
pub const DATASAMPLES_KEY: &str = "datasamples";

/// Task property filled from the `rank` resource
pub const RANK_PROPERTY: &str = "rank";

/// One invocation, as received from the command line
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub function_name: String,
    /// Raw input descriptor
    pub inputs: String,
    /// Raw output descriptor
    pub outputs: String,
    pub task_properties: TaskProperties,
    /// Opener location; wins over the `opener` input resource
    pub opener: Option<String>,
    pub data_mode: DataMode,
}

impl ExecutionRequest {
    pub fn new(function_name: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            inputs: "[]".to_string(),
            outputs: "[]".to_string(),
            task_properties: TaskProperties::new(),
            opener: None,
            data_mode: DataMode::Real,
        }
    }

    pub fn with_inputs(mut self, inputs: impl Into<String>) -> Self {
        self.inputs = inputs.into();
        self
    }

    pub fn with_outputs(mut self, outputs: impl Into<String>) -> Self {
        self.outputs = outputs.into();
        self
    }

    pub fn with_task_properties(mut self, task_properties: TaskProperties) -> Self {
        self.task_properties = task_properties;
        self
    }

    pub fn with_opener(mut self, opener: impl Into<String>) -> Self {
        self.opener = Some(opener.into());
        self
    }

    pub fn with_data_mode(mut self, data_mode: DataMode) -> Self {
        self.data_mode = data_mode;
        self
    }
}

/// Outcome of a successful invocation
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub task_id: String,
    pub function_name: String,
    pub state: TaskState,
    pub duration_ms: i64,
    /// Output paths confirmed as regular files
    pub validated_outputs: Vec<String>,
    /// How the opener was bound, if the task had one
    pub resolution: Option<Resolution>,
}

/// Executes registered functions against a prepared workspace
///
/// Single pass: no retries and no re-entry. Every failure moves the task to
/// `FAILED`, is logged, then returned.
pub struct TaskExecutor {
    registry: Arc<FunctionRegistry>,
    resolver: InterfaceResolver,
    fs: Arc<dyn FileSystem>,
    defaults: WorkspaceDefaults,
    time_provider: Arc<dyn TimeProvider>,
    id_provider: Arc<dyn IdProvider>,
}

impl TaskExecutor {
    pub fn new(
        registry: Arc<FunctionRegistry>,
        resolver: InterfaceResolver,
        fs: Arc<dyn FileSystem>,
        defaults: WorkspaceDefaults,
    ) -> Self {
        Self {
            registry,
            resolver,
            fs,
            defaults,
            time_provider: Arc::new(SystemTimeProvider),
            id_provider: Arc::new(UuidProvider),
        }
    }

    /// Replace clock and id source (deterministic tests)
    pub fn with_providers(
        mut self,
        time_provider: Arc<dyn TimeProvider>,
        id_provider: Arc<dyn IdProvider>,
    ) -> Self {
        self.time_provider = time_provider;
        self.id_provider = id_provider;
        self
    }

    pub fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionReport> {
        let task_id = self.id_provider.generate_id();
        let span = info_span!("task", task_id = %task_id, function = %request.function_name);
        let _enter = span.enter();

        let started_at = self.time_provider.now_millis();
        let mut lifecycle = TaskLifecycle::new();
        info!(state = %lifecycle.state(), "Task started");

        match self.run(request, &mut lifecycle) {
            Ok((validated_outputs, resolution)) => {
                let duration_ms = self.time_provider.now_millis() - started_at;
                info!(duration_ms = duration_ms, outputs = validated_outputs.len(), "Task completed");
                Ok(ExecutionReport {
                    task_id,
                    function_name: request.function_name.clone(),
                    state: lifecycle.state(),
                    duration_ms,
                    validated_outputs,
                    resolution,
                })
            }
            Err(e) => {
                lifecycle.fail();
                error!(
                    failed_in = %lifecycle.last_active(),
                    state = %lifecycle.state(),
                    error = %e,
                    "Task failed"
                );
                Err(e)
            }
        }
    }

    fn run(
        &self,
        request: &ExecutionRequest,
        lifecycle: &mut TaskLifecycle,
    ) -> Result<(Vec<String>, Option<Resolution>)> {
        let inputs = TaskResources::parse(&request.inputs)?;
        let outputs = TaskResources::parse(&request.outputs)?;
        debug!(inputs = inputs.len(), outputs = outputs.len(), "Descriptors parsed");
        advance(lifecycle, TaskState::ResourcesLoaded)?;

        let workspace = Workspace::resolve(inputs, outputs, &self.defaults);
        prepare_workspace(&workspace, self.fs.as_ref())?;
        let opener = self.bind_opener(request, &workspace)?;
        advance(lifecycle, TaskState::WorkspaceReady)?;

        let mut task_inputs: TaskInputs = workspace
            .task_inputs
            .dynamic_resources()
            .into_iter()
            .map(|(id, value)| (id, TaskInput::Resource(value)))
            .collect();

        let resolution = match &opener {
            Some(resolved) => {
                let data = load_data(
                    resolved.source.as_ref(),
                    request.data_mode,
                    &workspace.input_data_folder_paths,
                )?;
                insert_loaded_data(&mut task_inputs, data)?;
                Some(resolved.resolution.clone())
            }
            None => {
                if let DataMode::Fake { .. } = request.data_mode {
                    warn!("Fake data requested but the task has no opener, nothing to load");
                } else {
                    debug!("No opener, skipping data loading");
                }
                None
            }
        };
        advance(lifecycle, TaskState::DataLoaded)?;

        let function = self.registry.resolve(&request.function_name)?;
        let task_outputs: TaskOutputs = workspace.task_outputs.dynamic_resources();
        let task_properties = with_rank(request.task_properties.clone(), &workspace.task_inputs);

        invoke(function, &task_inputs, &task_outputs, &task_properties).map_err(|source| {
            TaskError::Function {
                name: request.function_name.clone(),
                source,
            }
        })?;
        drop(opener);
        advance(lifecycle, TaskState::Invoked)?;

        let validated = validate_outputs(&workspace.declared_outputs(), self.fs.as_ref())?;
        advance(lifecycle, TaskState::OutputsValidated)?;

        Ok((validated, resolution))
    }

    fn bind_opener(
        &self,
        request: &ExecutionRequest,
        workspace: &Workspace,
    ) -> Result<Option<ResolvedSource>> {
        let location = match (&request.opener, &workspace.opener_path) {
            (Some(explicit), Some(declared)) if explicit != declared => {
                debug!(explicit = %explicit, declared = %declared, "Opener override");
                explicit
            }
            (Some(explicit), _) => explicit,
            (None, Some(declared)) => declared,
            (None, None) => return Ok(None),
        };

        let resolved = self.resolver.resolve_opener(location)?;
        info!(opener = %location, resolution = %resolved.resolution, "Opener bound");
        Ok(Some(resolved))
    }
}

fn advance(lifecycle: &mut TaskLifecycle, next: TaskState) -> Result<()> {
    let from = lifecycle.state();
    lifecycle.advance(next)?;
    info!(from = %from, to = %next, "State transition");
    Ok(())
}

/// Add loaded samples under `datasamples`; the key is reserved
pub fn insert_loaded_data(inputs: &mut TaskInputs, data: Data) -> Result<()> {
    if inputs.contains_key(DATASAMPLES_KEY) {
        return Err(TaskError::ReservedKeyConflict(DATASAMPLES_KEY.to_string()));
    }
    inputs.insert(DATASAMPLES_KEY.to_string(), TaskInput::Data(data));
    Ok(())
}

/// Fill `rank` from the `rank` resource unless the caller already set it
pub fn with_rank(mut properties: TaskProperties, inputs: &TaskResources) -> TaskProperties {
    if properties.contains_key(RANK_PROPERTY) {
        return properties;
    }

    if let Some(rank) = inputs
        .get_static(StaticResourceId::Rank)
        .and_then(|v| v.values().first().cloned())
    {
        let value = rank
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::String(rank));
        properties.insert(RANK_PROPERTY.to_string(), value);
    }
    properties
}

/// Call user code; a panic is reported as a function failure
fn invoke(
    function: &RegisteredFunction,
    inputs: &TaskInputs,
    outputs: &TaskOutputs,
    properties: &TaskProperties,
) -> std::result::Result<(), FunctionError> {
    info!(function = %function.name(), "Invoking function");
    match catch_unwind(AssertUnwindSafe(|| function.call(inputs, outputs, properties))) {
        Ok(result) => result,
        Err(panic_info) => {
            let message = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            Err(FunctionError::failed(format!("panicked: {}", message)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::output_contract::OutputViolation;
    use crate::application::registry::RegistryError;
    use crate::application::resolver::ResolverError;
    use crate::domain::ResourceValue;
    use crate::port::data_source::mocks::{DataCall, RecordingDataSource};
    use crate::port::filesystem::mocks::MockFileSystem;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::time_provider::mocks::SteppingTimeProvider;
    use crate::port::{output_path, CodeUnit, DataSource, StaticPluginCatalog, OPENER_CAPABILITY};
    use serde_json::json;
    use std::sync::Mutex;

    struct Harness {
        fs: Arc<MockFileSystem>,
        recorder: RecordingDataSource,
        seen: Arc<Mutex<Vec<(TaskInputs, TaskOutputs, TaskProperties)>>>,
        executor: TaskExecutor,
    }

    /// `train` writes every declared output, `noop` writes nothing
    fn harness() -> Harness {
        let fs = Arc::new(MockFileSystem::new());
        let recorder = RecordingDataSource::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let writer_fs = Arc::clone(&fs);
        let writer_seen = Arc::clone(&seen);
        let registry = FunctionRegistry::builder()
            .function(
                "train",
                move |inputs: &TaskInputs, outputs: &TaskOutputs, props: &TaskProperties| {
                    writer_seen
                        .lock()
                        .unwrap()
                        .push((inputs.clone(), outputs.clone(), props.clone()));
                    for id in outputs.keys() {
                        writer_fs.add_file(output_path(outputs, id)?);
                    }
                    Ok(())
                },
            )
            .function("noop", |_: &TaskInputs, _: &TaskOutputs, _: &TaskProperties| Ok(()))
            .function("broken", |_: &TaskInputs, _: &TaskOutputs, _: &TaskProperties| {
                Err(FunctionError::failed("boom"))
            })
            .function("panics", |_: &TaskInputs, _: &TaskOutputs, _: &TaskProperties| {
                panic!("user code exploded")
            })
            .build()
            .unwrap();

        let shared = recorder.clone();
        let catalog = StaticPluginCatalog::new()
            .with_unit(CodeUnit::new("opener").with_type(
                "Opener",
                &[OPENER_CAPABILITY],
                move || Ok(Box::new(shared.clone()) as Box<dyn DataSource>),
            ))
            .unwrap();

        let executor = TaskExecutor::new(
            Arc::new(registry),
            InterfaceResolver::new(Arc::new(catalog)),
            Arc::clone(&fs) as Arc<dyn FileSystem>,
            WorkspaceDefaults::new("/work"),
        )
        .with_providers(
            Arc::new(SteppingTimeProvider::new(1_000, 250)),
            Arc::new(SequentialIdProvider::default()),
        );

        Harness {
            fs,
            recorder,
            seen,
            executor,
        }
    }

    const INPUTS: &str = r#"[
        {"id": "opener", "value": "/assets/opener.rs", "multiple": false},
        {"id": "datasamples", "value": "/data/2", "multiple": true},
        {"id": "datasamples", "value": "/data/1", "multiple": true},
        {"id": "chainkeys", "value": "/keys", "multiple": false},
        {"id": "init_model", "value": "/models/init", "multiple": false}
    ]"#;

    const OUTPUTS: &str = r#"[{"id": "model", "value": "/out/model.bin", "multiple": false}]"#;

    #[test]
    fn test_full_lifecycle() {
        let h = harness();
        let request = ExecutionRequest::new("train")
            .with_inputs(INPUTS)
            .with_outputs(OUTPUTS);

        let report = h.executor.execute(&request).unwrap();

        assert_eq!(report.task_id, "task-1");
        assert_eq!(report.state, TaskState::OutputsValidated);
        assert_eq!(report.duration_ms, 250);
        assert_eq!(report.validated_outputs, vec!["/out/model.bin".to_string()]);
        assert_eq!(
            report.resolution,
            Some(Resolution::Typed {
                type_name: "Opener".to_string()
            })
        );
        assert_eq!(
            h.recorder.calls(),
            vec![DataCall::Real(vec!["/data/2".into(), "/data/1".into()])]
        );
        assert_eq!(
            h.fs.created_dirs(),
            vec![std::path::PathBuf::from("/keys"), std::path::PathBuf::from("/out")]
        );

        let seen = h.seen.lock().unwrap();
        let (inputs, outputs, _) = &seen[0];
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs["init_model"].as_path(), Some("/models/init"));
        assert_eq!(
            inputs[DATASAMPLES_KEY].as_data(),
            Some(&json!(["/data/2", "/data/1"]))
        );
        assert_eq!(
            outputs.get("model"),
            Some(&ResourceValue::Single("/out/model.bin".to_string()))
        );
    }

    #[test]
    fn test_fake_mode_skips_folders() {
        let h = harness();
        let request = ExecutionRequest::new("train")
            .with_inputs(INPUTS)
            .with_outputs(OUTPUTS)
            .with_data_mode(DataMode::Fake { n_samples: 3 });

        h.executor.execute(&request).unwrap();

        assert_eq!(h.recorder.calls(), vec![DataCall::Fake(3)]);
    }

    #[test]
    fn test_function_error_propagates() {
        let h = harness();
        let err = h
            .executor
            .execute(&ExecutionRequest::new("broken").with_outputs(OUTPUTS))
            .unwrap_err();

        assert!(matches!(err, TaskError::Function { ref name, .. } if name == "broken"));
        assert_eq!(err.to_string(), "Function 'broken' failed: boom");
    }

    #[test]
    fn test_missing_output_fails_contract() {
        let h = harness();
        let err = h
            .executor
            .execute(&ExecutionRequest::new("noop").with_outputs(OUTPUTS))
            .unwrap_err();

        match err {
            TaskError::OutputContract { violations } => assert_eq!(
                violations,
                vec![OutputViolation::OutputMissing {
                    id: "model".into(),
                    path: "/out/model.bin".into()
                }]
            ),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_output_directory_violates_contract() {
        let h = harness();
        h.fs.add_dir("/out/model.bin");

        let err = h
            .executor
            .execute(&ExecutionRequest::new("noop").with_outputs(OUTPUTS))
            .unwrap_err();

        assert!(matches!(
            err,
            TaskError::OutputContract { ref violations }
                if matches!(violations.as_slice(), [OutputViolation::OutputIsDirectory { .. }])
        ));
    }

    #[test]
    fn test_unknown_function_fails_after_data_load() {
        let h = harness();
        let err = h
            .executor
            .execute(&ExecutionRequest::new("Train").with_inputs(INPUTS))
            .unwrap_err();

        assert!(matches!(
            err,
            TaskError::Registry(RegistryError::FunctionNotFound { .. })
        ));
        assert_eq!(h.recorder.calls().len(), 1);
    }

    #[test]
    fn test_panicking_function_is_a_function_error() {
        let h = harness();
        let err = h
            .executor
            .execute(&ExecutionRequest::new("panics"))
            .unwrap_err();

        match err {
            TaskError::Function { source, .. } => {
                assert!(source.to_string().contains("user code exploded"))
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_explicit_opener_overrides_and_unknown_fails() {
        let h = harness();
        let request = ExecutionRequest::new("train")
            .with_outputs(OUTPUTS)
            .with_opener("opener");
        let report = h.executor.execute(&request).unwrap();
        assert!(report.resolution.is_some());
        // Resource layout without datasamples: no folders
        assert_eq!(h.recorder.calls(), vec![DataCall::Real(vec![])]);

        let err = h
            .executor
            .execute(&ExecutionRequest::new("train").with_opener("/elsewhere/missing.rs"))
            .unwrap_err();
        assert!(matches!(err, TaskError::Resolver(ResolverError::UnitNotFound(_))));
    }

    #[test]
    fn test_without_opener_no_data_is_loaded() {
        let h = harness();
        let report = h
            .executor
            .execute(&ExecutionRequest::new("train").with_outputs(OUTPUTS))
            .unwrap();

        assert_eq!(report.resolution, None);
        assert!(h.recorder.calls().is_empty());
        assert!(!h.seen.lock().unwrap()[0].0.contains_key(DATASAMPLES_KEY));
    }

    #[test]
    fn test_malformed_descriptor_fails_before_side_effects() {
        let h = harness();
        let err = h
            .executor
            .execute(&ExecutionRequest::new("train").with_inputs(r#"{"id": "x"}"#))
            .unwrap_err();

        assert!(matches!(err, TaskError::Domain(_)));
        assert!(h.fs.created_dirs().is_empty());
    }

    #[test]
    fn test_rank_is_filled_from_resource() {
        let h = harness();
        let inputs = r#"[{"id": "rank", "value": "2", "multiple": false}]"#;
        h.executor
            .execute(&ExecutionRequest::new("train").with_inputs(inputs))
            .unwrap();

        let mut props = TaskProperties::new();
        props.insert("rank".to_string(), json!(7));
        h.executor
            .execute(
                &ExecutionRequest::new("train")
                    .with_inputs(inputs)
                    .with_task_properties(props),
            )
            .unwrap();

        let seen = h.seen.lock().unwrap();
        assert_eq!(seen[0].2.get("rank"), Some(&json!(2)));
        assert_eq!(seen[1].2.get("rank"), Some(&json!(7)));
        // rank is static, never a dynamic input
        assert!(!seen[0].0.contains_key("rank"));
    }

    #[test]
    fn test_reserved_datasamples_key() {
        let mut inputs = TaskInputs::new();
        inputs.insert(
            DATASAMPLES_KEY.to_string(),
            TaskInput::Resource(ResourceValue::Single("/x".into())),
        );

        assert!(matches!(
            insert_loaded_data(&mut inputs, json!([])),
            Err(TaskError::ReservedKeyConflict(key)) if key == DATASAMPLES_KEY
        ));
    }
}
