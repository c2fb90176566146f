// Function Registry
// Catalog of named compute steps: write-once per name, read-many

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::port::{FunctionError, TaskFunction, TaskInputs, TaskOutputs, TaskProperties};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Function '{0}' is already registered")]
    DuplicateRegistration(String),

    #[error("Function '{name}' not found (registered: {})", .available.join(", "))]
    FunctionNotFound {
        name: String,
        available: Vec<String>,
    },
}

/// A named compute step
#[derive(Clone)]
pub struct RegisteredFunction {
    name: String,
    callable: TaskFunction,
}

impl RegisteredFunction {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(
        &self,
        inputs: &TaskInputs,
        outputs: &TaskOutputs,
        task_properties: &TaskProperties,
    ) -> Result<(), FunctionError> {
        (self.callable)(inputs, outputs, task_properties)
    }
}

impl fmt::Debug for RegisteredFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Registry of compute steps
///
/// Created at process start and shared read-only (behind `Arc`) once the
/// registration phase is over.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, RegisteredFunction>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> FunctionRegistryBuilder {
        FunctionRegistryBuilder::default()
    }

    /// Register `function` under `name`
    ///
    /// # Errors
    /// - `RegistryError::DuplicateRegistration` if `name` is taken; the
    ///   existing function is kept
    pub fn register<F>(&mut self, name: impl Into<String>, function: F) -> Result<(), RegistryError>
    where
        F: Fn(&TaskInputs, &TaskOutputs, &TaskProperties) -> Result<(), FunctionError>
            + Send
            + Sync
            + 'static,
    {
        self.register_function(name, Arc::new(function))
    }

    pub fn register_function(
        &mut self,
        name: impl Into<String>,
        callable: TaskFunction,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.functions.contains_key(&name) {
            return Err(RegistryError::DuplicateRegistration(name));
        }

        debug!(function = %name, "Registering function");
        self.functions
            .insert(name.clone(), RegisteredFunction { name, callable });
        Ok(())
    }

    /// Exact-name lookup
    pub fn resolve(&self, name: &str) -> Result<&RegisteredFunction, RegistryError> {
        self.functions
            .get(name)
            .ok_or_else(|| RegistryError::FunctionNotFound {
                name: name.to_string(),
                available: self.names(),
            })
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        self.functions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Collects registrations before the registry is frozen
#[derive(Default)]
pub struct FunctionRegistryBuilder {
    pending: Vec<(String, TaskFunction)>,
}

impl FunctionRegistryBuilder {
    pub fn function<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&TaskInputs, &TaskOutputs, &TaskProperties) -> Result<(), FunctionError>
            + Send
            + Sync
            + 'static,
    {
        self.pending.push((name.into(), Arc::new(function)));
        self
    }

    /// # Errors
    /// - `RegistryError::DuplicateRegistration` on the first repeated name
    pub fn build(self) -> Result<FunctionRegistry, RegistryError> {
        let mut registry = FunctionRegistry::new();
        for (name, callable) in self.pending {
            registry.register_function(name, callable)?;
        }
        Ok(registry)
    }
}
