// Plugin Catalog Port
//
// Build-time table of user code units. A unit is what a location (logical
// name or file path) resolves to: an ordered list of top-level declarations.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::port::data_source::{Data, DataSource, DataSourceError, OPENER_CAPABILITY};

/// Instantiates a declared type
pub type TypeFactory =
    Arc<dyn Fn() -> Result<Box<dyn DataSource>, DataSourceError> + Send + Sync>;

/// Free `get_data`-style function
pub type RealLoader = Arc<dyn Fn(&[String]) -> Result<Data, DataSourceError> + Send + Sync>;

/// Free `fake_data`-style function
pub type FakeLoader = Arc<dyn Fn(usize) -> Result<Data, DataSourceError> + Send + Sync>;

pub const REAL_LOADER_SIGNATURE: &str = "fn(&[String]) -> Data";
pub const FAKE_LOADER_SIGNATURE: &str = "fn(usize) -> Data";

/// A free function and its signature
#[derive(Clone)]
pub enum FreeFunction {
    LoadReal(RealLoader),
    LoadFake(FakeLoader),
    /// Any other signature; counts as a function but can never satisfy a capability
    Opaque,
}

impl FreeFunction {
    pub fn signature(&self) -> &'static str {
        match self {
            FreeFunction::LoadReal(_) => REAL_LOADER_SIGNATURE,
            FreeFunction::LoadFake(_) => FAKE_LOADER_SIGNATURE,
            FreeFunction::Opaque => "opaque",
        }
    }
}

/// One top-level item of a code unit
#[derive(Clone)]
pub enum Declaration {
    Type {
        name: String,
        capabilities: Vec<String>,
        factory: TypeFactory,
    },
    Function {
        name: String,
        function: FreeFunction,
    },
    /// Constants, imports and other items that never qualify
    Value { name: String },
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Declaration::Type { name, .. }
            | Declaration::Function { name, .. }
            | Declaration::Value { name } => name,
        }
    }

    pub fn is_type_or_function(&self) -> bool {
        !matches!(self, Declaration::Value { .. })
    }

    pub fn implements(&self, capability: &str) -> bool {
        match self {
            Declaration::Type { capabilities, .. } => capabilities.iter().any(|c| c == capability),
            _ => false,
        }
    }
}

impl fmt::Debug for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Declaration::Type {
                name, capabilities, ..
            } => f
                .debug_struct("Type")
                .field("name", name)
                .field("capabilities", capabilities)
                .finish_non_exhaustive(),
            Declaration::Function { name, function } => f
                .debug_struct("Function")
                .field("name", name)
                .field("signature", &function.signature())
                .finish(),
            Declaration::Value { name } => f.debug_struct("Value").field("name", name).finish(),
        }
    }
}

/// An importable unit of user code
#[derive(Debug, Clone)]
pub struct CodeUnit {
    location: String,
    declarations: Vec<Declaration>,
}

impl CodeUnit {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: normalize_location(&location.into()),
            declarations: Vec::new(),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Declarations in declaration order
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn with_type<F>(mut self, name: impl Into<String>, capabilities: &[&str], factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn DataSource>, DataSourceError> + Send + Sync + 'static,
    {
        self.declarations.push(Declaration::Type {
            name: name.into(),
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
            factory: Arc::new(factory),
        });
        self
    }

    /// Declare `T` as an opener type built with `T::default()`
    pub fn with_data_source<T>(self, name: impl Into<String>) -> Self
    where
        T: DataSource + Default + 'static,
    {
        self.with_type(name, &[OPENER_CAPABILITY], || {
            Ok(Box::new(T::default()) as Box<dyn DataSource>)
        })
    }

    pub fn with_real_loader<F>(mut self, name: impl Into<String>, loader: F) -> Self
    where
        F: Fn(&[String]) -> Result<Data, DataSourceError> + Send + Sync + 'static,
    {
        self.declarations.push(Declaration::Function {
            name: name.into(),
            function: FreeFunction::LoadReal(Arc::new(loader)),
        });
        self
    }

    pub fn with_fake_loader<F>(mut self, name: impl Into<String>, loader: F) -> Self
    where
        F: Fn(usize) -> Result<Data, DataSourceError> + Send + Sync + 'static,
    {
        self.declarations.push(Declaration::Function {
            name: name.into(),
            function: FreeFunction::LoadFake(Arc::new(loader)),
        });
        self
    }

    pub fn with_opaque_function(mut self, name: impl Into<String>) -> Self {
        self.declarations.push(Declaration::Function {
            name: name.into(),
            function: FreeFunction::Opaque,
        });
        self
    }

    pub fn with_value(mut self, name: impl Into<String>) -> Self {
        self.declarations.push(Declaration::Value { name: name.into() });
        self
    }

    /// First free function named `name`
    pub fn function(&self, name: &str) -> Option<&FreeFunction> {
        self.declarations.iter().find_map(|d| match d {
            Declaration::Function { name: n, function } if n == name => Some(function),
            _ => None,
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Code unit already registered at location: {0}")]
    DuplicateLocation(String),
}

/// Source of code units
pub trait PluginCatalog: Send + Sync {
    /// Find the unit for `location`
    fn lookup(&self, location: &str) -> Option<Arc<CodeUnit>>;

    /// Registered locations, sorted
    fn locations(&self) -> Vec<String>;
}

/// In-memory catalog filled at process start
///
/// Lookup tries the normalized location first, then its file stem, so
/// `/tasks/assets/opener.rs` finds a unit registered as `opener`.
#[derive(Debug, Default)]
pub struct StaticPluginCatalog {
    units: BTreeMap<String, Arc<CodeUnit>>,
}

impl StaticPluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, unit: CodeUnit) -> Result<(), CatalogError> {
        let location = unit.location().to_string();
        if self.units.contains_key(&location) {
            return Err(CatalogError::DuplicateLocation(location));
        }
        self.units.insert(location, Arc::new(unit));
        Ok(())
    }

    pub fn with_unit(mut self, unit: CodeUnit) -> Result<Self, CatalogError> {
        self.register(unit)?;
        Ok(self)
    }
}

impl PluginCatalog for StaticPluginCatalog {
    fn lookup(&self, location: &str) -> Option<Arc<CodeUnit>> {
        let normalized = normalize_location(location);
        if let Some(unit) = self.units.get(&normalized) {
            return Some(Arc::clone(unit));
        }

        Path::new(&normalized)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| self.units.get(stem))
            .cloned()
    }

    fn locations(&self) -> Vec<String> {
        self.units.keys().cloned().collect()
    }
}

fn normalize_location(location: &str) -> String {
    location.replace('\\', "/")
}
