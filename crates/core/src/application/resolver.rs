// Interface Resolver
//
// Binds a location to one DataSource. Strategies, tried in order:
// 1. Typed: the first declared type implementing the capability
// 2. FreeFunctions: top-level functions matching a signature list (legacy)

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::port::plugin_catalog::{
    FakeLoader, RealLoader, FAKE_LOADER_SIGNATURE, REAL_LOADER_SIGNATURE,
};
use crate::port::{
    CodeUnit, Data, DataSource, DataSourceError, Declaration, FreeFunction, FunctionSignatures,
    PluginCatalog, OPENER_CAPABILITY, OPENER_FUNCTIONS,
};

#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("No code unit registered for location '{0}'")]
    UnitNotFound(String),

    #[error("Code unit '{location}' declares no type or function")]
    EmptyInterface { location: String },

    #[error("Code unit '{location}' does not implement '{capability}': missing {}", .missing.join(", "))]
    InvalidInterface {
        location: String,
        capability: String,
        missing: Vec<String>,
    },

    #[error("Function '{name}' in '{location}' has signature {found}, expected {expected}")]
    SignatureMismatch {
        location: String,
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Failed to instantiate '{type_name}' from '{location}': {source}")]
    Instantiation {
        location: String,
        type_name: String,
        #[source]
        source: DataSourceError,
    },
}

/// Which strategy produced the binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Typed { type_name: String },
    FreeFunctions,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Typed { type_name } => write!(f, "type {}", type_name),
            Resolution::FreeFunctions => write!(f, "free functions"),
        }
    }
}

/// A bound data source and how it was found
pub struct ResolvedSource {
    pub source: Box<dyn DataSource>,
    pub resolution: Resolution,
}

impl fmt::Debug for ResolvedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedSource")
            .field("resolution", &self.resolution)
            .finish_non_exhaustive()
    }
}

/// Adapter over free `get_data` / `fake_data` functions
pub struct FreeFunctionSource {
    load_real: RealLoader,
    load_fake: FakeLoader,
}

impl DataSource for FreeFunctionSource {
    fn load_real(&self, folders: &[String]) -> Result<Data, DataSourceError> {
        (self.load_real)(folders)
    }

    fn load_fake(&self, n_samples: usize) -> Result<Data, DataSourceError> {
        (self.load_fake)(n_samples)
    }
}

/// Resolves locations through a plugin catalog
///
/// Factories run on every call, so resolving the same location twice yields
/// two independent but identical sources.
pub struct InterfaceResolver {
    catalog: Arc<dyn PluginCatalog>,
}

impl InterfaceResolver {
    pub fn new(catalog: Arc<dyn PluginCatalog>) -> Self {
        Self { catalog }
    }

    /// Resolve an opener: typed capability first, `get_data`/`fake_data` fallback
    pub fn resolve_opener(&self, location: &str) -> Result<ResolvedSource, ResolverError> {
        self.resolve(location, OPENER_CAPABILITY, Some(&OPENER_FUNCTIONS))
    }

    /// # Errors
    /// - `ResolverError::UnitNotFound` if the catalog has no unit for `location`
    /// - see [`resolve_unit`]
    pub fn resolve(
        &self,
        location: &str,
        capability: &str,
        fallback: Option<&FunctionSignatures>,
    ) -> Result<ResolvedSource, ResolverError> {
        let unit = self
            .catalog
            .lookup(location)
            .ok_or_else(|| ResolverError::UnitNotFound(location.to_string()))?;

        resolve_unit(&unit, capability, fallback)
    }
}

/// Resolve `capability` within one code unit
///
/// When several types qualify, the first in declaration order wins.
///
/// # Errors
/// - `ResolverError::EmptyInterface` if no declaration is a type or function
/// - `ResolverError::InvalidInterface` listing every missing name
/// - `ResolverError::SignatureMismatch` if a fallback name has the wrong shape
/// - `ResolverError::Instantiation` if the chosen type fails to build
pub fn resolve_unit(
    unit: &CodeUnit,
    capability: &str,
    fallback: Option<&FunctionSignatures>,
) -> Result<ResolvedSource, ResolverError> {
    let location = unit.location();

    if !unit
        .declarations()
        .iter()
        .any(Declaration::is_type_or_function)
    {
        return Err(ResolverError::EmptyInterface {
            location: location.to_string(),
        });
    }

    let mut qualifying = unit.declarations().iter().filter_map(|d| match d {
        Declaration::Type { name, factory, .. } if d.implements(capability) => {
            Some((name, factory))
        }
        _ => None,
    });

    if let Some((type_name, factory)) = qualifying.next() {
        let skipped: Vec<&String> = qualifying.map(|(name, _)| name).collect();
        if !skipped.is_empty() {
            debug!(
                location = %location,
                chosen = %type_name,
                skipped = ?skipped,
                "Several types implement the capability, using the first declared"
            );
        }

        let source = factory().map_err(|source| ResolverError::Instantiation {
            location: location.to_string(),
            type_name: type_name.clone(),
            source,
        })?;

        info!(location = %location, type_name = %type_name, capability = %capability, "Resolved typed implementation");
        return Ok(ResolvedSource {
            source,
            resolution: Resolution::Typed {
                type_name: type_name.clone(),
            },
        });
    }

    match fallback {
        Some(signatures) => resolve_free_functions(unit, capability, signatures),
        None => Err(ResolverError::InvalidInterface {
            location: location.to_string(),
            capability: capability.to_string(),
            missing: vec![format!("a type implementing '{}'", capability)],
        }),
    }
}

fn resolve_free_functions(
    unit: &CodeUnit,
    capability: &str,
    signatures: &FunctionSignatures,
) -> Result<ResolvedSource, ResolverError> {
    let missing: Vec<String> = signatures
        .names()
        .iter()
        .filter(|name| unit.function(name).is_none())
        .map(|name| name.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(ResolverError::InvalidInterface {
            location: unit.location().to_string(),
            capability: capability.to_string(),
            missing,
        });
    }

    let load_real = match unit.function(signatures.load_real) {
        Some(FreeFunction::LoadReal(loader)) => Arc::clone(loader),
        other => {
            return Err(mismatch(unit, signatures.load_real, REAL_LOADER_SIGNATURE, other));
        }
    };
    let load_fake = match unit.function(signatures.load_fake) {
        Some(FreeFunction::LoadFake(loader)) => Arc::clone(loader),
        other => {
            return Err(mismatch(unit, signatures.load_fake, FAKE_LOADER_SIGNATURE, other));
        }
    };

    info!(location = %unit.location(), capability = %capability, "Resolved free-function implementation");
    Ok(ResolvedSource {
        source: Box::new(FreeFunctionSource {
            load_real,
            load_fake,
        }),
        resolution: Resolution::FreeFunctions,
    })
}

fn mismatch(
    unit: &CodeUnit,
    name: &str,
    expected: &'static str,
    found: Option<&FreeFunction>,
) -> ResolverError {
    ResolverError::SignatureMismatch {
        location: unit.location().to_string(),
        name: name.to_string(),
        expected,
        found: found.map(FreeFunction::signature).unwrap_or("missing"),
    }
}
