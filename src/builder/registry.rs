//! Builder registry - name to builder mapping.
//!
//! Key principle: lookup never fails. Unknown names resolve to an
//! [`InvalidBuilder`] whose every operation reports the name, so defaulting,
//! parsing and building share one error path.
//!
//! The registry is constructed explicitly (usually through
//! [`BuilderRegistry::with_builtins`]) before any run starts, then shared
//! through the run context.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::builder::go::GoBuilder;
use crate::builder::invalid::InvalidBuilder;
use crate::builder::rust::RustBuilder;
use crate::builder::trait_def::Builder;
use crate::builder::zig::ZigBuilder;

/// Name of the builder used when a declaration does not set one.
pub const DEFAULT_BUILDER: &str = "go";

/// Registry of available builders.
pub struct BuilderRegistry {
    builders: RwLock<HashMap<String, Arc<dyn Builder>>>,
}

impl BuilderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        BuilderRegistry {
            builders: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry with the built-in builders (`go`, `rust`, `zig`).
    ///
    /// This always succeeds - no I/O or detection happens here.
    pub fn with_builtins() -> Self {
        let registry = BuilderRegistry::new();
        registry.register("go", Arc::new(GoBuilder::new()));
        registry.register("rust", Arc::new(RustBuilder::new()));
        registry.register("zig", Arc::new(ZigBuilder::new()));
        registry
    }

    /// Register a builder. Re-registering a name replaces the previous one.
    pub fn register(&self, name: impl Into<String>, builder: Arc<dyn Builder>) {
        let name = name.into();
        tracing::debug!(builder = %name, "registering builder");
        self.builders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, builder);
    }

    /// Look up a builder by name.
    ///
    /// Never fails: unknown names get an [`InvalidBuilder`].
    pub fn get(&self, name: &str) -> Arc<dyn Builder> {
        let builders = self.builders.read().unwrap_or_else(PoisonError::into_inner);
        match builders.get(name) {
            Some(builder) => Arc::clone(builder),
            None => Arc::new(InvalidBuilder::new(name)),
        }
    }

    /// Check if a builder is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.builders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .builders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Get the number of registered builders.
    pub fn len(&self) -> usize {
        self.builders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BuilderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BuilderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuilderRegistry")
            .field("builders", &self.names())
            .finish()
    }
}

/// Summary of a builder for display purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderSummary {
    /// Registered name
    pub name: String,

    /// External tools the builder needs
    pub dependencies: Vec<String>,

    /// Whether targets may build in parallel
    pub concurrent: bool,

    /// Whether the builder runs a preparation step
    pub prepares: bool,

    /// Whether partial targets can be completed
    pub fixes_targets: bool,
}

impl BuilderSummary {
    /// Create a summary by probing a builder's capabilities.
    pub fn from_builder(name: impl Into<String>, builder: &dyn Builder) -> Self {
        BuilderSummary {
            name: name.into(),
            dependencies: crate::builder::trait_def::dependencies(builder),
            concurrent: crate::builder::trait_def::allows_concurrent_builds(builder),
            prepares: builder.as_prepared().is_some(),
            fixes_targets: builder.as_target_fixer().is_some(),
        }
    }
}

/// Get summaries of every registered builder, sorted by name.
pub fn get_builder_summaries(registry: &BuilderRegistry) -> Vec<BuilderSummary> {
    registry
        .names()
        .into_iter()
        .map(|name| {
            let builder = registry.get(&name);
            BuilderSummary::from_builder(name, builder.as_ref())
        })
        .collect()
}
