//! Execution context for a Shipwright run.
//!
//! The context is built once per invocation and shared (behind an `Arc`) by
//! every unit of work the build pipe schedules. It owns the artifact registry
//! and a handle to the builder registry, so builders never reach for global
//! state.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::builder::BuilderRegistry;
use crate::core::artifact::Artifacts;
use crate::core::project::Project;
use crate::util::config::default_parallelism;
use crate::util::process::Cancellation;

/// Shared state of one run.
#[derive(Debug, Clone)]
pub struct Context {
    /// The loaded project
    pub project: Project,

    /// Directory the project file lives in; relative paths resolve against it
    pub root: PathBuf,

    /// Process environment plus project-level `env`
    pub env: BTreeMap<String, String>,

    /// Produced outputs
    pub artifacts: Artifacts,

    /// Available builders
    pub builders: Arc<BuilderRegistry>,

    /// Maximum number of targets built at once
    pub parallelism: usize,

    /// Targeted rebuild: only build the target matching this string
    pub partial_target: Option<String>,

    /// Only run these declaration IDs (empty = all)
    pub selected_ids: Vec<String>,

    /// Never run post hooks
    pub skip_post_hooks: bool,

    /// Cancellation observed by every external process
    pub cancellation: Cancellation,
}

impl Context {
    /// Create a context for `project` using the given builders.
    ///
    /// The environment is the process environment overlaid with the project's
    /// `KEY=VALUE` entries.
    pub fn new(project: Project, builders: Arc<BuilderRegistry>) -> Self {
        let mut env: BTreeMap<String, String> = std::env::vars().collect();
        for entry in &project.env {
            match entry.split_once('=') {
                Some((key, value)) => {
                    env.insert(key.to_string(), value.to_string());
                }
                None => tracing::warn!(entry = %entry, "ignoring env entry without `=`"),
            }
        }

        let root = std::env::current_dir().unwrap_or_default();

        Context {
            project,
            root,
            env,
            artifacts: Artifacts::new(),
            builders,
            parallelism: default_parallelism(),
            partial_target: None,
            selected_ids: Vec::new(),
            skip_post_hooks: false,
            cancellation: Cancellation::new(),
        }
    }

    /// Set the project root.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Set the parallelism (at least one).
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// Enable targeted rebuild mode.
    pub fn with_partial_target(mut self, target: impl Into<String>) -> Self {
        self.partial_target = Some(target.into());
        self
    }

    /// Restrict the run to the given declaration IDs.
    pub fn with_selected_ids(mut self, ids: Vec<String>) -> Self {
        self.selected_ids = ids;
        self
    }

    /// Skip post hooks.
    pub fn with_skip_post_hooks(mut self, skip: bool) -> Self {
        self.skip_post_hooks = skip;
        self
    }

    /// Use the given cancellation signal.
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Environment as `KEY=VALUE` entries.
    pub fn env_entries(&self) -> Vec<String> {
        self.env.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }
}
