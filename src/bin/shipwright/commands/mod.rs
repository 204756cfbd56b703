//! Command implementations

pub mod build;
pub mod builders;
pub mod check;
pub mod completions;
pub mod healthcheck;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use shipwright::builder::BuilderRegistry;
use shipwright::core::{find_project, Project};
use shipwright::util::config::{global_config_path, load_config, project_config_path, Config};
use shipwright::util::Context;

/// Load the project file and user configuration into a run context.
pub fn load_context(project_file: Option<&Path>) -> Result<(Context, Config)> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    let path = match project_file {
        Some(path) => cwd.join(path),
        None => find_project(&cwd)?,
    };
    let root = path.parent().map(Path::to_path_buf).unwrap_or(cwd);

    let project = Project::load(&path)?;
    let config = load_config(global_config_path().as_deref(), &project_config_path(&root));

    tracing::debug!(project = %path.display(), "loaded project");

    let ctx = Context::new(project, Arc::new(BuilderRegistry::with_builtins()))
        .with_root(root)
        .with_parallelism(config.parallelism());
    Ok((ctx, config))
}
