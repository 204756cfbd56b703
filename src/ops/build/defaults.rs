//! Default pass over the project's build declarations.

use anyhow::Result;

use crate::builder::DEFAULT_BUILDER;
use crate::core::build::BuildDeclaration;
use crate::ops::build::error::PipeError;
use crate::util::context::Context;
use crate::util::ids::Ids;
use crate::util::template::expand_process_env;

/// Default every declaration of the project.
///
/// A project without declarations gets one default declaration. Fails on
/// the first declaration its builder rejects, then on duplicate IDs.
pub fn apply_defaults(ctx: &Context) -> Result<Vec<BuildDeclaration>> {
    let declared = if ctx.project.builds.is_empty() {
        vec![BuildDeclaration::default()]
    } else {
        ctx.project.builds.clone()
    };

    let mut ids = Ids::new("build");
    let mut builds = Vec::with_capacity(declared.len());
    for build in declared {
        let build = build_with_defaults(ctx, build)?;
        ids.inc(&build.id);
        builds.push(build);
    }
    ids.validate().map_err(PipeError::from)?;

    Ok(builds)
}

fn build_with_defaults(ctx: &Context, mut build: BuildDeclaration) -> Result<BuildDeclaration> {
    let project_name = &ctx.project.project_name;

    if build.builder.is_empty() {
        build.builder = DEFAULT_BUILDER.to_string();
    }
    if build.binary.is_empty() {
        build.binary = project_name.clone();
    }
    if build.id.is_empty() {
        build.id = project_name.clone();
    }
    for entry in &mut build.env {
        *entry = expand_process_env(entry);
    }

    let id = build.id.clone();
    let builder = ctx.builders.get(&build.builder);
    let build = builder
        .with_defaults(build)
        .map_err(|source| PipeError::Config { id, source })?;

    tracing::debug!(id = %build.id, builder = %build.builder, targets = ?build.targets, "defaulted");
    Ok(build)
}
