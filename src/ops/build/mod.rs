//! The build pipe.
//!
//! Turns the project's build declarations into binary artifacts:
//!
//! 1. default every declaration and check ID uniqueness
//! 2. drop declarations whose `skip` template is true
//! 3. run the builder's one-time preparation, if it has one
//! 4. pick the targets to build (all of them, or one in a targeted rebuild)
//! 5. schedule one unit of work per target on a bounded group
//!
//! Declarations whose builder forbids concurrent builds take a single slot of
//! the shared group and build their targets one by one inside it.

pub mod defaults;
pub mod error;
pub mod hooks;
pub mod options;
pub mod targets;

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::builder::trait_def::{allows_concurrent_builds, Builder};
use crate::core::build::BuildDeclaration;
use crate::util::context::Context;
use crate::util::errgroup::{is_skip, Skip, SkipAwareGroup};
use crate::util::fs::ensure_dir;
use crate::util::template::Template;

pub use defaults::apply_defaults;
pub use error::PipeError;
pub use options::{build_options_for_target, ext_for};
pub use targets::{host_target, select_targets};

/// Why a declaration produced nothing without failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The `skip` template evaluated to true
    Disabled,

    /// Targeted rebuild found no matching target
    NoMatchingTarget { requested: String },
}

/// A declaration that was not scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedBuild {
    pub id: String,
    pub reason: SkipReason,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Number of target builds scheduled
    pub scheduled: usize,

    /// Declarations excluded before scheduling
    pub skipped: Vec<SkippedBuild>,

    /// Reasons given by builders that skipped a target
    pub skips: Vec<String>,
}

impl BuildReport {
    /// Declarations skipped for the given reason.
    pub fn skipped_ids(&self, reason: &SkipReason) -> Vec<&str> {
        self.skipped
            .iter()
            .filter(|s| &s.reason == reason)
            .map(|s| s.id.as_str())
            .collect()
    }
}

struct Planned {
    build: Arc<BuildDeclaration>,
    builder: Arc<dyn Builder>,
    targets: Vec<String>,
}

/// The build pipe.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildPipe;

impl BuildPipe {
    pub fn new() -> Self {
        BuildPipe
    }

    /// Build every selected declaration, adding artifacts to `ctx.artifacts`.
    ///
    /// Configuration errors fail before anything is built. After that, the
    /// first failing target decides the result; other targets still run to
    /// completion.
    pub fn run(&self, ctx: &Arc<Context>) -> Result<BuildReport> {
        let builds = apply_defaults(ctx)?;
        for id in &ctx.selected_ids {
            if !builds.iter().any(|b| &b.id == id) {
                bail!("no builds with the ID '{id}'");
            }
        }

        let mut report = BuildReport::default();
        let mut plans = Vec::new();
        for build in builds {
            if !ctx.selected_ids.is_empty() && !ctx.selected_ids.contains(&build.id) {
                tracing::debug!(id = %build.id, "not selected");
                continue;
            }

            if should_skip(ctx, &build)? {
                tracing::info!(id = %build.id, "skip is set");
                report.skipped.push(SkippedBuild {
                    id: build.id,
                    reason: SkipReason::Disabled,
                });
                continue;
            }

            let builder = ctx.builders.get(&build.builder);
            let targets = select_targets(ctx, builder.as_ref(), &build);
            if targets.is_empty() {
                if let Some(requested) = &ctx.partial_target {
                    tracing::info!(id = %build.id, target = %requested, "no matching target, skipping");
                    report.skipped.push(SkippedBuild {
                        id: build.id,
                        reason: SkipReason::NoMatchingTarget {
                            requested: requested.clone(),
                        },
                    });
                }
                continue;
            }

            plans.push(Planned {
                build: Arc::new(build),
                builder,
                targets,
            });
        }

        let mut group = SkipAwareGroup::new(ctx.parallelism)?;
        for plan in plans {
            report.scheduled += plan.targets.len();
            schedule(ctx, &mut group, plan);
        }

        let skips = group.wait()?;
        report.skips = skips
            .iter()
            .flat_map(|skip| skip.reasons().iter().cloned())
            .collect();
        Ok(report)
    }
}

fn should_skip(ctx: &Context, build: &BuildDeclaration) -> Result<bool> {
    let skip = Template::new(ctx)
        .with_env(&build.env)
        .and_then(|template| template.bool(&build.skip))
        .map_err(|source| PipeError::Config {
            id: build.id.clone(),
            source: source.into(),
        })?;
    Ok(skip)
}

fn schedule(ctx: &Arc<Context>, group: &mut SkipAwareGroup, plan: Planned) {
    let Planned {
        build,
        builder,
        targets,
    } = plan;

    if let Some(prepared) = builder.as_prepared() {
        tracing::info!(id = %build.id, builder = %build.builder, "preparing");
        if let Err(source) = prepared.prepare(ctx, &build) {
            let err = PipeError::Prepare {
                id: build.id.clone(),
                source,
            };
            group.go(move || Err(err.into()));
            return;
        }
    }

    if allows_concurrent_builds(builder.as_ref()) {
        for target in targets {
            let ctx = Arc::clone(ctx);
            let build = Arc::clone(&build);
            let builder = Arc::clone(&builder);
            group.go(move || build_target(&ctx, builder.as_ref(), &build, &target));
        }
        return;
    }

    let ctx = Arc::clone(ctx);
    group.go(move || {
        let mut serial = SkipAwareGroup::new(1)?;
        for target in targets {
            let ctx = Arc::clone(&ctx);
            let build = Arc::clone(&build);
            let builder = Arc::clone(&builder);
            serial.go(move || build_target(&ctx, builder.as_ref(), &build, &target));
        }

        let skips = serial.wait()?;
        if skips.is_empty() {
            Ok(())
        } else {
            Err(Skip::merge(skips).into())
        }
    });
}

/// One unit of work: resolve, pre hooks, build, post hooks.
fn build_target(
    ctx: &Context,
    builder: &dyn Builder,
    build: &BuildDeclaration,
    target: &str,
) -> Result<()> {
    let id = || build.id.clone();
    let target_name = || target.to_string();

    let options = builder
        .parse(target)
        .and_then(|resolved| build_options_for_target(ctx, build, resolved))
        .map_err(|source| PipeError::Target {
            id: id(),
            target: target_name(),
            source,
        })?;

    if let Some(dir) = options.path.parent() {
        ensure_dir(dir).map_err(|source| PipeError::Output {
            id: id(),
            target: target_name(),
            source,
        })?;
    }

    tracing::info!(id = %build.id, target = %target, path = %options.path.display(), "building");

    hooks::run_hooks(ctx, build, &options, &build.hooks.pre).map_err(|source| {
        PipeError::PreHook {
            id: id(),
            target: target_name(),
            source,
        }
    })?;

    builder.build(ctx, build, &options).map_err(|source| {
        if is_skip(&source) {
            source
        } else {
            PipeError::Build {
                id: id(),
                target: target_name(),
                source,
            }
            .into()
        }
    })?;

    if ctx.skip_post_hooks {
        tracing::debug!(id = %build.id, target = %target, "skipping post hooks");
        return Ok(());
    }

    hooks::run_hooks(ctx, build, &options, &build.hooks.post).map_err(|source| {
        PipeError::PostHook {
            id: id(),
            target: target_name(),
            source,
        }
    })?;

    Ok(())
}
