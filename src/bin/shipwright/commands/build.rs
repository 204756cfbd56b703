//! `shipwright build` command

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use super::load_context;
use crate::cli::BuildArgs;
use shipwright::core::artifact::filter::by_type;
use shipwright::core::ArtifactType;
use shipwright::ops::build::{apply_defaults, host_target, BuildPipe, SkipReason};
use shipwright::ops::{record_checksums, record_sizes, write_manifest};
use shipwright::util::Cancellation;

pub fn execute(args: BuildArgs, project: Option<&Path>) -> Result<()> {
    let (ctx, config) = load_context(project)?;

    // CLI > project config > global config > default
    let parallelism = args.parallelism.unwrap_or_else(|| config.parallelism());
    let cancellation = match args.timeout.map(std::time::Duration::from_secs).or(config.timeout()) {
        Some(timeout) => Cancellation::with_timeout(timeout),
        None => Cancellation::new(),
    };

    let mut ctx = ctx
        .with_parallelism(parallelism)
        .with_selected_ids(args.ids)
        .with_skip_post_hooks(args.skip_post_hooks || config.build.skip_post_hooks)
        .with_cancellation(cancellation);

    if let Some(target) = args.single_target {
        let target = match target {
            Some(target) => target,
            None => host_target(&ctx, &apply_defaults(&ctx)?)?,
        };
        tracing::info!(target = %target, "building only for one target");
        ctx = ctx.with_partial_target(target);
    }

    let ctx = Arc::new(ctx);
    let report = BuildPipe::new().run(&ctx)?;

    record_sizes(&ctx.artifacts)?;
    record_checksums(&ctx.artifacts)?;
    let manifest = write_manifest(&ctx)?;

    for skipped in &report.skipped {
        match &skipped.reason {
            SkipReason::Disabled => eprintln!("   Skipped {} (skip is set)", skipped.id),
            SkipReason::NoMatchingTarget { requested } => {
                eprintln!("   Skipped {} (no target matches `{}`)", skipped.id, requested)
            }
        }
    }
    for reason in &report.skips {
        eprintln!("   Skipped {}", reason);
    }

    let binaries = ctx.artifacts.filter(&by_type(ArtifactType::Binary)).list();
    for artifact in &binaries {
        eprintln!("     Built {} ({})", artifact.path.display(), artifact.target);
    }
    eprintln!(
        "  Finished {} binaries, manifest at {}",
        binaries.len(),
        manifest.display()
    );

    Ok(())
}
