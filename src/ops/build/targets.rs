//! Target selection for a declaration.
//!
//! A normal run schedules every configured target. A targeted rebuild
//! schedules only the one matching the requested partial target, after the
//! builder had a chance to complete it.

use anyhow::{bail, Result};

use crate::builder::trait_def::{fix_target, Builder};
use crate::builder::util::{host_arch, host_os};
use crate::core::build::BuildDeclaration;
use crate::util::context::Context;

/// Environment variable that overrides the host target in targeted rebuilds.
pub const TARGET_ENV: &str = "TARGET";

/// Targets of `build` to schedule in this run.
///
/// Returns an empty list (not an error) when a targeted rebuild matches
/// nothing.
pub fn select_targets(ctx: &Context, builder: &dyn Builder, build: &BuildDeclaration) -> Vec<String> {
    let Some(partial) = ctx.partial_target.as_deref() else {
        return build.targets.clone();
    };

    let wanted = fix_target(builder, partial);
    let selected: Vec<String> = build
        .targets
        .iter()
        .filter(|target| **target == wanted)
        .take(1)
        .cloned()
        .collect();

    if selected.is_empty() {
        tracing::debug!(id = %build.id, target = %wanted, "no matching target");
    }
    selected
}

/// Work out which target a targeted rebuild of the host should use.
///
/// `TARGET` wins when set. Go declarations use the host `os_arch`; other
/// builders get the first configured target naming the host OS and
/// architecture in their own spelling.
pub fn host_target(ctx: &Context, builds: &[BuildDeclaration]) -> Result<String> {
    if let Some(target) = ctx.env.get(TARGET_ENV).filter(|t| !t.is_empty()) {
        return Ok(target.clone());
    }

    for build in builds {
        if build.builder == "go" {
            return Ok(format!("{}_{}", host_os(), host_arch()));
        }
        if let Some(target) = find_runtime(&build.targets, host_os(), host_arch()) {
            tracing::info!(target = %target, "using target based on runtime");
            return Ok(target);
        }
    }

    bail!("could not set up the target filter, maybe set {TARGET_ENV}=[something]")
}

fn os_aliases(os: &str) -> &'static [&'static str] {
    match os {
        "darwin" => &["macos", "darwin"],
        "linux" => &["linux"],
        "windows" => &["windows"],
        _ => &[],
    }
}

fn arch_aliases(arch: &str) -> &'static [&'static str] {
    match arch {
        "arm64" => &["aarch64"],
        "amd64" => &["x86_64"],
        "386" => &["i686", "i586", "i386"],
        _ => &[],
    }
}

fn find_runtime(targets: &[String], os: &str, arch: &str) -> Option<String> {
    let oses = os_aliases(os);
    let arches = arch_aliases(arch);

    targets
        .iter()
        .find(|target| {
            let parts: Vec<&str> = target.split('-').collect();
            oses.iter().any(|o| parts.contains(o)) && arches.iter().any(|a| parts.contains(a))
        })
        .cloned()
}
