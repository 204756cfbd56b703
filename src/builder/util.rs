//! Shared utilities for the built-in builders.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::builder::trait_def::BuildOptions;
use crate::core::artifact::{
    Artifact, ArtifactType, EXTRA_BINARY, EXTRA_BUILDER, EXTRA_EXT, EXTRA_ID,
};
use crate::core::build::BuildDeclaration;
use crate::util::context::Context;
use crate::util::process::ProcessBuilder;
use crate::util::template::{SliceFilter, Template};

/// Map toolchain architecture names to Go naming.
pub fn normalize_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "i386" | "i586" | "i686" | "x86" => "386",
        "powerpc" => "ppc",
        "powerpc64" => "ppc64",
        "powerpc64le" => "ppc64le",
        "armv7" => "arm",
        "wasm32" => "wasm",
        other => other,
    }
}

/// Map toolchain OS names to Go naming.
pub fn normalize_os(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

/// Operating system of the running machine, in Go naming.
pub fn host_os() -> &'static str {
    normalize_os(std::env::consts::OS)
}

/// Architecture of the running machine, in Go naming.
pub fn host_arch() -> &'static str {
    normalize_arch(std::env::consts::ARCH)
}

/// Binary artifact for a finished build, with the reserved extras set.
pub fn binary_artifact(
    builder: &str,
    build: &BuildDeclaration,
    options: &BuildOptions,
    os: &str,
    arch: &str,
    variant: &str,
) -> Artifact {
    let binary = options
        .name
        .strip_suffix(options.ext.as_str())
        .unwrap_or(&options.name)
        .to_string();

    Artifact::new(ArtifactType::Binary, options.name.clone(), options.path.clone())
        .with_platform(os, arch, variant)
        .with_target(options.target.to_string())
        .with_extra(EXTRA_BINARY, binary)
        .with_extra(EXTRA_EXT, options.ext.clone())
        .with_extra(EXTRA_ID, build.id.clone())
        .with_extra(EXTRA_BUILDER, builder)
}

/// Template and environment for a toolchain invocation: the run
/// environment plus the declaration's templated `env`.
pub fn toolchain_template(
    ctx: &Context,
    build: &BuildDeclaration,
    options: &BuildOptions,
) -> Result<Template> {
    Ok(Template::new(ctx)
        .with_build_options(options)
        .with_env(&build.env)?)
}

/// Expand the declaration's flags, dropping empty ones.
pub fn flags(template: &Template, build: &BuildDeclaration) -> Result<Vec<String>> {
    Ok(template.slice(&build.flags, &[SliceFilter::NonEmpty])?)
}

/// Working directory for the toolchain.
pub fn working_dir(ctx: &Context, build: &BuildDeclaration) -> PathBuf {
    if build.dir.is_empty() {
        ctx.root.clone()
    } else {
        ctx.root.join(&build.dir)
    }
}

/// Run a toolchain command under the run's cancellation.
///
/// Only `env` is passed to the process.
pub fn run_toolchain(
    ctx: &Context,
    command: &[String],
    env: &BTreeMap<String, String>,
    dir: &Path,
) -> Result<()> {
    let Some((program, args)) = command.split_first() else {
        bail!("empty toolchain command");
    };

    let process = ProcessBuilder::new(program)
        .args(args)
        .env_clear()
        .envs(env)
        .cwd(dir);

    tracing::debug!(cmd = %process.display_command(), dir = %dir.display(), "running");
    let output = process.exec_and_check(&ctx.cancellation)?;
    if !output.trim().is_empty() {
        tracing::debug!("{}", output.trim_end());
    }
    Ok(())
}
