//! Rust builder.
//!
//! Targets are rustc triples (`arch-vendor-os[-abi]`). Builds run
//! `cargo zigbuild --target=<triple>` and copy the binary out of
//! `target/<triple>/release`. Every target of a declaration is installed
//! once through `rustup target add` before building, and targets of one
//! declaration never build in parallel (they share cargo's target dir lock).

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Once};

use anyhow::{Context as _, Result};

use crate::builder::error::BuilderError;
use crate::builder::trait_def::{
    BuildOptions, Builder, ConcurrentBuilder, DependingBuilder, PreparedBuilder,
};
use crate::builder::util::{
    binary_artifact, flags, normalize_arch, run_toolchain, toolchain_template, working_dir,
};
use crate::builder::validation::{ensure_unused, GO_ONLY_FIELDS};
use crate::core::build::BuildDeclaration;
use crate::core::target::{Target, KEY_ARCH, KEY_OS};
use crate::util::context::Context;
use crate::util::fs::copy_file;
use crate::util::process::ProcessBuilder;

const NAME: &str = "rust";

const DEFAULT_TARGETS: &[&str] = &[
    "x86_64-unknown-linux-gnu",
    "x86_64-apple-darwin",
    "x86_64-pc-windows-gnu",
    "aarch64-unknown-linux-gnu",
    "aarch64-apple-darwin",
];

static EXPERIMENTAL: Once = Once::new();

/// A parsed rustc target triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RustTarget {
    pub target: String,
    pub arch: String,
    pub vendor: String,
    pub os: String,
    pub abi: String,
}

impl RustTarget {
    pub fn parse(target: &str) -> Result<Self, BuilderError> {
        let parts: Vec<&str> = target.split('-').collect();
        if parts.len() < 3 || parts.len() > 4 || parts.iter().any(|p| p.is_empty()) {
            return Err(BuilderError::invalid_target(target));
        }

        Ok(RustTarget {
            target: target.to_string(),
            arch: parts[0].to_string(),
            vendor: parts[1].to_string(),
            os: parts[2].to_string(),
            abi: parts.get(3).map(|s| s.to_string()).unwrap_or_default(),
        })
    }

    /// OS in Go naming (`apple-darwin` → `darwin`).
    pub fn goos(&self) -> &str {
        &self.os
    }

    /// Architecture in Go naming (`x86_64` → `amd64`).
    pub fn goarch(&self) -> &str {
        normalize_arch(&self.arch)
    }
}

impl fmt::Display for RustTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.target)
    }
}

impl Target for RustTarget {
    fn fields(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (KEY_OS.to_string(), self.goos().to_string()),
            (KEY_ARCH.to_string(), self.goarch().to_string()),
            ("Vendor".to_string(), self.vendor.clone()),
            ("Abi".to_string(), self.abi.clone()),
        ])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The Rust builder.
#[derive(Debug, Clone, Default)]
pub struct RustBuilder;

impl RustBuilder {
    pub fn new() -> Self {
        RustBuilder
    }
}

impl Builder for RustBuilder {
    fn with_defaults(&self, mut build: BuildDeclaration) -> Result<BuildDeclaration> {
        EXPERIMENTAL.call_once(|| tracing::warn!("you are using the experimental Rust builder"));

        if build.targets.is_empty() {
            build.targets = DEFAULT_TARGETS.iter().map(|t| t.to_string()).collect();
        }
        if build.tool.is_empty() {
            build.tool = "cargo".to_string();
        }
        if build.command.is_empty() {
            build.command = "zigbuild".to_string();
        }
        if build.flags.is_empty() {
            build.flags = vec!["--release".to_string()];
        }
        if build.dir.is_empty() {
            build.dir = ".".to_string();
        }

        ensure_unused(NAME, &build, GO_ONLY_FIELDS)?;
        for target in &build.targets {
            RustTarget::parse(target)?;
        }

        Ok(build)
    }

    fn parse(&self, target: &str) -> Result<Arc<dyn Target>> {
        Ok(Arc::new(RustTarget::parse(target)?))
    }

    fn build(
        &self,
        ctx: &Context,
        build: &BuildDeclaration,
        options: &BuildOptions,
    ) -> Result<()> {
        let target = options
            .target
            .as_any()
            .downcast_ref::<RustTarget>()
            .ok_or_else(|| BuilderError::invalid_target(options.target.to_string()))?;

        let template = toolchain_template(ctx, build, options)?;

        let mut command = vec![
            template.apply(&build.tool)?,
            build.command.clone(),
            format!("--target={}", target.target),
        ];
        command.extend(flags(&template, build)?);

        let dir = working_dir(ctx, build);
        run_toolchain(ctx, &command, template.env(), &dir)?;

        let built = dir
            .join("target")
            .join(&target.target)
            .join("release")
            .join(&options.name);
        copy_file(&built, &options.path)?;

        ctx.artifacts.add(
            binary_artifact(NAME, build, options, target.goos(), target.goarch(), "")
                .with_extra("Abi", target.abi.clone()),
        );
        Ok(())
    }

    fn as_depending(&self) -> Option<&dyn DependingBuilder> {
        Some(self)
    }

    fn as_prepared(&self) -> Option<&dyn PreparedBuilder> {
        Some(self)
    }

    fn as_concurrent(&self) -> Option<&dyn ConcurrentBuilder> {
        Some(self)
    }
}

impl DependingBuilder for RustBuilder {
    fn dependencies(&self) -> Vec<String> {
        ["cargo", "rustup", "cargo-zigbuild", "zig"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}

impl PreparedBuilder for RustBuilder {
    fn prepare(&self, ctx: &Context, build: &BuildDeclaration) -> Result<()> {
        for target in &build.targets {
            ProcessBuilder::new("rustup")
                .args(["target", "add", target.as_str()])
                .exec_and_check(&ctx.cancellation)
                .with_context(|| format!("could not add target {}", target))?;
        }
        Ok(())
    }
}

impl ConcurrentBuilder for RustBuilder {
    fn allow_concurrent_builds(&self) -> bool {
        false
    }
}
