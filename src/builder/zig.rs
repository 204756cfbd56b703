//! Zig builder.
//!
//! Targets are zig triples (`arch-os[-abi]`, e.g. `x86_64-linux-musl`).
//! Builds run `zig build -Dtarget=<triple> -p zig-out/<triple>` and copy the
//! installed binary from `zig-out/<triple>/bin`.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Once};

use anyhow::Result;

use crate::builder::error::BuilderError;
use crate::builder::trait_def::{BuildOptions, Builder, DependingBuilder};
use crate::builder::util::{
    binary_artifact, flags, normalize_arch, normalize_os, run_toolchain, toolchain_template,
    working_dir,
};
use crate::builder::validation::{ensure_unused, GO_ONLY_FIELDS};
use crate::core::build::BuildDeclaration;
use crate::core::target::{Target, KEY_ARCH, KEY_OS};
use crate::util::context::Context;
use crate::util::fs::copy_file;

const NAME: &str = "zig";

const DEFAULT_TARGETS: &[&str] = &[
    "x86_64-linux",
    "x86_64-macos",
    "x86_64-windows",
    "aarch64-linux",
    "aarch64-macos",
];

static EXPERIMENTAL: Once = Once::new();

/// A parsed zig target triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZigTarget {
    pub target: String,
    pub arch: String,
    pub os: String,
    pub abi: String,
}

impl ZigTarget {
    pub fn parse(target: &str) -> Result<Self, BuilderError> {
        let parts: Vec<&str> = target.split('-').collect();
        if !(2..=3).contains(&parts.len()) || parts.iter().any(|p| p.is_empty()) {
            return Err(BuilderError::invalid_target(target));
        }

        Ok(ZigTarget {
            target: target.to_string(),
            arch: parts[0].to_string(),
            os: parts[1].to_string(),
            abi: parts.get(2).map(|s| s.to_string()).unwrap_or_default(),
        })
    }

    pub fn goos(&self) -> &str {
        normalize_os(&self.os)
    }

    pub fn goarch(&self) -> &str {
        normalize_arch(&self.arch)
    }
}

impl fmt::Display for ZigTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.target)
    }
}

impl Target for ZigTarget {
    fn fields(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (KEY_OS.to_string(), self.goos().to_string()),
            (KEY_ARCH.to_string(), self.goarch().to_string()),
            ("Abi".to_string(), self.abi.clone()),
        ])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The Zig builder.
#[derive(Debug, Clone, Default)]
pub struct ZigBuilder;

impl ZigBuilder {
    pub fn new() -> Self {
        ZigBuilder
    }
}

impl Builder for ZigBuilder {
    fn with_defaults(&self, mut build: BuildDeclaration) -> Result<BuildDeclaration> {
        EXPERIMENTAL.call_once(|| tracing::warn!("you are using the experimental Zig builder"));

        if build.targets.is_empty() {
            build.targets = DEFAULT_TARGETS.iter().map(|t| t.to_string()).collect();
        }
        if build.tool.is_empty() {
            build.tool = "zig".to_string();
        }
        if build.command.is_empty() {
            build.command = "build".to_string();
        }
        if build.flags.is_empty() {
            build.flags = vec!["-Doptimize=ReleaseSafe".to_string()];
        }
        if build.dir.is_empty() {
            build.dir = ".".to_string();
        }

        ensure_unused(NAME, &build, GO_ONLY_FIELDS)?;
        for target in &build.targets {
            ZigTarget::parse(target)?;
        }

        Ok(build)
    }

    fn parse(&self, target: &str) -> Result<Arc<dyn Target>> {
        Ok(Arc::new(ZigTarget::parse(target)?))
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
            .downcast_ref::<ZigTarget>()
            .ok_or_else(|| BuilderError::invalid_target(options.target.to_string()))?;

        let template = toolchain_template(ctx, build, options)?;
        let prefix = format!("zig-out/{}", target.target);

        let mut command = vec![
            template.apply(&build.tool)?,
            build.command.clone(),
            format!("-Dtarget={}", target.target),
            "-p".to_string(),
            prefix.clone(),
        ];
        command.extend(flags(&template, build)?);

        let dir = working_dir(ctx, build);
        run_toolchain(ctx, &command, template.env(), &dir)?;

        let built = dir.join(&prefix).join("bin").join(&options.name);
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
}

impl DependingBuilder for ZigBuilder {
    fn dependencies(&self) -> Vec<String> {
        vec!["zig".to_string()]
    }
}
