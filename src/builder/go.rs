//! Go builder.
//!
//! Targets are `os_arch[_variant]` (`linux_amd64_v1`, `linux_arm_7`,
//! `darwin_arm64`). Builds run `go build -o <path>` with `GOOS`, `GOARCH`
//! and the matching variant variable (`GOAMD64`, `GOARM`, ...) set.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use anyhow::Result;
use regex::Regex;

use crate::builder::error::BuilderError;
use crate::builder::trait_def::{
    BuildOptions, Builder, ConcurrentBuilder, DependingBuilder, TargetFixer,
};
use crate::builder::util::{
    binary_artifact, flags, host_arch, run_toolchain, toolchain_template, working_dir,
};
use crate::core::build::BuildDeclaration;
use crate::core::target::{Target, KEY_ARCH, KEY_OS};
use crate::util::context::Context;
use crate::util::template::SliceFilter;

const NAME: &str = "go";

const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "illumos", "ios", "js", "linux", "netbsd",
    "openbsd", "plan9", "solaris", "wasip1", "windows",
];

const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "arm", "arm64", "loong64", "mips", "mips64", "mips64le", "mipsle", "ppc64",
    "ppc64le", "riscv64", "s390x", "wasm",
];

const DEFAULT_TARGETS: &[&str] = &[
    "linux_amd64_v1",
    "linux_arm64",
    "linux_386",
    "darwin_amd64_v1",
    "darwin_arm64",
    "windows_amd64_v1",
    "windows_arm64",
    "windows_386",
];

static TARGET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z0-9]+)_([a-z0-9]+)(?:_([a-zA-Z0-9.]+))?$")
        .expect("go target pattern is valid")
});

/// A parsed Go target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoTarget {
    pub target: String,
    pub os: String,
    pub arch: String,
    pub variant: String,
}

impl GoTarget {
    pub fn parse(target: &str) -> Result<Self, BuilderError> {
        let caps = TARGET_PATTERN
            .captures(target)
            .ok_or_else(|| BuilderError::invalid_target(target))?;

        let os = caps[1].to_string();
        let arch = caps[2].to_string();
        let variant = caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_default();

        if !KNOWN_OS.contains(&os.as_str()) || !KNOWN_ARCH.contains(&arch.as_str()) {
            return Err(BuilderError::invalid_target(target));
        }
        if !variant.is_empty() && !valid_variant(&arch, &variant) {
            return Err(BuilderError::invalid_target(target));
        }

        Ok(GoTarget {
            target: target.to_string(),
            os,
            arch,
            variant,
        })
    }

    /// Environment variable holding the variant for this architecture.
    fn variant_key(&self) -> Option<(&'static str, &'static str)> {
        match self.arch.as_str() {
            "amd64" => Some(("GOAMD64", "Amd64")),
            "arm" => Some(("GOARM", "Arm")),
            "arm64" => Some(("GOARM64", "Arm64")),
            "386" => Some(("GO386", "I386")),
            "mips" | "mipsle" => Some(("GOMIPS", "Mips")),
            "mips64" | "mips64le" => Some(("GOMIPS64", "Mips64")),
            "ppc64" | "ppc64le" => Some(("GOPPC64", "Ppc64")),
            "riscv64" => Some(("GORISCV64", "Riscv64")),
            _ => None,
        }
    }

    /// `GOOS`, `GOARCH` and the variant variable.
    pub fn env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::from([
            ("GOOS".to_string(), self.os.clone()),
            ("GOARCH".to_string(), self.arch.clone()),
        ]);
        if let Some((var, _)) = self.variant_key() {
            if !self.variant.is_empty() {
                env.insert(var.to_string(), self.variant.clone());
            }
        }
        env
    }
}

fn valid_variant(arch: &str, variant: &str) -> bool {
    match arch {
        "amd64" => matches!(variant, "v1" | "v2" | "v3" | "v4"),
        "arm" => matches!(variant, "5" | "6" | "7"),
        "386" => matches!(variant, "sse2" | "softfloat"),
        "mips" | "mipsle" | "mips64" | "mips64le" => matches!(variant, "hardfloat" | "softfloat"),
        _ => true,
    }
}

impl fmt::Display for GoTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.target)
    }
}

impl Target for GoTarget {
    fn fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::from([
            (KEY_OS.to_string(), self.os.clone()),
            (KEY_ARCH.to_string(), self.arch.clone()),
            ("Variant".to_string(), self.variant.clone()),
        ]);
        if let Some((_, key)) = self.variant_key() {
            fields.insert(key.to_string(), self.variant.clone());
        }
        fields
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The Go builder.
#[derive(Debug, Clone, Default)]
pub struct GoBuilder;

impl GoBuilder {
    pub fn new() -> Self {
        GoBuilder
    }
}

impl Builder for GoBuilder {
    fn with_defaults(&self, mut build: BuildDeclaration) -> Result<BuildDeclaration> {
        if build.tool.is_empty() {
            build.tool = "go".to_string();
        }
        if build.command.is_empty() {
            build.command = "build".to_string();
        }
        if build.main.is_empty() {
            build.main = ".".to_string();
        }
        if build.targets.is_empty() {
            build.targets = DEFAULT_TARGETS.iter().map(|t| t.to_string()).collect();
        }
        // `os_arch` gets the default variant; bare OS names are left to fail parsing.
        build.targets = build
            .targets
            .iter()
            .map(|t| {
                if t.contains('_') {
                    self.fix_target(t)
                } else {
                    t.clone()
                }
            })
            .collect();

        build.build_mode()?;
        for target in &build.targets {
            GoTarget::parse(target)?;
        }

        Ok(build)
    }

    fn parse(&self, target: &str) -> Result<Arc<dyn Target>> {
        Ok(Arc::new(GoTarget::parse(target)?))
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
            .downcast_ref::<GoTarget>()
            .ok_or_else(|| BuilderError::invalid_target(options.target.to_string()))?;

        let template = toolchain_template(ctx, build, options)?;
        let mut env = template.env().clone();
        env.extend(target.env());

        let mut command = vec![
            template.apply(&build.tool)?,
            build.command.clone(),
            "-o".to_string(),
            options.path.display().to_string(),
        ];
        command.extend(flags(&template, build)?);

        let ldflags = template.slice(&build.ldflags, &[SliceFilter::NonEmpty])?;
        if !ldflags.is_empty() {
            command.push(format!("-ldflags={}", ldflags.join(" ")));
        }
        let tags = template.slice(&build.tags, &[SliceFilter::NonEmpty])?;
        if !tags.is_empty() {
            command.push(format!("-tags={}", tags.join(",")));
        }
        if !build.buildmode.is_empty() {
            command.push(format!("-buildmode={}", build.buildmode));
        }
        command.push(template.apply(&build.main)?);

        run_toolchain(ctx, &command, &env, &working_dir(ctx, build))?;

        ctx.artifacts.add(binary_artifact(
            NAME,
            build,
            options,
            &target.os,
            &target.arch,
            &target.variant,
        ));
        Ok(())
    }

    fn as_depending(&self) -> Option<&dyn DependingBuilder> {
        Some(self)
    }

    fn as_concurrent(&self) -> Option<&dyn ConcurrentBuilder> {
        Some(self)
    }

    fn as_target_fixer(&self) -> Option<&dyn TargetFixer> {
        Some(self)
    }
}

impl DependingBuilder for GoBuilder {
    fn dependencies(&self) -> Vec<String> {
        vec!["go".to_string()]
    }
}

impl ConcurrentBuilder for GoBuilder {
    fn allow_concurrent_builds(&self) -> bool {
        true
    }
}

impl TargetFixer for GoBuilder {
    fn fix_target(&self, target: &str) -> String {
        let parts: Vec<&str> = target.split('_').collect();
        let (os, arch) = match parts.as_slice() {
            [os] => (*os, host_arch()),
            [os, arch] => (*os, *arch),
            _ => return target.to_string(),
        };

        match arch {
            "amd64" => format!("{os}_{arch}_v1"),
            "arm" => format!("{os}_{arch}_6"),
            _ => format!("{os}_{arch}"),
        }
    }
}
