//! Builder trait definition and capability traits.
//!
//! The Builder trait is the mandatory contract every toolchain plugin
//! implements. Optional behavior is exposed through separate capability
//! traits, probed at the call site through the `as_*` methods, which return
//! `None` unless a builder opts in.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::core::build::BuildDeclaration;
use crate::core::target::Target;
use crate::util::context::Context;

/// Per-target options resolved by the build pipe.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Resolved target
    pub target: Arc<dyn Target>,

    /// Output file name, including the extension
    pub name: String,

    /// Absolute destination path
    pub path: PathBuf,

    /// Extension resolved for the target (`.exe`, `.so`, or empty)
    pub ext: String,
}

/// Builder trait - interface for toolchain plugins.
///
/// Builders carry no per-invocation state and may be called from many
/// threads at once.
pub trait Builder: Send + Sync {
    /// Fill unset fields with builder defaults.
    ///
    /// Must reject fields that mean nothing for this builder, and must be
    /// idempotent.
    fn with_defaults(&self, build: BuildDeclaration) -> Result<BuildDeclaration>;

    /// Parse a target string in this builder's grammar.
    fn parse(&self, target: &str) -> Result<Arc<dyn Target>>;

    /// Build one target.
    ///
    /// On success at least one artifact is added to `ctx.artifacts`; on
    /// failure nothing is.
    fn build(&self, ctx: &Context, build: &BuildDeclaration, options: &BuildOptions)
        -> Result<()>;

    /// External tools this builder needs.
    fn as_depending(&self) -> Option<&dyn DependingBuilder> {
        None
    }

    /// One-time preparation per declaration.
    fn as_prepared(&self) -> Option<&dyn PreparedBuilder> {
        None
    }

    /// Concurrency policy.
    fn as_concurrent(&self) -> Option<&dyn ConcurrentBuilder> {
        None
    }

    /// Partial target completion.
    fn as_target_fixer(&self) -> Option<&dyn TargetFixer> {
        None
    }
}

/// Builder that needs external tools on `PATH`.
pub trait DependingBuilder {
    fn dependencies(&self) -> Vec<String>;
}

/// Builder that needs a one-time, idempotent step before any target of a
/// declaration is built.
pub trait PreparedBuilder {
    fn prepare(&self, ctx: &Context, build: &BuildDeclaration) -> Result<()>;
}

/// Builder with an explicit concurrency policy.
pub trait ConcurrentBuilder {
    /// `false` forces every target of a declaration through one slot.
    fn allow_concurrent_builds(&self) -> bool;
}

/// Builder that can complete a partial target string.
pub trait TargetFixer {
    /// Best-effort completion; returns the input unchanged when unsure.
    fn fix_target(&self, target: &str) -> String;
}

/// Check whether targets of this builder may build in parallel.
///
/// Builders without an explicit policy allow it.
pub fn allows_concurrent_builds(builder: &dyn Builder) -> bool {
    builder
        .as_concurrent()
        .map_or(true, |c| c.allow_concurrent_builds())
}

/// Tools a builder depends on (empty when it declares none).
pub fn dependencies(builder: &dyn Builder) -> Vec<String> {
    builder
        .as_depending()
        .map(|d| d.dependencies())
        .unwrap_or_default()
}

/// Apply the builder's target completion, if any.
pub fn fix_target(builder: &dyn Builder, target: &str) -> String {
    match builder.as_target_fixer() {
        Some(fixer) => fixer.fix_target(target),
        None => target.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeBuilder;

    struct Minimal;

    impl Builder for Minimal {
        fn with_defaults(&self, build: BuildDeclaration) -> Result<BuildDeclaration> {
            Ok(build)
        }

        fn parse(&self, target: &str) -> Result<Arc<dyn Target>> {
            anyhow::bail!("cannot parse {target}")
        }

        fn build(&self, _: &Context, _: &BuildDeclaration, _: &BuildOptions) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_capabilities_default_to_none() {
        let builder = Minimal;
        assert!(builder.as_depending().is_none());
        assert!(builder.as_prepared().is_none());
        assert!(builder.as_concurrent().is_none());
        assert!(builder.as_target_fixer().is_none());

        assert!(allows_concurrent_builds(&builder));
        assert!(dependencies(&builder).is_empty());
        assert_eq!(fix_target(&builder, "darwin"), "darwin");
    }

    #[test]
    fn test_capabilities_probed() {
        let builder = FakeBuilder::new()
            .with_concurrency(false)
            .with_fixer()
            .with_dependencies(["fake-tool"]);

        assert!(!allows_concurrent_builds(&builder));
        assert_eq!(fix_target(&builder, "darwin"), "darwin_amd64");
        assert_eq!(dependencies(&builder), vec!["fake-tool".to_string()]);
    }
}
