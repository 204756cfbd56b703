//! Test utilities and fakes for Shipwright unit tests.
//!
//! [`FakeBuilder`] stands in for a real toolchain: it writes a small file for
//! every target instead of compiling anything, and can be configured to
//! exercise each optional capability and failure path of the build pipe.
//!
//! # Example
//!
//! ```rust,ignore
//! use shipwright::test_support::{context_with, fake_project, FakeBuilder};
//!
//! #[test]
//! fn test_example() {
//!     let fake = FakeBuilder::new().with_concurrency(false);
//!     let ctx = context_with(fake_project(), tmp.path(), fake.clone());
//!     // run the pipe, then inspect fake.state()...
//! }
//! ```

pub mod fixtures;

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{bail, Result};

use crate::builder::error::BuilderError;
use crate::builder::trait_def::{
    BuildOptions, Builder, ConcurrentBuilder, DependingBuilder, PreparedBuilder, TargetFixer,
};
use crate::builder::util::binary_artifact;
use crate::core::build::BuildDeclaration;
use crate::core::target::{Target, KEY_ARCH, KEY_OS};
use crate::util::context::Context;
use crate::util::errgroup::Skip;
use crate::util::fs::write_string;

pub use fixtures::*;

/// An `os_arch` target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeTarget {
    pub target: String,
    pub os: String,
    pub arch: String,
}

impl FakeTarget {
    /// Build a target without validation.
    pub fn new(target: &str) -> Self {
        let (os, arch) = target.split_once('_').unwrap_or((target, ""));
        FakeTarget {
            target: target.to_string(),
            os: os.to_string(),
            arch: arch.to_string(),
        }
    }

    pub fn parse(target: &str) -> Result<Self, BuilderError> {
        match target.split_once('_') {
            Some((os, arch)) if !os.is_empty() && !arch.is_empty() => Ok(Self::new(target)),
            _ => Err(BuilderError::invalid_target(target)),
        }
    }
}

impl fmt::Display for FakeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.target)
    }
}

impl Target for FakeTarget {
    fn fields(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (KEY_OS.to_string(), self.os.clone()),
            (KEY_ARCH.to_string(), self.arch.clone()),
        ])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Observations shared by every clone of a [`FakeBuilder`].
#[derive(Debug, Default)]
pub struct FakeState {
    prepared: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    built: Mutex<Vec<String>>,
}

impl FakeState {
    /// Number of `prepare` calls.
    pub fn prepared(&self) -> usize {
        self.prepared.load(Ordering::SeqCst)
    }

    /// Highest number of overlapping `build` calls seen.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Targets built successfully, in completion order.
    pub fn built(&self) -> Vec<String> {
        self.built
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Configurable fake builder.
#[derive(Debug, Clone, Default)]
pub struct FakeBuilder {
    concurrent: Option<bool>,
    fixer: bool,
    dependencies: Option<Vec<String>>,
    prepare: bool,
    fail_prepare: bool,
    fail_targets: Vec<String>,
    skip_targets: Vec<String>,
    delay: Duration,
    state: Arc<FakeState>,
}

impl FakeBuilder {
    pub fn new() -> Self {
        FakeBuilder::default()
    }

    /// Report an explicit concurrency policy.
    pub fn with_concurrency(mut self, allow: bool) -> Self {
        self.concurrent = Some(allow);
        self
    }

    /// Complete a bare OS to `<os>_amd64`.
    pub fn with_fixer(mut self) -> Self {
        self.fixer = true;
        self
    }

    pub fn with_dependencies<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = Some(tools.into_iter().map(Into::into).collect());
        self
    }

    /// Implement the preparation capability.
    pub fn with_prepare(mut self) -> Self {
        self.prepare = true;
        self
    }

    /// Implement the preparation capability, failing every time.
    pub fn failing_prepare(mut self) -> Self {
        self.prepare = true;
        self.fail_prepare = true;
        self
    }

    /// Fail the build of `target`.
    pub fn failing_target(mut self, target: impl Into<String>) -> Self {
        self.fail_targets.push(target.into());
        self
    }

    /// Skip the build of `target`.
    pub fn skipping_target(mut self, target: impl Into<String>) -> Self {
        self.skip_targets.push(target.into());
        self
    }

    /// Sleep this long inside every build.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn state(&self) -> Arc<FakeState> {
        Arc::clone(&self.state)
    }

    fn produce(&self, ctx: &Context, build: &BuildDeclaration, options: &BuildOptions) -> Result<()> {
        let target = options
            .target
            .as_any()
            .downcast_ref::<FakeTarget>()
            .ok_or_else(|| BuilderError::invalid_target(options.target.to_string()))?;

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if self.fail_targets.contains(&target.target) {
            bail!("fake failure for {}", target.target);
        }
        if self.skip_targets.contains(&target.target) {
            return Err(Skip::new(format!("fake skipped {}", target.target)).into());
        }

        write_string(&options.path, &target.target)?;
        ctx.artifacts.add(binary_artifact(
            "fake",
            build,
            options,
            &target.os,
            &target.arch,
            "",
        ));
        self.state
            .built
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(target.target.clone());
        Ok(())
    }
}

impl Builder for FakeBuilder {
    fn with_defaults(&self, mut build: BuildDeclaration) -> Result<BuildDeclaration> {
        if build.targets.is_empty() {
            build.targets = vec!["linux_amd64".to_string(), "darwin_amd64".to_string()];
        }
        Ok(build)
    }

    fn parse(&self, target: &str) -> Result<Arc<dyn Target>> {
        Ok(Arc::new(FakeTarget::parse(target)?))
    }

    fn build(&self, ctx: &Context, build: &BuildDeclaration, options: &BuildOptions) -> Result<()> {
        let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let result = self.produce(ctx, build, options);

        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn as_depending(&self) -> Option<&dyn DependingBuilder> {
        self.dependencies.as_ref().map(|_| self as &dyn DependingBuilder)
    }

    fn as_prepared(&self) -> Option<&dyn PreparedBuilder> {
        self.prepare.then_some(self as &dyn PreparedBuilder)
    }

    fn as_concurrent(&self) -> Option<&dyn ConcurrentBuilder> {
        self.concurrent.map(|_| self as &dyn ConcurrentBuilder)
    }

    fn as_target_fixer(&self) -> Option<&dyn TargetFixer> {
        self.fixer.then_some(self as &dyn TargetFixer)
    }
}

impl DependingBuilder for FakeBuilder {
    fn dependencies(&self) -> Vec<String> {
        self.dependencies.clone().unwrap_or_default()
    }
}

impl PreparedBuilder for FakeBuilder {
    fn prepare(&self, _ctx: &Context, build: &BuildDeclaration) -> Result<()> {
        self.state.prepared.fetch_add(1, Ordering::SeqCst);
        if self.fail_prepare {
            bail!("fake prepare failed for {}", build.id);
        }
        Ok(())
    }
}

impl ConcurrentBuilder for FakeBuilder {
    fn allow_concurrent_builds(&self) -> bool {
        self.concurrent.unwrap_or(true)
    }
}

impl TargetFixer for FakeBuilder {
    fn fix_target(&self, target: &str) -> String {
        if target.contains('_') {
            target.to_string()
        } else {
            format!("{target}_amd64")
        }
    }
}
