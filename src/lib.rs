//! Shipwright - a release-engineering build orchestrator
//!
//! This crate provides the core library functionality for Shipwright:
//! the builder plugin contract and registry, the bounded build scheduler,
//! and the artifact registry consumed by every later release stage.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

/// Test utilities and fakes for Shipwright unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides a configurable fake builder and project fixtures.
#[cfg(test)]
pub mod test_support;

pub use builder::{Builder, BuilderRegistry};
pub use core::{
    artifact::{Artifact, ArtifactType, Artifacts},
    build::BuildDeclaration,
    project::Project,
    target::Target,
};
pub use ops::build::{BuildPipe, BuildReport};
pub use util::context::Context;
