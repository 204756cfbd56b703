//! Core data structures for Shipwright.
//!
//! This module contains the foundational types used throughout Shipwright:
//! - Artifacts and the concurrency-safe artifact registry
//! - Build declarations and hooks
//! - The project file
//! - The target contract implemented by every builder

pub mod artifact;
pub mod build;
pub mod project;
pub mod target;

pub use artifact::{Artifact, ArtifactType, Artifacts};
pub use build::{BuildDeclaration, BuildHooks, BuildMode, Hook};
pub use project::{find_project, Project, PROJECT_FILE};
pub use target::{Target, KEY_ARCH, KEY_OS};
