//! High-level operations.
//!
//! This module contains the implementation of Shipwright commands.

pub mod build;
pub mod healthcheck;
pub mod metadata;

pub use build::{BuildPipe, BuildReport, PipeError, SkipReason, SkippedBuild};
pub use healthcheck::{format_report, healthcheck, HealthReport, ToolCheck};
pub use metadata::{record_checksums, record_sizes, write_manifest, ARTIFACTS_FILE};
