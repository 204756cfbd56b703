//! Builder plugins.
//!
//! A builder turns one build declaration and one target into artifacts.
//! This module holds the plugin contract, the name-keyed registry and the
//! built-in Go, Rust and Zig builders.

pub mod error;
pub mod go;
pub mod invalid;
pub mod registry;
pub mod rust;
pub mod trait_def;
pub mod util;
pub mod validation;
pub mod zig;

pub use error::BuilderError;
pub use registry::{get_builder_summaries, BuilderRegistry, BuilderSummary, DEFAULT_BUILDER};
pub use trait_def::{
    BuildOptions, Builder, ConcurrentBuilder, DependingBuilder, PreparedBuilder, TargetFixer,
};
