//! Shared utilities

pub mod config;
pub mod context;
pub mod errgroup;
pub mod fs;
pub mod hash;
pub mod ids;
pub mod process;
pub mod template;

pub use config::Config;
pub use context::Context;
pub use errgroup::{BoundedGroup, Skip, SkipAwareGroup};
pub use process::{Cancellation, ProcessBuilder};
pub use template::{Template, TemplateError};
