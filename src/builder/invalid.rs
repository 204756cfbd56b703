//! Stand-in for unregistered builder names.

use std::sync::Arc;

use anyhow::Result;

use crate::builder::error::BuilderError;
use crate::builder::trait_def::{BuildOptions, Builder};
use crate::core::build::BuildDeclaration;
use crate::core::target::Target;
use crate::util::context::Context;

/// Returned by the registry for unknown names. Every operation fails with
/// `invalid builder: <name>`.
#[derive(Debug, Clone)]
pub struct InvalidBuilder {
    name: String,
}

impl InvalidBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        InvalidBuilder { name: name.into() }
    }

    fn error(&self) -> anyhow::Error {
        BuilderError::InvalidBuilder {
            name: self.name.clone(),
        }
        .into()
    }
}

impl Builder for InvalidBuilder {
    fn with_defaults(&self, _build: BuildDeclaration) -> Result<BuildDeclaration> {
        Err(self.error())
    }

    fn parse(&self, _target: &str) -> Result<Arc<dyn Target>> {
        Err(self.error())
    }

    fn build(&self, _: &Context, _: &BuildDeclaration, _: &BuildOptions) -> Result<()> {
        Err(self.error())
    }
}
