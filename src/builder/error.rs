//! Builder errors.

use thiserror::Error;

/// Errors surfaced by builders and the builder registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuilderError {
    #[error("invalid builder: `{name}`")]
    InvalidBuilder { name: String },

    #[error("invalid target: `{target}`")]
    InvalidTarget { target: String },

    #[error("`{field}` is not used for `{builder}`")]
    UnusedField { field: String, builder: String },
}

impl BuilderError {
    pub fn invalid_target(target: impl Into<String>) -> Self {
        BuilderError::InvalidTarget {
            target: target.into(),
        }
    }
}
