//! Declaration field validation.
//!
//! Builders reject declaration fields that mean nothing for their toolchain
//! instead of silently ignoring them.

use crate::builder::error::BuilderError;
use crate::core::build::BuildDeclaration;

/// A declaration field that only some builders understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Main,
    Ldflags,
    Tags,
    Buildmode,
}

/// Fields only the Go builder uses.
pub const GO_ONLY_FIELDS: &[Field] = &[Field::Main, Field::Ldflags, Field::Tags, Field::Buildmode];

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::Main => "main",
            Field::Ldflags => "ldflags",
            Field::Tags => "tags",
            Field::Buildmode => "buildmode",
        }
    }

    /// Check whether the declaration sets this field.
    pub fn is_set(&self, build: &BuildDeclaration) -> bool {
        match self {
            Field::Main => !build.main.is_empty(),
            Field::Ldflags => !build.ldflags.is_empty(),
            Field::Tags => !build.tags.is_empty(),
            Field::Buildmode => !build.buildmode.is_empty(),
        }
    }
}

/// Fail on the first of `fields` the declaration sets.
pub fn ensure_unused(
    builder: &str,
    build: &BuildDeclaration,
    fields: &[Field],
) -> Result<(), BuilderError> {
    match fields.iter().find(|field| field.is_set(build)) {
        Some(field) => Err(BuilderError::UnusedField {
            field: field.name().to_string(),
            builder: builder.to_string(),
        }),
        None => Ok(()),
    }
}
