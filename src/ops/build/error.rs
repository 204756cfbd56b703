//! Build pipe errors.

use thiserror::Error;

use crate::util::ids::DuplicateIdError;

/// Failure of one phase of the build pipe.
///
/// Every variant names the declaration (and target, once one is known) and
/// keeps the underlying error as its source, so `{:#}` prints the full chain.
#[derive(Debug, Error)]
pub enum PipeError {
    #[error(transparent)]
    DuplicateId(#[from] DuplicateIdError),

    #[error("build `{id}`: invalid configuration")]
    Config {
        id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("build `{id}`: prepare failed")]
    Prepare {
        id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("build `{id}`: target `{target}` could not be resolved")]
    Target {
        id: String,
        target: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("build `{id}` ({target}): could not create the output directory")]
    Output {
        id: String,
        target: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("build `{id}` ({target}): pre hook failed")]
    PreHook {
        id: String,
        target: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("build `{id}` ({target}): build failed")]
    Build {
        id: String,
        target: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("build `{id}` ({target}): post hook failed")]
    PostHook {
        id: String,
        target: String,
        #[source]
        source: anyhow::Error,
    },
}
