//! Artifact metadata: sizes, checksums and the `artifacts.json` manifest.

use std::path::PathBuf;

use anyhow::{Context as _, Result};

use crate::core::artifact::filter::by_type;
use crate::core::artifact::{ArtifactType, Artifacts, EXTRA_CHECKSUM, EXTRA_SIZE};
use crate::util::context::Context;
use crate::util::fs::{absolutize, write_string};

/// Manifest file name, written to the dist directory.
pub const ARTIFACTS_FILE: &str = "artifacts.json";

/// Record the file size of every binary in its `Size` extra.
pub fn record_sizes(artifacts: &Artifacts) -> Result<()> {
    artifacts
        .filter(&by_type(ArtifactType::Binary))
        .visit(|artifact| {
            let size = std::fs::metadata(&artifact.path)
                .with_context(|| format!("failed to stat {}", artifact.path.display()))?
                .len();
            artifact.set_extra(EXTRA_SIZE, size);
            Ok(())
        })
}

/// Record the SHA-256 of every binary in its `Checksum` extra.
pub fn record_checksums(artifacts: &Artifacts) -> Result<()> {
    artifacts
        .filter(&by_type(ArtifactType::Binary))
        .visit(|artifact| {
            let checksum = artifact.checksum()?;
            artifact.set_extra(EXTRA_CHECKSUM, checksum);
            Ok(())
        })
}

/// Write every artifact to `<dist>/artifacts.json`, returning the path.
pub fn write_manifest(ctx: &Context) -> Result<PathBuf> {
    let path = absolutize(&ctx.root, &ctx.project.dist).join(ARTIFACTS_FILE);
    let json = serde_json::to_string_pretty(&ctx.artifacts.list())
        .context("failed to serialize artifacts")?;
    write_string(&path, &json)?;

    tracing::info!(path = %path.display(), artifacts = ctx.artifacts.len(), "wrote artifacts manifest");
    Ok(path)
}
