//! Artifacts - records of produced outputs.
//!
//! Builders record binaries here; later stages (archives, packages,
//! checksums, signatures) read them back through the registry in
//! [`registry`] and the predicates in [`filter`].

pub mod filter;
pub mod registry;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::util::hash::sha256_file;

pub use filter::Filter;
pub use registry::Artifacts;

/// Extra key: binary name without extension.
pub const EXTRA_BINARY: &str = "Binary";

/// Extra key: file extension resolved for the target.
pub const EXTRA_EXT: &str = "Ext";

/// Extra key: ID of the owning build declaration.
pub const EXTRA_ID: &str = "ID";

/// Extra key: name of the builder that produced the artifact.
pub const EXTRA_BUILDER: &str = "Builder";

/// Extra key: file size in bytes, recorded after the build.
pub const EXTRA_SIZE: &str = "Size";

/// Extra key: `sha256:<hex>` checksum, recorded on demand.
pub const EXTRA_CHECKSUM: &str = "Checksum";

/// Kind of produced output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    /// Binary produced by a builder
    Binary,
    /// Binary that is uploaded as is
    UploadableBinary,
    /// Archive (tar.gz, zip) to be uploaded
    UploadableArchive,
    /// Linux package (deb, rpm, apk)
    LinuxPackage,
    /// Checksum file
    Checksum,
    /// Signature file
    Signature,
    /// Container image
    DockerImage,
    /// Metadata file (e.g. artifacts.json)
    Metadata,
}

impl ArtifactType {
    /// Human readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::Binary => "Binary",
            ArtifactType::UploadableBinary => "Binary",
            ArtifactType::UploadableArchive => "Archive",
            ArtifactType::LinuxPackage => "Linux Package",
            ArtifactType::Checksum => "Checksum",
            ArtifactType::Signature => "Signature",
            ArtifactType::DockerImage => "Docker Image",
            ArtifactType::Metadata => "Metadata",
        }
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Open-ended extra attributes of an artifact.
///
/// The keys declared as `EXTRA_*` constants are reserved for Shipwright; any
/// other key belongs to the builder that produced the artifact (e.g. `Abi`).
pub type Extras = BTreeMap<String, Value>;

/// One produced output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// File name
    pub name: String,

    /// Path on disk
    pub path: PathBuf,

    /// Operating system (Go naming: linux, darwin, windows)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub os: String,

    /// Architecture (Go naming: amd64, arm64, 386)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub arch: String,

    /// Architecture variant (amd64 level, arm version, ...)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub variant: String,

    /// Target string the artifact was built for
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target: String,

    /// Kind of output
    #[serde(rename = "type")]
    pub kind: ArtifactType,

    /// Extra attributes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: Extras,
}

impl Artifact {
    /// Create an artifact of the given kind.
    pub fn new(kind: ArtifactType, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Artifact {
            name: name.into(),
            path: path.into(),
            os: String::new(),
            arch: String::new(),
            variant: String::new(),
            target: String::new(),
            kind,
            extra: Extras::new(),
        }
    }

    /// Set the platform fields.
    pub fn with_platform(
        mut self,
        os: impl Into<String>,
        arch: impl Into<String>,
        variant: impl Into<String>,
    ) -> Self {
        self.os = os.into();
        self.arch = arch.into();
        self.variant = variant.into();
        self
    }

    /// Set the target string.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Set an extra attribute.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Platform key used to group artifacts (`os_arch[_variant]`).
    pub fn platform(&self) -> String {
        [&self.os, &self.arch, &self.variant]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join("_")
    }

    /// String extra, or empty when absent or not a string.
    pub fn extra_str(&self, key: &str) -> &str {
        self.extra.get(key).and_then(Value::as_str).unwrap_or("")
    }

    /// ID of the owning build declaration.
    pub fn id(&self) -> &str {
        self.extra_str(EXTRA_ID)
    }

    /// Compute the SHA-256 checksum of the file, as `sha256:<hex>`.
    pub fn checksum(&self) -> Result<String> {
        Ok(format!("sha256:{}", sha256_file(&self.path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_platform_key() {
        let a = Artifact::new(ArtifactType::Binary, "app", "dist/app")
            .with_platform("linux", "amd64", "v1");
        assert_eq!(a.platform(), "linux_amd64_v1");

        let b = Artifact::new(ArtifactType::Binary, "app", "dist/app")
            .with_platform("darwin", "arm64", "");
        assert_eq!(b.platform(), "darwin_arm64");

        let c = Artifact::new(ArtifactType::Checksum, "checksums.txt", "dist/checksums.txt");
        assert_eq!(c.platform(), "");
    }

    #[test]
    fn test_extras() {
        let a = Artifact::new(ArtifactType::Binary, "app", "dist/app")
            .with_extra(EXTRA_ID, "cli")
            .with_extra(EXTRA_SIZE, 42);

        assert_eq!(a.id(), "cli");
        assert_eq!(a.extra_str(EXTRA_SIZE), "");
        assert_eq!(a.extra[EXTRA_SIZE], Value::from(42));
        assert_eq!(a.extra_str("missing"), "");
    }

    #[test]
    fn test_checksum() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("app");
        std::fs::write(&path, b"hello").unwrap();

        let a = Artifact::new(ArtifactType::Binary, "app", &path);
        assert_eq!(
            a.checksum().unwrap(),
            "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_serialize_shape() {
        let a = Artifact::new(ArtifactType::Binary, "app", "dist/app")
            .with_platform("linux", "amd64", "")
            .with_target("linux_amd64")
            .with_extra(EXTRA_BUILDER, "go");

        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["type"], "binary");
        assert_eq!(json["os"], "linux");
        assert_eq!(json["extra"]["Builder"], "go");
        assert!(json.get("variant").is_none());
    }
}
