//! Build declarations - one user-configured build unit.
//!
//! A declaration names a builder, the targets to build for, and the hooks to
//! run around every target. It is read from the project file once, defaulted
//! in place by the build pipe and its builder, then treated as read-only.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single build declaration from `[[builds]]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildDeclaration {
    /// Unique identifier within the project (defaults to the project name)
    pub id: String,

    /// Builder plugin name (defaults to `go`)
    pub builder: String,

    /// Binary name template (defaults to the project name)
    pub binary: String,

    /// Working directory for the toolchain
    pub dir: String,

    /// Main package or entry point (Go only)
    pub main: String,

    /// Target strings, in the builder's own grammar
    pub targets: Vec<String>,

    /// Environment templates (`KEY=VALUE`)
    pub env: Vec<String>,

    /// Extra toolchain flags (templated)
    pub flags: Vec<String>,

    /// Linker flags (Go only)
    pub ldflags: Vec<String>,

    /// Build tags (Go only)
    pub tags: Vec<String>,

    /// Build mode (`c-shared`, `c-archive`, or empty)
    pub buildmode: String,

    /// Toolchain executable (e.g. `go`, `cargo`, `zig`)
    pub tool: String,

    /// Toolchain sub-command (e.g. `build`, `zigbuild`)
    pub command: String,

    /// Template that excludes this declaration when it expands to `true`
    pub skip: String,

    /// Put every target's output in the dist root instead of a per-target directory
    pub no_unique_dist_dir: bool,

    /// Commands run before and after every target
    pub hooks: BuildHooks,
}

impl BuildDeclaration {
    /// Create a declaration for the given builder.
    pub fn new(builder: impl Into<String>) -> Self {
        BuildDeclaration {
            builder: builder.into(),
            ..Default::default()
        }
    }

    /// Set the declaration ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the binary name template.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Set the targets.
    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    /// Parsed `buildmode`.
    pub fn build_mode(&self) -> Result<BuildMode, BuildModeParseError> {
        self.buildmode.parse()
    }
}

/// Output kind requested through `buildmode`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BuildMode {
    /// Executable (empty `buildmode`)
    #[default]
    Default,
    Exe,
    Pie,
    /// Shared library
    CShared,
    /// Static library
    CArchive,
}

impl BuildMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Default => "",
            BuildMode::Exe => "exe",
            BuildMode::Pie => "pie",
            BuildMode::CShared => "c-shared",
            BuildMode::CArchive => "c-archive",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown `buildmode` value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid buildmode `{0}`, expected one of: exe, pie, c-shared, c-archive")]
pub struct BuildModeParseError(pub String);

impl FromStr for BuildMode {
    type Err = BuildModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "default" => Ok(BuildMode::Default),
            "exe" => Ok(BuildMode::Exe),
            "pie" => Ok(BuildMode::Pie),
            "c-shared" => Ok(BuildMode::CShared),
            "c-archive" => Ok(BuildMode::CArchive),
            other => Err(BuildModeParseError(other.to_string())),
        }
    }
}

/// Pre and post hooks of a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildHooks {
    /// Run before the builder, for every target
    pub pre: Vec<Hook>,

    /// Run after a successful build, for every target
    pub post: Vec<Hook>,
}

/// A templated command run around a build.
///
/// Accepts either a plain command string or a full table in the project file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "HookSpec")]
pub struct Hook {
    /// Command line template
    pub cmd: String,

    /// Working directory template (empty = current directory)
    pub dir: String,

    /// Extra environment templates (`KEY=VALUE`)
    pub env: Vec<String>,

    /// Stream the command output to the log
    pub output: bool,
}

impl Hook {
    /// Create a hook running the given command.
    pub fn new(cmd: impl Into<String>) -> Self {
        Hook {
            cmd: cmd.into(),
            ..Default::default()
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HookSpec {
    Simple(String),
    Full {
        cmd: String,
        #[serde(default)]
        dir: String,
        #[serde(default)]
        env: Vec<String>,
        #[serde(default)]
        output: bool,
    },
}

impl From<HookSpec> for Hook {
    fn from(spec: HookSpec) -> Self {
        match spec {
            HookSpec::Simple(cmd) => Hook::new(cmd),
            HookSpec::Full {
                cmd,
                dir,
                env,
                output,
            } => Hook {
                cmd,
                dir,
                env,
                output,
            },
        }
    }
}
