//! User configuration for Shipwright.
//!
//! Two configuration file locations are supported:
//! - Global: `<config dir>/shipwright/config.toml` - User-wide defaults
//! - Project: `.shipwright/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config. Command-line flags
//! take precedence over both.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Shipwright configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Maximum number of targets built at once (None = available parallelism)
    pub parallelism: Option<usize>,

    /// Cancel every running tool after this many seconds
    pub timeout: Option<u64>,

    /// Never run post-build hooks
    pub skip_post_hooks: bool,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file doesn't exist
    /// or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.parallelism.is_some() {
            self.build.parallelism = other.build.parallelism;
        }
        if other.build.timeout.is_some() {
            self.build.timeout = other.build.timeout;
        }
        if other.build.skip_post_hooks {
            self.build.skip_post_hooks = true;
        }
    }

    /// Configured parallelism, or the machine's available parallelism.
    pub fn parallelism(&self) -> usize {
        self.build
            .parallelism
            .filter(|&n| n > 0)
            .unwrap_or_else(default_parallelism)
    }

    /// Configured timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.build.timeout.map(Duration::from_secs)
    }
}

/// Number of threads the machine can run at once (at least one).
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.shipwright/config.toml)
/// 2. Global config (<config dir>/shipwright/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global shipwright config directory.
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.config_dir().join("shipwright"))
}

/// Get the global config path.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.shipwright/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".shipwright").join("config.toml")
}
