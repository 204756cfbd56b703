//! Shipwright.toml project file.
//!
//! The project file supplies the ordered build declarations plus the few
//! project-wide values the build pipe needs (name, dist directory, env).

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::build::BuildDeclaration;

/// Canonical project file name.
pub const PROJECT_FILE: &str = "Shipwright.toml";

/// Default output directory.
pub const DEFAULT_DIST: &str = "dist";

/// A parsed project file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    /// Project name, used as the default build ID and binary name
    pub project_name: String,

    /// Output directory for every build
    pub dist: PathBuf,

    /// Project-wide environment (`KEY=VALUE`)
    pub env: Vec<String>,

    /// Build declarations, in order
    pub builds: Vec<BuildDeclaration>,
}

impl Default for Project {
    fn default() -> Self {
        Project {
            project_name: String::new(),
            dist: PathBuf::from(DEFAULT_DIST),
            env: Vec::new(),
            builds: Vec::new(),
        }
    }
}

impl Project {
    /// Create an empty project with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Project {
            project_name: name.into(),
            ..Default::default()
        }
    }

    /// Load a project file.
    ///
    /// When `project_name` is not set, the name of the directory holding the
    /// file is used.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read project file: {}", path.display()))?;

        let mut project: Project = toml::from_str(&contents)
            .with_context(|| format!("failed to parse project file: {}", path.display()))?;

        if project.project_name.is_empty() {
            project.project_name = path
                .parent()
                .and_then(|dir| dir.file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
        }

        if let Some(root) = path.parent() {
            if project.dist.is_relative() {
                project.dist = root.join(&project.dist);
            }
        }

        Ok(project)
    }

    /// Set the output directory.
    pub fn with_dist(mut self, dist: impl Into<PathBuf>) -> Self {
        self.dist = dist.into();
        self
    }

    /// Append a build declaration.
    pub fn with_build(mut self, build: BuildDeclaration) -> Self {
        self.builds.push(build);
        self
    }
}

/// Find the project file, starting from `start` and walking up.
pub fn find_project(start: &Path) -> Result<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(PROJECT_FILE);
        if candidate.is_file() {
            return Ok(candidate);
        }
        current = dir.parent();
    }

    bail!(
        "could not find `{}` in `{}` or any parent directory",
        PROJECT_FILE,
        start.display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_project() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(PROJECT_FILE);
        std::fs::write(
            &path,
            r#"
project_name = "demo"
env = ["FOO=bar"]

[[builds]]
id = "cli"
targets = ["linux_amd64"]

[[builds]]
id = "lib"
builder = "zig"
"#,
        )
        .unwrap();

        let project = Project::load(&path).unwrap();
        assert_eq!(project.project_name, "demo");
        assert_eq!(project.dist, tmp.path().join("dist"));
        assert_eq!(project.env, vec!["FOO=bar".to_string()]);
        assert_eq!(project.builds.len(), 2);
        assert_eq!(project.builds[1].builder, "zig");
    }

    #[test]
    fn test_project_name_from_directory() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("myapp");
        std::fs::create_dir(&root).unwrap();
        std::fs::write(root.join(PROJECT_FILE), "").unwrap();

        let project = Project::load(&root.join(PROJECT_FILE)).unwrap();
        assert_eq!(project.project_name, "myapp");
    }

    #[test]
    fn test_find_project_walks_up() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(PROJECT_FILE), "").unwrap();
        let nested = tmp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_project(&nested).unwrap();
        assert_eq!(found, tmp.path().join(PROJECT_FILE));
    }

    #[test]
    fn test_find_project_missing() {
        let tmp = TempDir::new().unwrap();
        let err = find_project(tmp.path()).unwrap_err();
        assert!(err.to_string().contains(PROJECT_FILE));
    }
}
