//! Project and context fixtures.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::builder::trait_def::BuildOptions;
use crate::builder::BuilderRegistry;
use crate::core::project::Project;
use crate::test_support::{FakeBuilder, FakeTarget};
use crate::util::context::Context;

/// A project named `demo` with a relative `dist` directory and no builds.
pub fn fake_project() -> Project {
    Project::new("demo").with_dist("dist")
}

/// Built-in builders plus `fake`.
pub fn test_registry(fake: FakeBuilder) -> Arc<BuilderRegistry> {
    let registry = BuilderRegistry::with_builtins();
    registry.register("fake", Arc::new(fake));
    Arc::new(registry)
}

/// Context for `project` rooted at `root`, with `fake` registered.
pub fn context_with(project: Project, root: &Path, fake: FakeBuilder) -> Context {
    Context::new(project, test_registry(fake))
        .with_root(root)
        .with_parallelism(4)
}

/// Context for `project` rooted in the system temp directory.
pub fn context_for(project: Project) -> Context {
    context_with(project, &std::env::temp_dir(), FakeBuilder::new())
}

/// Context for [`fake_project`].
pub fn test_context() -> Context {
    context_for(fake_project())
}

/// Build options for `target` pointing into the temp directory.
pub fn fake_options(target: &str) -> BuildOptions {
    BuildOptions {
        target: Arc::new(FakeTarget::new(target)),
        name: "demo".to_string(),
        path: std::env::temp_dir().join("shipwright-fake").join("demo"),
        ext: String::new(),
    }
}

/// Write a `Shipwright.toml` with `contents` into `dir`, returning its path.
pub fn write_project(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join(crate::core::project::PROJECT_FILE);
    std::fs::write(&path, contents).expect("failed to write project file");
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_load_project() {
        let tmp = TempDir::new().unwrap();
        let path = write_project(
            tmp.path(),
            r#"
project_name = "demo"

[[builds]]
builder = "fake"
targets = ["linux_amd64"]
"#,
        );

        let project = Project::load(&path).unwrap();
        assert_eq!(project.builds.len(), 1);
        assert_eq!(project.dist, tmp.path().join("dist"));
    }
}
