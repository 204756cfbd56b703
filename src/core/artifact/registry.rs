//! Concurrency-safe artifact registry.
//!
//! Builds running in parallel add artifacts while other stages list, filter
//! and visit them. The registry is internally synchronized and cheap to
//! clone: clones share the same backing collection.
//!
//! Every entry is individually locked. A filtered view shares its entries
//! with the registry it came from, so metadata recorded through a view (via
//! [`Artifacts::visit`]) is visible everywhere, while the set of entries in
//! the view is fixed at the time the view was taken.

use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use anyhow::Result;
use serde_json::Value;

use crate::core::artifact::{Artifact, Extras, Filter};

type Entry = Arc<Mutex<Artifact>>;

/// The artifact registry.
#[derive(Debug, Clone, Default)]
pub struct Artifacts {
    items: Arc<RwLock<Vec<Entry>>>,
}

/// Handle given to [`Artifacts::visit`] callbacks.
///
/// Dereferences to a copy of the artifact for reading; only the extra
/// attributes can be changed, and only those set here are written back.
pub struct VisitedArtifact {
    artifact: Artifact,
    changed: Extras,
}

impl VisitedArtifact {
    /// Set an extra attribute.
    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let (key, value) = (key.into(), value.into());
        self.artifact.extra.insert(key.clone(), value.clone());
        self.changed.insert(key, value);
    }
}

impl Deref for VisitedArtifact {
    type Target = Artifact;

    fn deref(&self) -> &Artifact {
        &self.artifact
    }
}

fn lock(entry: &Entry) -> MutexGuard<'_, Artifact> {
    entry.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Artifacts {
    /// Create an empty registry.
    pub fn new() -> Self {
        Artifacts::default()
    }

    /// Add an artifact. Safe to call from many threads at once.
    pub fn add(&self, artifact: Artifact) {
        tracing::debug!(
            name = %artifact.name,
            path = %artifact.path.display(),
            kind = %artifact.kind,
            "added new artifact"
        );
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        items.push(Arc::new(Mutex::new(artifact)));
    }

    fn entries(&self) -> Vec<Entry> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot of every artifact at call time.
    pub fn list(&self) -> Vec<Artifact> {
        self.entries().iter().map(|e| lock(e).clone()).collect()
    }

    /// Number of artifacts.
    pub fn len(&self) -> usize {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// View over the artifacts currently matching `filter`.
    ///
    /// Artifacts added after the call do not show up in the view.
    pub fn filter(&self, filter: &Filter) -> Artifacts {
        let matching: Vec<Entry> = self
            .entries()
            .into_iter()
            .filter(|e| filter.matches(&lock(e)))
            .collect();

        Artifacts {
            items: Arc::new(RwLock::new(matching)),
        }
    }

    /// Apply `f` to every artifact, stopping at the first error.
    ///
    /// `f` sees a copy of each artifact and holds no lock while it runs, so
    /// it may read or change this registry. Extras set through the handle
    /// are merged into the entry once `f` returns.
    pub fn visit<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&mut VisitedArtifact) -> Result<()>,
    {
        for entry in self.entries() {
            let mut visited = VisitedArtifact {
                artifact: lock(&entry).clone(),
                changed: Extras::new(),
            };
            f(&mut visited)?;

            if !visited.changed.is_empty() {
                lock(&entry).extra.extend(visited.changed);
            }
        }
        Ok(())
    }

    /// Remove every artifact matching `filter`, returning how many were removed.
    pub fn remove(&self, filter: &Filter) -> usize {
        let doomed: Vec<Entry> = self
            .entries()
            .into_iter()
            .filter(|e| filter.matches(&lock(e)))
            .collect();
        if doomed.is_empty() {
            return 0;
        }

        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let before = items.len();
        items.retain(|e| !doomed.iter().any(|d| Arc::ptr_eq(d, e)));
        before - items.len()
    }

    /// Group artifacts by their platform key.
    pub fn group_by_platform(&self) -> BTreeMap<String, Vec<Artifact>> {
        let mut groups: BTreeMap<String, Vec<Artifact>> = BTreeMap::new();
        for artifact in self.list() {
            groups.entry(artifact.platform()).or_default().push(artifact);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::thread;

    use super::*;
    use crate::core::artifact::filter::{and, by_id, by_os, by_type, or};
    use crate::core::artifact::{ArtifactType, EXTRA_ID, EXTRA_SIZE};

    fn binary(os: &str, arch: &str, id: &str) -> Artifact {
        Artifact::new(ArtifactType::Binary, "app", format!("dist/{id}_{os}_{arch}/app"))
            .with_platform(os, arch, "")
            .with_extra(EXTRA_ID, id)
    }

    #[test]
    fn test_concurrent_add() {
        let artifacts = Artifacts::new();

        let handles: Vec<_> = (0..500)
            .map(|i| {
                let artifacts = artifacts.clone();
                thread::spawn(move || {
                    artifacts.add(Artifact::new(
                        ArtifactType::Binary,
                        format!("a{i}"),
                        format!("dist/a{i}"),
                    ));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let list = artifacts.list();
        assert_eq!(list.len(), 500);
        let names: HashSet<_> = list.iter().map(|a| a.name.clone()).collect();
        assert_eq!(names.len(), 500);
    }

    #[test]
    fn test_filter_and() {
        let artifacts = Artifacts::new();
        artifacts.add(binary("linux", "amd64", "cli"));
        artifacts.add(binary("darwin", "amd64", "cli"));
        artifacts.add(
            Artifact::new(ArtifactType::UploadableArchive, "app.tar.gz", "dist/app.tar.gz")
                .with_platform("linux", "amd64", ""),
        );

        let view = artifacts.filter(&and([by_type(ArtifactType::Binary), by_os("linux")]));
        let list = view.list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].os, "linux");
        assert_eq!(list[0].kind, ArtifactType::Binary);
    }

    #[test]
    fn test_filter_or_has_no_duplicates() {
        let artifacts = Artifacts::new();
        artifacts.add(binary("linux", "amd64", "cli"));
        artifacts.add(binary("darwin", "arm64", "cli"));
        artifacts.add(binary("windows", "amd64", "lib"));

        let view = artifacts.filter(&or([by_os("linux"), by_id("cli")]));
        assert_eq!(view.len(), 2);
    }

    #[test]
    fn test_filter_is_a_snapshot() {
        let artifacts = Artifacts::new();
        artifacts.add(binary("linux", "amd64", "cli"));

        let view = artifacts.filter(&by_os("linux"));
        artifacts.add(binary("linux", "arm64", "cli"));

        assert_eq!(view.len(), 1);
        assert_eq!(artifacts.filter(&by_os("linux")).len(), 2);
    }

    #[test]
    fn test_list_is_a_snapshot() {
        let artifacts = Artifacts::new();
        artifacts.add(binary("linux", "amd64", "cli"));
        let list = artifacts.list();
        artifacts.add(binary("linux", "arm64", "cli"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_visit_through_view_enriches_registry() {
        let artifacts = Artifacts::new();
        artifacts.add(binary("linux", "amd64", "cli"));
        artifacts.add(binary("darwin", "amd64", "cli"));

        artifacts
            .filter(&by_os("linux"))
            .visit(|a| {
                a.set_extra(EXTRA_SIZE, 10);
                Ok(())
            })
            .unwrap();

        let linux = artifacts.filter(&by_os("linux")).list();
        assert_eq!(linux[0].extra[EXTRA_SIZE], Value::from(10));
        let darwin = artifacts.filter(&by_os("darwin")).list();
        assert!(!darwin[0].extra.contains_key(EXTRA_SIZE));
    }

    #[test]
    fn test_visit_stops_at_first_error() {
        let artifacts = Artifacts::new();
        artifacts.add(binary("linux", "amd64", "cli"));
        artifacts.add(binary("darwin", "amd64", "cli"));
        artifacts.add(binary("windows", "amd64", "cli"));

        let mut seen = 0;
        let err = artifacts
            .visit(|a| {
                seen += 1;
                if a.os == "darwin" {
                    anyhow::bail!("cannot handle {}", a.os);
                }
                Ok(())
            })
            .unwrap_err();

        assert_eq!(seen, 2);
        assert!(err.to_string().contains("darwin"));
    }

    #[test]
    fn test_visit_may_read_the_registry() {
        let artifacts = Artifacts::new();
        artifacts.add(binary("linux", "amd64", "cli"));
        artifacts.add(binary("darwin", "amd64", "cli"));
        artifacts.add(binary("windows", "amd64", "lib"));

        let shared = artifacts.clone();
        let (tx, rx) = std::sync::mpsc::channel();
        thread::spawn(move || {
            let result = shared.visit(|a| {
                let siblings = shared.filter(&by_id(a.id())).len() - 1;
                a.set_extra("Siblings", siblings);
                a.set_extra("Total", shared.list().len());
                Ok(())
            });
            tx.send(result.is_ok()).ok();
        });

        assert!(rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap());
        let linux = &artifacts.filter(&by_os("linux")).list()[0];
        assert_eq!(linux.extra["Siblings"], Value::from(1));
        assert_eq!(linux.extra["Total"], Value::from(3));
    }

    #[test]
    fn test_visit_may_remove_and_add() {
        let artifacts = Artifacts::new();
        artifacts.add(binary("linux", "amd64", "cli"));
        artifacts.add(binary("darwin", "amd64", "cli"));

        let shared = artifacts.clone();
        let (tx, rx) = std::sync::mpsc::channel();
        thread::spawn(move || {
            let result = shared.visit(|a| {
                if a.os == "linux" {
                    shared.remove(&by_os("darwin"));
                    shared.add(binary("windows", "amd64", "cli"));
                }
                a.set_extra(EXTRA_SIZE, shared.len());
                Ok(())
            });
            tx.send(result.is_ok()).ok();
        });

        assert!(rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap());
        let oses: Vec<String> = artifacts.list().into_iter().map(|a| a.os).collect();
        assert_eq!(oses, vec!["linux", "windows"]);
        assert_eq!(artifacts.list()[0].extra[EXTRA_SIZE], Value::from(2));
    }

    #[test]
    fn test_visit_keeps_concurrent_extras() {
        let artifacts = Artifacts::new();
        artifacts.add(binary("linux", "amd64", "cli"));

        artifacts
            .visit(|a| {
                artifacts.visit(|inner| {
                    inner.set_extra("Inner", true);
                    Ok(())
                })?;
                a.set_extra("Outer", true);
                Ok(())
            })
            .unwrap();

        let extra = &artifacts.list()[0].extra;
        assert_eq!(extra["Inner"], Value::from(true));
        assert_eq!(extra["Outer"], Value::from(true));
    }

    #[test]
    fn test_remove() {
        let artifacts = Artifacts::new();
        artifacts.add(binary("linux", "amd64", "cli"));
        artifacts.add(binary("darwin", "amd64", "cli"));
        artifacts.add(binary("linux", "arm64", "lib"));

        let removed = artifacts.remove(&by_id("cli"));
        assert_eq!(removed, 2);
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts.list()[0].id(), "lib");
    }

    #[test]
    fn test_group_by_platform() {
        let artifacts = Artifacts::new();
        artifacts.add(binary("linux", "amd64", "cli"));
        artifacts.add(binary("linux", "amd64", "lib"));
        artifacts.add(binary("darwin", "arm64", "cli"));

        let groups = artifacts.group_by_platform();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["linux_amd64"].len(), 2);
        assert_eq!(groups["darwin_arm64"].len(), 1);
    }

    #[test]
    fn test_clones_share_storage() {
        let artifacts = Artifacts::new();
        let other = artifacts.clone();
        other.add(binary("linux", "amd64", "cli"));
        assert_eq!(artifacts.len(), 1);
        assert!(!artifacts.is_empty());
    }
}
