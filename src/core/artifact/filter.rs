//! Artifact predicates.
//!
//! Filters are cheap to clone and compose with [`and`], [`or`] and [`not`].

use std::fmt;
use std::sync::Arc;

use crate::core::artifact::{Artifact, ArtifactType, EXTRA_BUILDER, EXTRA_EXT, EXTRA_ID};

/// A predicate over artifacts.
#[derive(Clone)]
pub struct Filter(Arc<dyn Fn(&Artifact) -> bool + Send + Sync>);

impl Filter {
    /// Wrap a predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Artifact) -> bool + Send + Sync + 'static,
    {
        Filter(Arc::new(predicate))
    }

    /// Check whether an artifact matches.
    pub fn matches(&self, artifact: &Artifact) -> bool {
        (self.0)(artifact)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Filter")
    }
}

/// Match artifacts of the given type.
pub fn by_type(kind: ArtifactType) -> Filter {
    Filter::new(move |a| a.kind == kind)
}

/// Match artifacts for the given operating system.
pub fn by_os(os: impl Into<String>) -> Filter {
    let os = os.into();
    Filter::new(move |a| a.os == os)
}

/// Match artifacts for the given architecture.
pub fn by_arch(arch: impl Into<String>) -> Filter {
    let arch = arch.into();
    Filter::new(move |a| a.arch == arch)
}

/// Match artifacts for the given architecture variant.
pub fn by_variant(variant: impl Into<String>) -> Filter {
    let variant = variant.into();
    Filter::new(move |a| a.variant == variant)
}

/// Match artifacts owned by the given build declaration.
pub fn by_id(id: impl Into<String>) -> Filter {
    let id = id.into();
    Filter::new(move |a| a.extra_str(EXTRA_ID) == id)
}

/// Match artifacts owned by any of the given build declarations.
///
/// An empty list matches everything.
pub fn by_ids<I, S>(ids: I) -> Filter
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
    if ids.is_empty() {
        return Filter::new(|_| true);
    }
    or(ids.into_iter().map(by_id))
}

/// Match artifacts produced by the given builder.
pub fn by_builder(builder: impl Into<String>) -> Filter {
    let builder = builder.into();
    Filter::new(move |a| a.extra_str(EXTRA_BUILDER) == builder)
}

/// Match artifacts with the given extension extra.
pub fn by_ext(ext: impl Into<String>) -> Filter {
    let ext = ext.into();
    Filter::new(move |a| a.extra_str(EXTRA_EXT) == ext)
}

/// Match artifacts satisfying every filter.
pub fn and<I>(filters: I) -> Filter
where
    I: IntoIterator<Item = Filter>,
{
    let filters: Vec<Filter> = filters.into_iter().collect();
    Filter::new(move |a| filters.iter().all(|f| f.matches(a)))
}

/// Match artifacts satisfying at least one filter.
pub fn or<I>(filters: I) -> Filter
where
    I: IntoIterator<Item = Filter>,
{
    let filters: Vec<Filter> = filters.into_iter().collect();
    Filter::new(move |a| filters.iter().any(|f| f.matches(a)))
}

/// Negate a filter.
pub fn not(filter: Filter) -> Filter {
    Filter::new(move |a| !filter.matches(a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::artifact::EXTRA_ID;

    fn binary(os: &str, arch: &str, id: &str) -> Artifact {
        Artifact::new(ArtifactType::Binary, "app", format!("dist/{os}_{arch}/app"))
            .with_platform(os, arch, "")
            .with_extra(EXTRA_ID, id)
    }

    #[test]
    fn test_simple_filters() {
        let a = binary("linux", "amd64", "cli");

        assert!(by_type(ArtifactType::Binary).matches(&a));
        assert!(!by_type(ArtifactType::Checksum).matches(&a));
        assert!(by_os("linux").matches(&a));
        assert!(by_arch("amd64").matches(&a));
        assert!(by_id("cli").matches(&a));
        assert!(!by_id("lib").matches(&a));
        assert!(by_variant("").matches(&a));
    }

    #[test]
    fn test_composition() {
        let a = binary("linux", "amd64", "cli");
        let b = binary("darwin", "arm64", "cli");

        let linux_binaries = and([by_type(ArtifactType::Binary), by_os("linux")]);
        assert!(linux_binaries.matches(&a));
        assert!(!linux_binaries.matches(&b));

        let either = or([by_os("linux"), by_arch("arm64")]);
        assert!(either.matches(&a));
        assert!(either.matches(&b));

        assert!(not(by_os("linux")).matches(&b));
    }

    #[test]
    fn test_by_ids() {
        let a = binary("linux", "amd64", "cli");
        let b = binary("linux", "amd64", "lib");

        assert!(by_ids(["cli", "other"]).matches(&a));
        assert!(!by_ids(["cli", "other"]).matches(&b));
        assert!(by_ids(Vec::<String>::new()).matches(&b));
    }
}
