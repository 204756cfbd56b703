//! Output names and paths for one target.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::builder::trait_def::BuildOptions;
use crate::core::build::{BuildDeclaration, BuildMode};
use crate::core::target::Target;
use crate::util::context::Context;
use crate::util::fs::absolutize;
use crate::util::template::Template;

/// File extension for a target string and build mode.
///
/// Independent of the builder, so every builder sees the same extension for
/// the same request.
pub fn ext_for(target: &str, mode: BuildMode) -> &'static str {
    let windows = target.contains("windows");
    let darwin = target.contains("darwin") || target.contains("macos") || target.contains("apple");

    match mode {
        BuildMode::CShared if windows => ".dll",
        BuildMode::CShared if darwin => ".dylib",
        BuildMode::CShared => ".so",
        BuildMode::CArchive if windows => ".lib",
        BuildMode::CArchive => ".a",
        _ if windows => ".exe",
        _ if target.contains("wasm") => ".wasm",
        _ => "",
    }
}

/// Resolve name, path and extension for one target of `build`.
///
/// The path is `<dist>/<id>_<target>/<binary><ext>`, or `<dist>/<binary><ext>`
/// when the declaration sets `no_unique_dist_dir`.
pub fn build_options_for_target(
    ctx: &Context,
    build: &BuildDeclaration,
    target: Arc<dyn Target>,
) -> Result<BuildOptions> {
    let raw = target.to_string();
    let ext = ext_for(&raw, build.build_mode()?);

    let binary = Template::new(ctx)
        .with_target(target.as_ref())
        .with_env(&build.env)?
        .apply(&build.binary)
        .with_context(|| format!("failed to expand binary name `{}`", build.binary))?;
    let name = format!("{binary}{ext}");

    let mut dir = PathBuf::from(&ctx.project.dist);
    if !build.no_unique_dist_dir {
        dir.push(format!("{}_{}", build.id, raw));
    }
    let path = absolutize(&ctx.root, &dir.join(&name));

    Ok(BuildOptions {
        target,
        name,
        path,
        ext: ext.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_context, FakeTarget};

    #[test]
    fn test_ext_for() {
        assert_eq!(ext_for("windows_amd64", BuildMode::Default), ".exe");
        assert_eq!(ext_for("x86_64-pc-windows-gnu", BuildMode::Default), ".exe");
        assert_eq!(ext_for("windows_amd64", BuildMode::CShared), ".dll");
        assert_eq!(ext_for("windows_386", BuildMode::CArchive), ".lib");
        assert_eq!(ext_for("darwin_arm64", BuildMode::CShared), ".dylib");
        assert_eq!(ext_for("linux_amd64", BuildMode::CShared), ".so");
        assert_eq!(ext_for("linux_amd64", BuildMode::CArchive), ".a");
        assert_eq!(ext_for("js_wasm", BuildMode::Default), ".wasm");
        assert_eq!(ext_for("linux_amd64", BuildMode::Pie), "");
    }

    #[test]
    fn test_per_target_directory() {
        let ctx = test_context();
        let build = BuildDeclaration::new("fake")
            .with_id("cli")
            .with_binary("{{ .ProjectName }}-{{ .Os }}");

        let options =
            build_options_for_target(&ctx, &build, Arc::new(FakeTarget::new("windows_amd64")))
                .unwrap();

        assert_eq!(options.name, "demo-windows.exe");
        assert_eq!(options.ext, ".exe");
        assert!(options.path.is_absolute());
        assert!(options
            .path
            .ends_with("dist/cli_windows_amd64/demo-windows.exe"));
    }

    #[test]
    fn test_shared_directory() {
        let ctx = test_context();
        let mut build = BuildDeclaration::new("fake").with_id("cli").with_binary("app");
        build.no_unique_dist_dir = true;

        let options =
            build_options_for_target(&ctx, &build, Arc::new(FakeTarget::new("linux_amd64")))
                .unwrap();
        assert!(options.path.ends_with("dist/app"));
    }

    #[test]
    fn test_bad_binary_template() {
        let ctx = test_context();
        let build = BuildDeclaration::new("fake").with_binary("{{ .Nope }}");

        let err = build_options_for_target(&ctx, &build, Arc::new(FakeTarget::new("linux_amd64")))
            .unwrap_err();
        assert!(format!("{err:#}").contains("unknown template key"));
    }
}
