//! Toolchain health checks.
//!
//! `shipwright healthcheck` makes sure every tool the project's builders
//! depend on is on `PATH` before a release is attempted.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Result;

use crate::builder::trait_def::dependencies;
use crate::ops::build::apply_defaults;
use crate::util::context::Context;
use crate::util::process::find_executable;

/// Result of looking up one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCheck {
    /// Builder that needs the tool
    pub builder: String,

    /// Tool name
    pub tool: String,

    /// Where the tool was found, if anywhere
    pub path: Option<PathBuf>,
}

impl ToolCheck {
    pub fn passed(&self) -> bool {
        self.path.is_some()
    }
}

/// Summary of all checks.
#[derive(Debug, Clone, Default)]
pub struct HealthReport {
    pub checks: Vec<ToolCheck>,
}

impl HealthReport {
    /// Check if every tool was found.
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(ToolCheck::passed)
    }

    /// Tools that were not found.
    pub fn missing(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|c| !c.passed())
            .map(|c| c.tool.as_str())
            .collect()
    }
}

/// Check the dependencies of every builder the project uses.
pub fn healthcheck(ctx: &Context) -> Result<HealthReport> {
    healthcheck_with(ctx, find_executable)
}

/// Same as [`healthcheck`] with a custom tool lookup.
pub fn healthcheck_with<F>(ctx: &Context, lookup: F) -> Result<HealthReport>
where
    F: Fn(&str) -> Option<PathBuf>,
{
    let builders: BTreeSet<String> = apply_defaults(ctx)?
        .into_iter()
        .map(|build| build.builder)
        .collect();

    let mut report = HealthReport::default();
    let mut seen = BTreeSet::new();
    for name in builders {
        let builder = ctx.builders.get(&name);
        for tool in dependencies(builder.as_ref()) {
            if !seen.insert(tool.clone()) {
                continue;
            }
            let path = lookup(&tool);
            match &path {
                Some(path) => tracing::debug!(builder = %name, tool = %tool, path = %path.display(), "found"),
                None => tracing::warn!(builder = %name, tool = %tool, "not found"),
            }
            report.checks.push(ToolCheck {
                builder: name.clone(),
                tool,
                path,
            });
        }
    }

    Ok(report)
}

/// Format a health report for display.
pub fn format_report(report: &HealthReport, verbose: bool) -> String {
    let mut output = String::new();

    if report.checks.is_empty() {
        output.push_str("No external tools required.\n");
        return output;
    }

    for check in &report.checks {
        let status = if check.passed() { "[OK]" } else { "[!!]" };
        let _ = writeln!(output, "  {} {} ({})", status, check.tool, check.builder);
        if verbose {
            if let Some(path) = &check.path {
                let _ = writeln!(output, "      Path: {}", path.display());
            }
        }
    }

    output.push('\n');
    if report.all_passed() {
        output.push_str("All tools found.\n");
    } else {
        let _ = writeln!(output, "Missing tools: {}", report.missing().join(", "));
    }
    output
}
