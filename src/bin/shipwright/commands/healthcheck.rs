//! `shipwright healthcheck` command

use std::path::Path;

use anyhow::{bail, Result};

use super::load_context;
use crate::cli::HealthcheckArgs;
use shipwright::ops::{format_report, healthcheck};

pub fn execute(_args: HealthcheckArgs, project: Option<&Path>) -> Result<()> {
    let (ctx, _config) = load_context(project)?;
    let report = healthcheck(&ctx)?;

    let verbose = tracing::enabled!(tracing::Level::DEBUG);
    print!("{}", format_report(&report, verbose));

    if !report.all_passed() {
        bail!("missing tools: {}", report.missing().join(", "));
    }
    Ok(())
}
