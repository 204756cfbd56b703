//! `shipwright check` command

use std::path::Path;

use anyhow::Result;

use super::load_context;
use crate::cli::CheckArgs;
use shipwright::ops::build::apply_defaults;

pub fn execute(args: CheckArgs, project: Option<&Path>) -> Result<()> {
    let (ctx, _config) = load_context(project)?;
    let builds = apply_defaults(&ctx)?;

    if args.show {
        for build in &builds {
            println!("{} ({})", build.id, build.builder);
            println!("  binary:  {}", build.binary);
            println!("  targets: {}", build.targets.join(", "));
            if !build.skip.is_empty() {
                println!("  skip:    {}", build.skip);
            }
        }
    }

    println!("{} build declaration(s) OK", builds.len());
    Ok(())
}
