//! `shipwright builders` command

use anyhow::Result;

use crate::cli::BuildersArgs;
use shipwright::builder::{get_builder_summaries, BuilderRegistry, DEFAULT_BUILDER};

pub fn execute(_args: BuildersArgs) -> Result<()> {
    let registry = BuilderRegistry::with_builtins();

    println!("Available builders:\n");
    for summary in get_builder_summaries(&registry) {
        let default = if summary.name == DEFAULT_BUILDER {
            " (default)"
        } else {
            ""
        };
        println!("  {}{}", summary.name, default);

        let mut capabilities = Vec::new();
        if summary.prepares {
            capabilities.push("prepare");
        }
        if summary.fixes_targets {
            capabilities.push("partial targets");
        }
        capabilities.push(if summary.concurrent {
            "concurrent"
        } else {
            "serial"
        });
        println!("    capabilities: {}", capabilities.join(", "));

        if !summary.dependencies.is_empty() {
            println!("    requires:     {}", summary.dependencies.join(", "));
        }
    }

    Ok(())
}
