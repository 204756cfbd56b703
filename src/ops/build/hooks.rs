//! Pre and post build hooks.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context as _, Result};

use crate::builder::trait_def::BuildOptions;
use crate::core::build::{BuildDeclaration, Hook};
use crate::util::context::Context;
use crate::util::fs::absolutize;
use crate::util::process::{split_command, ProcessBuilder};
use crate::util::template::Template;

/// Run `hooks` in order for one target, stopping at the first failure.
///
/// Each hook sees the run environment, the declaration's `env` and its own
/// `env`, in increasing precedence. Command, directory and env entries are
/// templates bound to the target's build options.
pub fn run_hooks(
    ctx: &Context,
    build: &BuildDeclaration,
    options: &BuildOptions,
    hooks: &[Hook],
) -> Result<()> {
    if hooks.is_empty() {
        return Ok(());
    }

    let template = Template::new(ctx)
        .with_build_options(options)
        .with_env(&build.env)?;

    for hook in hooks {
        run_hook(ctx, &template, hook)?;
    }
    Ok(())
}

fn run_hook(ctx: &Context, template: &Template, hook: &Hook) -> Result<()> {
    let template = template.clone().with_env(&hook.env)?;
    let env: &BTreeMap<String, String> = template.env();

    let line = template.apply(&hook.cmd)?;
    let dir = template.apply(&hook.dir)?;

    let argv =
        split_command(&line).with_context(|| format!("invalid hook command `{line}`"))?;
    let Some((program, args)) = argv.split_first() else {
        bail!("hook command is empty");
    };

    let cwd = if dir.is_empty() {
        ctx.root.clone()
    } else {
        absolutize(&ctx.root, Path::new(&dir))
    };
    let process = ProcessBuilder::new(program)
        .args(args)
        .env_clear()
        .envs(env)
        .cwd(cwd);

    tracing::info!(hook = %line, "running hook");
    let output = if hook.output {
        let name = line.clone();
        process.exec_streaming(&ctx.cancellation, move |out| {
            tracing::info!(hook = %name, "{out}");
        })?
    } else {
        process.exec(&ctx.cancellation)?
    };
    let output = process.check(output)?;

    let output = output.trim_end();
    if !hook.output && !output.is_empty() {
        tracing::debug!(hook = %line, "{output}");
    }
    Ok(())
}
