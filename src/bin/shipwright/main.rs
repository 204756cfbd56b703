//! Shipwright CLI - a release-engineering build orchestrator

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("shipwright=debug")
    } else {
        EnvFilter::new("shipwright=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let project = cli.config.as_deref();
    match cli.command {
        Commands::Build(args) => commands::build::execute(args, project),
        Commands::Check(args) => commands::check::execute(args, project),
        Commands::Healthcheck(args) => commands::healthcheck::execute(args, project),
        Commands::Builders(args) => commands::builders::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
