//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Shipwright - build release binaries for many toolchains and targets
#[derive(Parser)]
#[command(name = "shipwright")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project file to use (defaults to the nearest Shipwright.toml)
    #[arg(short = 'f', long, global = true, env = "SHIPWRIGHT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build every target of every declaration
    Build(BuildArgs),

    /// Validate the project file without building
    Check(CheckArgs),

    /// Check that the tools the project's builders need are installed
    Healthcheck(HealthcheckArgs),

    /// List the available builders
    Builders(BuildersArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Maximum number of targets built at once
    #[arg(short, long)]
    pub parallelism: Option<usize>,

    /// Build only one target: the given one, or the host's when no value is given
    #[arg(long, num_args = 0..=1, value_name = "TARGET")]
    pub single_target: Option<Option<String>>,

    /// Only build the declarations with these IDs
    #[arg(long = "id", value_name = "ID")]
    pub ids: Vec<String>,

    /// Do not run post-build hooks
    #[arg(long)]
    pub skip_post_hooks: bool,

    /// Cancel every running tool after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Print every defaulted declaration
    #[arg(long)]
    pub show: bool,
}

#[derive(Args)]
pub struct HealthcheckArgs {}

#[derive(Args)]
pub struct BuildersArgs {}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
