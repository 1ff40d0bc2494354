//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Build pipeline for the native extension module.
#[derive(Parser)]
#[command(name = "slipway", version, about)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline and assemble the package
    Build(BuildArgs),

    /// Show what a build would do, without running any tool
    Plan(PlanArgs),

    /// Remove the intermediate build tree
    Clean(CleanArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Path to slipway.toml (defaults to ./slipway.toml)
    #[arg(long, value_name = "PATH")]
    pub manifest_path: Option<PathBuf>,

    /// Emit compile_commands.json into the build directory
    #[arg(long)]
    pub emit_compile_commands: bool,
}

#[derive(Args)]
pub struct PlanArgs {
    /// Path to slipway.toml (defaults to ./slipway.toml)
    #[arg(long, value_name = "PATH")]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Path to slipway.toml (defaults to ./slipway.toml)
    #[arg(long, value_name = "PATH")]
    pub manifest_path: Option<PathBuf>,
}
