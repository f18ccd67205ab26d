//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Weathermart - build and check the weather mart
#[derive(Parser, Debug)]
#[command(name = "wm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: PathBuf,

    /// Named target from weathermart.yml
    #[arg(short, long, global = true, env = "WM_TARGET")]
    pub target: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render model templates to SQL
    Compile(CompileArgs),

    /// Build models in dependency order
    Run(RunArgs),

    /// Load seed CSV files
    Seed(SeedArgs),

    /// Run data-quality tests
    Test(TestArgs),

    /// List models and sources
    Ls(LsArgs),

    /// Compare the persisted mart with a recomputed join
    Audit(AuditArgs),

    /// Remove generated artifacts
    Clean(CleanArgs),
}

/// Arguments for the compile command
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Model names to compile (comma-separated, default: all)
    #[arg(short, long)]
    pub models: Option<String>,

    /// Override/add variables as JSON
    #[arg(long)]
    pub vars: Option<String>,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Model names to run (comma-separated, default: all)
    #[arg(short, long)]
    pub models: Option<String>,

    /// dbt-style selector (+model, model+)
    #[arg(short, long)]
    pub select: Option<String>,

    /// Drop and recreate incremental models
    #[arg(long)]
    pub full_refresh: bool,

    /// Override/add variables as JSON
    #[arg(long)]
    pub vars: Option<String>,
}

/// Arguments for the seed command
#[derive(Args, Debug)]
pub struct SeedArgs {
    /// Seed names to load (comma-separated, default: all)
    #[arg(long)]
    pub seeds: Option<String>,

    /// Drop existing seed tables first
    #[arg(long)]
    pub full_refresh: bool,
}

/// Arguments for the test command
#[derive(Args, Debug)]
pub struct TestArgs {
    /// Models or sources to test (comma-separated, default: all)
    #[arg(short, long)]
    pub models: Option<String>,

    /// Stop on first failure
    #[arg(long)]
    pub fail_fast: bool,
}

/// Arguments for the ls command
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: LsOutput,

    /// dbt-style selector to filter models
    #[arg(short, long)]
    pub select: Option<String>,
}

/// List output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LsOutput {
    /// Table format
    Table,
    /// JSON output
    Json,
    /// Dependency tree
    Tree,
}

/// Arguments for the audit command
#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Print the audit as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the clean command
#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Show what would be removed without removing it
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
