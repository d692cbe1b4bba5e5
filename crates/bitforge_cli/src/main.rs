//! Bitforge CLI: incremental C/C++ to LLVM bitcode builds.
//!
//! Provides `bitforge build` to compile and link build groups, `bitforge deps`
//! to inspect or refresh dependency records, and `bitforge clean` to remove a
//! group's outputs.

#![warn(missing_docs)]

mod build;
mod clean;
mod deps;
mod logging;
mod project;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Bitforge: compiles C/C++ sources to LLVM bitcode, rebuilding only what changed.
#[derive(Parser, Debug)]
#[command(name = "bitforge", version, about = "Incremental LLVM bitcode builds")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `bitforge.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile and link build groups.
    Build(BuildArgs),
    /// Show (or refresh) each source's recorded header dependencies.
    Deps(DepsArgs),
    /// Remove the bitcode outputs of build groups.
    Clean(CleanArgs),
}

/// Arguments for the `bitforge build` subcommand.
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Build only this group (default: every group).
    #[arg(short, long)]
    pub group: Option<String>,

    /// Maximum number of concurrent compiler invocations.
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Compile only; do not link modules.
    #[arg(long)]
    pub skip_link: bool,

    /// Output format for the build summary.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `bitforge deps` subcommand.
#[derive(Parser, Debug)]
pub struct DepsArgs {
    /// Inspect only this group (default: every group).
    #[arg(short, long)]
    pub group: Option<String>,

    /// Re-run dependency extraction for stale sources before printing.
    #[arg(long)]
    pub refresh: bool,
}

/// Arguments for the `bitforge clean` subcommand.
#[derive(Parser, Debug)]
pub struct CleanArgs {
    /// Clean only this group (default: every group).
    #[arg(short, long)]
    pub group: Option<String>,
}

/// Build summary format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable status lines.
    Text,
    /// Machine-readable JSON on stdout.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    logging::init(&global);

    let result = match cli.command {
        Command::Build(ref args) => build::run(args, &global),
        Command::Deps(ref args) => deps::run(args, &global),
        Command::Clean(ref args) => clean::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
