//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use heckle::config::BuildMode;
use std::path::PathBuf;

/// Incremental static site builder
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Site source directory
    #[arg(short, long, default_value = ".", global = true)]
    pub source: PathBuf,

    /// Output directory (default: `<source>/_site`)
    #[arg(short, long, global = true)]
    pub target: Option<PathBuf>,

    /// Site config file; discovered in the source directory when omitted
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Dependency store path (default: `<source>.dependencies` beside the source)
    #[arg(long, global = true)]
    pub dependency_store: Option<PathBuf>,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Build arguments
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Changed source files; only documents they affect are rebuilt
    pub files: Vec<String>,

    /// Keep the target tree and previously recorded dependencies
    #[arg(short, long)]
    pub incremental: bool,

    /// Do not record or read dependencies
    #[arg(long)]
    pub no_dependency_tracking: bool,

    /// Render documents one at a time or through the worker pool
    #[arg(short, long, value_enum, default_value_t = BuildMode::Parallel)]
    pub mode: BuildMode,

    /// Concurrent render workers
    #[arg(short, long, default_value_t = 20)]
    pub workers: usize,

    /// Plain log lines instead of progress bars
    #[arg(short, long)]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build the site, incrementally when changed files are given
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Print the recorded dependencies of a source path
    Deps {
        /// Path relative to the source directory
        path: String,
    },

    /// Print the documents a set of changed paths would rebuild
    Affected {
        /// Paths relative to the source directory
        #[arg(required = true)]
        paths: Vec<String>,
    },
}
