//! heckle - incremental static site builder.

mod cli;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::{BuildArgs, Cli, Commands};
use heckle::config::BuildOptions;
use heckle::{SiteBuilder, log};
use heckle_core::Dependencies;
use std::path::Path;
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let source = cli
        .source
        .canonicalize()
        .with_context(|| format!("source directory `{}` not found", cli.source.display()))?;
    let target = cli.target.clone().unwrap_or_else(|| source.join("_site"));

    match &cli.command {
        Commands::Build { build_args } => build(&cli, &source, &target, build_args),
        Commands::Deps { path } => {
            let graph = builder(&cli, &source, &target, BuildOptions::default()).open_graph()?;
            for dependency in graph.get_dependencies(path) {
                println!("{dependency}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Affected { paths } => {
            let graph = builder(&cli, &source, &target, BuildOptions::default()).open_graph()?;
            match graph.get_build_list(paths, graph.fingerprint()) {
                Some(list) => list.iter().for_each(|path| println!("{path}")),
                None => bail!("no usable dependency graph, a full build is required"),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build(cli: &Cli, source: &Path, target: &Path, args: &BuildArgs) -> Result<ExitCode> {
    let options = BuildOptions {
        dependency_tracking: !args.no_dependency_tracking,
        incremental: args.incremental,
        mode: args.mode,
        workers: args.workers,
        progress: !args.quiet,
        ..BuildOptions::default()
    };

    let result = builder(cli, source, target, options).build(&args.files);
    if result.is_ok() {
        Ok(ExitCode::SUCCESS)
    } else {
        log!("error"; "build failed after {} ms", result.elapsed_time_ms());
        Ok(ExitCode::FAILURE)
    }
}

fn builder(cli: &Cli, source: &Path, target: &Path, mut options: BuildOptions) -> SiteBuilder {
    options.config_path = cli.config.clone();
    options.dependency_store = cli.dependency_store.clone();
    SiteBuilder::new(source, target).options(options)
}
