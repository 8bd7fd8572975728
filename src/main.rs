//! datalab-metadata
//!
//! Resolves a metadata profile from layered YAML files and prints it, its
//! diagnostics, or the profiles available.

use anyhow::Result;
use clap::Parser;
use datalab_metadata::cli::{Cli, Command, LoadArgs, SourceArgs};
use datalab_metadata::diagnostics::has_errors;
use datalab_metadata::format::{format_diagnostics, format_metadata, format_profiles};
use datalab_metadata::metadata::{LoadOptions, MetadataLoader, read_sources};
use std::fs::OpenOptions;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on --log option; RUST_LOG overrides the level
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter())
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    match cli.command {
        Command::Resolve(args) => run_resolve(&args),
        Command::Check(args) => run_check(&args),
        Command::Profiles(args) => run_profiles(&args),
    }
}

fn run_resolve(args: &LoadArgs) -> Result<ExitCode> {
    let loader = MetadataLoader::load_with_options(args.to_options())?;
    print!("{}", format_metadata(loader.metadata(), args.format)?);
    Ok(ExitCode::SUCCESS)
}

fn run_check(args: &LoadArgs) -> Result<ExitCode> {
    let loader = MetadataLoader::load_with_options(args.to_options())?;
    let diagnostics = loader.diagnostics();

    if diagnostics.is_empty() {
        println!(
            "profile '{}' is valid ({} rendering pass(es))",
            loader.profile(),
            loader.render_passes()
        );
    } else {
        print!("{}", format_diagnostics(diagnostics));
    }

    if has_errors(diagnostics) {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn run_profiles(args: &SourceArgs) -> Result<ExitCode> {
    let mut options = LoadOptions::discover();
    args.apply(&mut options);

    let sources = options.sources();
    let outcome = read_sources(&sources);
    print!("{}", format_profiles(&sources, outcome.profiles.names()));
    if !outcome.diagnostics.is_empty() {
        eprint!("{}", format_diagnostics(&outcome.diagnostics));
    }
    Ok(ExitCode::SUCCESS)
}
