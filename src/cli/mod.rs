//! CLI command definitions for datalab-metadata
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::format::OutputFormat;
use crate::metadata::LoadOptions;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Layered metadata loader: merge, inherit, render and validate profiles
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resolved metadata of a profile
    Resolve(LoadArgs),

    /// Resolve a profile and report diagnostics only
    Check(LoadArgs),

    /// List the profiles found in the metadata files
    Profiles(SourceArgs),
}

/// Which files to read.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Metadata files, lowest priority first (default: $DATALAB_METADATA_FILES)
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Do not prepend the bundled factory defaults
    #[arg(long)]
    pub no_factory_defaults: bool,
}

/// Arguments for resolving one profile.
#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
    #[command(flatten)]
    pub sources: SourceArgs,

    /// Profile to resolve (default: $DATALAB_PROFILE or "default")
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Dotenv file loaded before rendering
    #[arg(short = 'e', long, value_name = "FILE")]
    pub dotenv: Option<PathBuf>,

    /// Maximum rendering passes
    #[arg(long, value_name = "N")]
    pub max_passes: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,
}

impl SourceArgs {
    /// Apply file arguments over discovered options.
    pub fn apply(&self, options: &mut LoadOptions) {
        if !self.files.is_empty() {
            options.files = self.files.clone();
        }
        if self.no_factory_defaults {
            options.factory_defaults = false;
        }
    }
}

impl LoadArgs {
    /// Discovered options with command-line values layered on top.
    pub fn to_options(&self) -> LoadOptions {
        let mut options = LoadOptions::discover();
        self.sources.apply(&mut options);
        if let Some(ref profile) = self.profile {
            options.profile = profile.clone();
        }
        if let Some(ref dotenv) = self.dotenv {
            options.dotenv_path = Some(dotenv.clone());
        }
        if let Some(max_passes) = self.max_passes {
            options.max_passes = max_passes;
        }
        options
    }
}
