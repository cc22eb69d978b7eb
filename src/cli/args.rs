//! CLI argument definitions using clap.
//!
//! ## Commands
//!
//! - `print-config`: Resolve and print the configuration for one file
//! - `files`: List the files a set of patterns expands to, with status flags

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Command,
}

/// Common arguments shared by all commands.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Additional config file, applied above discovered configs
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Disable per-directory config file discovery
    #[arg(long = "no-rc")]
    pub no_rc: bool,

    /// File extensions picked up when walking directories
    #[arg(long, value_delimiter = ',', default_value = ".js")]
    pub ext: Vec<String>,

    /// Glob pattern of paths to ignore (repeatable)
    #[arg(long = "ignore-pattern")]
    pub ignore_pattern: Vec<String>,

    /// Working directory for discovery and relative patterns
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Fall back to the personal config in the home directory when a
    /// project has none
    #[arg(long)]
    pub personal: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Args)]
pub struct PrintConfigCommand {
    /// The file to resolve configuration for
    pub file: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Args)]
pub struct FilesCommand {
    /// Files, directories or glob patterns
    #[arg(required = true)]
    pub patterns: Vec<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the fully-resolved configuration for a single file
    PrintConfig(PrintConfigCommand),
    /// List the files the given patterns expand to, with their status
    Files(FilesCommand),
}
