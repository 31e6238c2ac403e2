//! CLI argument parsing for Vigia

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Rendering used for report files and remote payloads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One `<id>, <count>` line per syscall (default)
    #[default]
    Text,
    /// JSON document with records and validation report
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "vigia")]
#[command(version)]
#[command(about = "Tally syscalls per thread and validate them against a whitelist", long_about = None)]
pub struct Cli {
    /// Whitelist file of authorized syscall numbers
    #[arg(short = 'w', long = "whitelist", value_name = "PATH")]
    pub whitelist: Option<PathBuf>,

    /// Directory for per-thread report files
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Report format (text or json)
    #[arg(long = "format", value_enum)]
    pub format: Option<OutputFormat>,

    /// Collector endpoint for remote export
    #[arg(long = "remote", value_name = "URL")]
    pub remote: Option<String>,

    /// Disable remote export
    #[arg(long = "no-remote", conflicts_with = "remote")]
    pub no_remote: bool,

    /// Do not print per-thread summaries to stderr
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Exit with status 1 if any thread used a syscall outside the whitelist
    #[arg(long = "strict")]
    pub strict: bool,

    /// Follow forks (observe threads of child processes)
    #[arg(short = 'f', long = "follow-forks")]
    pub follow_forks: bool,

    /// TOML configuration file
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging to stderr
    #[arg(long = "debug")]
    pub debug: bool,

    /// Command to observe (everything after --)
    #[arg(last = true)]
    pub command: Option<Vec<String>>,
}
