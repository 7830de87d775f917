// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::LaunchModeSetting;

/// Command-line arguments for `console-scripts`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "console-scripts",
    version,
    about = "Run command-line scripts in-process or as subprocesses and report their results.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CONSOLE_SCRIPTS_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Run a script and print its result.
    Run(RunArgs),
    /// Show what a command name resolves to.
    Which(WhichArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// How to run the script: inprocess, subprocess or both.
    ///
    /// Overrides `script_launch_mode` from the config file.
    #[arg(long, value_name = "inprocess|subprocess|both")]
    pub script_launch_mode: Option<LaunchModeSetting>,

    /// Don't print run results.
    #[arg(long)]
    pub hide_run_results: bool,

    /// Working directory for the script.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Set an environment variable for the script (repeatable).
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Start from an empty environment instead of the current one.
    #[arg(long)]
    pub clean_env: bool,

    /// File whose content is fed to the script's stdin.
    #[arg(long, value_name = "PATH")]
    pub stdin_file: Option<PathBuf>,

    /// Exit with an error if the script fails.
    #[arg(long)]
    pub check: bool,

    /// Run the command line through the system shell (subprocess only).
    #[arg(long)]
    pub shell: bool,

    /// Kill the script after this many seconds (subprocess only).
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Command and its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct WhichArgs {
    /// Command name to resolve.
    pub name: String,

    /// Directory to resolve relative names against.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
