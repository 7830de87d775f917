// src/errors.rs

//! Crate-wide error type and result alias.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptError {
    /// The command name matched no installed command, executable or script.
    #[error("Script not found: {name} (searched: {})", display_paths(.searched))]
    ScriptNotFound { name: String, searched: Vec<PathBuf> },

    /// In-process mode was requested for something that cannot be called
    /// inside this process.
    #[error("Cannot run in-process: {name}: {reason}")]
    CannotRunInProcess { name: String, reason: String },

    #[error("shell=true is only supported in subprocess mode (command: {0})")]
    ShellInProcess(String),

    #[error("Invalid script launch mode: {0} (expected inprocess, subprocess or both)")]
    InvalidLaunchMode(String),

    #[error("Empty command line")]
    EmptyCommand,

    /// `check` was requested and the script exited with a non-zero code.
    #[error("Command {} returned non-zero exit status {code}", display_argv(.argv))]
    CalledProcess {
        code: i32,
        argv: Vec<OsString>,
        stdout: String,
        stderr: String,
    },

    #[error("Command {} timed out after {timeout:?}", display_argv(.argv))]
    Timeout { argv: Vec<OsString>, timeout: Duration },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn display_argv(argv: &[OsString]) -> String {
    let parts: Vec<String> = argv
        .iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    format!("{parts:?}")
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ScriptError>;
