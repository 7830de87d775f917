// src/lib.rs

//! Run command-line scripts under test, either as subprocesses or inside the
//! test process.
//!
//! - [`locate`] resolves a command name to a [`Target`].
//! - [`exec`] runs a target in one [`LaunchMode`] and returns a [`RunResult`].
//! - [`config`] holds session settings and launch mode resolution.
//! - [`testing`] wires runners into `#[test]` functions via [`script_test!`].

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod locate;
pub mod logging;
pub mod testing;
pub mod types;

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

pub use crate::errors::ScriptError;
pub use crate::exec::{
    CaptureBuffer, Command, ExitRequest, Invocation, RunBuilder, RunResult, ScriptContext,
    ScriptExit, ScriptResult, ScriptRunner,
};
pub use crate::locate::{
    install_command, install_entry_point, register_engine, CommandRegistry, EntryPoint, Locator,
    ScriptEngine, Target,
};
pub use crate::types::{LaunchMode, LaunchModeSetting};

use crate::cli::{CliArgs, CliCommand, RunArgs, WhichArgs};
use crate::config::Session;

/// High-level entry point used by `main.rs`.
///
/// Returns the exit code the process should end with.
pub fn run(args: CliArgs) -> Result<i32> {
    match args.command {
        CliCommand::Run(run_args) => run_command(run_args),
        CliCommand::Which(which_args) => which_command(which_args),
    }
}

fn run_command(args: RunArgs) -> Result<i32> {
    let session = Session::from_env()?;
    let session = Session::new(
        session.config,
        args.script_launch_mode.or(session.option_mode),
        args.hide_run_results || session.hide_run_results,
    );
    let setting = session.launch_mode(None);
    debug!(%setting, "effective launch mode");

    let root_dir = std::env::current_dir()?;
    let env = build_env(&args);
    let stdin = match &args.stdin_file {
        Some(path) => Some(
            std::fs::read(path).with_context(|| format!("reading stdin file {}", path.display()))?,
        ),
        None => None,
    };

    // `--shell -- "a | b"` is one command line, not a one-word program.
    let command = match args.command.as_slice() {
        [line] if args.shell => Command::Line(line.into()),
        words => Command::from(words.to_vec()),
    };

    let mut exit_code = 0;
    for &mode in setting.modes() {
        let runner = ScriptRunner::from_session(&session, mode, &root_dir);
        let mut builder = runner
            .command(command.clone())
            .check(args.check)
            .shell(args.shell);
        if let Some(dir) = &args.cwd {
            builder = builder.cwd(dir);
        }
        if let Some(env) = &env {
            builder = builder.env(env.clone());
        }
        if let Some(stdin) = &stdin {
            builder = builder.stdin(stdin.clone());
        }
        if let Some(secs) = args.timeout {
            builder = builder.timeout(Duration::try_from_secs_f64(secs)?);
        }

        let code = match builder.run() {
            Ok(result) => result.returncode(),
            // Already printed by the runner.
            Err(ScriptError::CalledProcess { code, .. }) => code,
            Err(err) => return Err(err.into()),
        };
        if exit_code == 0 {
            exit_code = code;
        }
    }

    Ok(exit_code)
}

/// Environment override requested on the command line, if any.
fn build_env(args: &RunArgs) -> Option<BTreeMap<OsString, OsString>> {
    if args.env.is_empty() && !args.clean_env {
        return None;
    }
    let mut env: BTreeMap<OsString, OsString> = if args.clean_env {
        BTreeMap::new()
    } else {
        std::env::vars_os().collect()
    };
    for (key, value) in &args.env {
        env.insert(key.into(), value.into());
    }
    Some(env)
}

fn which_command(args: WhichArgs) -> Result<i32> {
    let session = Session::from_env()?;
    let root_dir = std::env::current_dir()?;
    let runner = ScriptRunner::from_session(&session, LaunchMode::SubProcess, root_dir);

    match runner.resolve(&args.name, args.cwd.as_deref(), None) {
        Ok(target) => {
            println!("{target}");
            Ok(0)
        }
        Err(err @ ScriptError::ScriptNotFound { .. }) => {
            eprintln!("{err}");
            Ok(1)
        }
        Err(err) => Err(err.into()),
    }
}
