// src/exec/subprocess.rs

//! Subprocess execution with `std::process::Command`.

use std::ffi::OsString;
use std::io::{Read, Write};
use std::process::{Child, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::errors::{Result, ScriptError};
use crate::exec::invocation::Invocation;
use crate::exec::Captured;
use crate::locate::{self, Target};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Run `target` as a child process and wait for it.
///
/// `argv` is the caller's argument vector; its first element (the command
/// name) is replaced by the target's program prefix.
pub fn run_subprocess(target: &Target, invocation: &Invocation, argv: &[OsString]) -> Result<Captured> {
    let program_argv = if invocation.shell {
        shell_argv(invocation.command.shell_line()?)
    } else {
        let mut full = target.subprocess_prefix().ok_or_else(|| ScriptError::ScriptNotFound {
            name: argv
                .first()
                .map(|a| a.to_string_lossy().into_owned())
                .unwrap_or_default(),
            searched: locate::search_dirs(invocation.env.as_ref()),
        })?;
        full.extend(argv.iter().skip(1).cloned());
        full
    };

    let (program, args) = program_argv
        .split_first()
        .ok_or(ScriptError::EmptyCommand)?;

    let mut cmd = std::process::Command::new(program);
    cmd.args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if invocation.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
    if let Some(dir) = &invocation.cwd {
        cmd.current_dir(dir);
    }
    if let Some(env) = &invocation.env {
        cmd.env_clear().envs(env);
    }
    // Own process group, so a timeout also reaches grandchildren that hold
    // the output pipes.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    info!(argv = ?program_argv, cwd = ?invocation.cwd, "starting script process");

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for '{}'", invocation.command))?;

    let stdin_writer = match (child.stdin.take(), invocation.stdin.clone()) {
        (Some(mut pipe), Some(data)) => Some(thread::spawn(move || {
            // The child may exit without reading its input.
            if let Err(e) = pipe.write_all(&data) {
                debug!(error = %e, "child closed stdin early");
            }
        })),
        _ => None,
    };
    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let status = match invocation.timeout {
        Some(timeout) => wait_with_timeout(&mut child, timeout)?,
        None => Some(child.wait().context("waiting for script process")?),
    };

    if let Some(handle) = stdin_writer {
        let _ = handle.join();
    }
    let stdout = join_reader(stdout_reader);
    let stderr = join_reader(stderr_reader);

    let Some(status) = status else {
        warn!(argv = ?program_argv, "script process timed out and was killed");
        return Err(ScriptError::Timeout {
            argv: program_argv,
            timeout: invocation.timeout.unwrap_or_default(),
        });
    };

    let returncode = exit_code(status);
    info!(
        argv = ?program_argv,
        exit_code = returncode,
        success = status.success(),
        "script process exited"
    );

    Ok(Captured {
        returncode,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}

/// Build a shell command appropriate for the platform.
fn shell_argv(line: String) -> Vec<OsString> {
    if cfg!(windows) {
        vec!["cmd".into(), "/C".into(), line.into()]
    } else {
        vec!["sh".into(), "-c".into(), line.into()]
    }
}

fn spawn_reader<R>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            if let Err(e) = pipe.read_to_end(&mut buf) {
                debug!(error = %e, "error reading script output");
            }
            buf
        })
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// Wait for `child`, killing it once `timeout` has elapsed.
///
/// Returns `None` when the child had to be killed.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().context("polling script process")? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            kill_tree(child);
            child.wait().context("reaping killed script process")?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill `child` and everything in its process group.
#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let pgid = Pid::from_raw(child.id() as i32);
    if let Err(e) = killpg(pgid, Signal::SIGKILL) {
        warn!(error = %e, "failed to kill script process group");
        if let Err(e) = child.kill() {
            warn!(error = %e, "failed to kill timed out script process");
        }
    }
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!(error = %e, "failed to kill timed out script process");
    }
}

/// Exit code of a finished child; signal deaths map to the negated signal
/// number.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}
