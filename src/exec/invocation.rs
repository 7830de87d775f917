// src/exec/invocation.rs

//! What to run and how: the command, its arguments and per-call options.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::anyhow;

use crate::errors::{Result, ScriptError};
use crate::exec::result::RunResult;
use crate::exec::runner::ScriptRunner;
use crate::types::LaunchMode;

/// A command as given by the caller.
///
/// `Line` is a single string: one program name, or a whole command line when
/// `shell` is requested. `Argv` is an explicit argument vector whose first
/// element names the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Line(OsString),
    Argv(Vec<OsString>),
}

impl Command {
    /// Argument vector for this command.
    ///
    /// With `shell`, a `Line` is split with POSIX shell rules.
    pub fn argv(&self, shell: bool) -> Result<Vec<OsString>> {
        let argv = match self {
            Command::Line(line) if shell => {
                let line = line.to_string_lossy();
                shlex::split(&line)
                    .ok_or_else(|| anyhow!("unbalanced quoting in command line: {line}"))?
                    .into_iter()
                    .map(OsString::from)
                    .collect()
            }
            Command::Line(line) => vec![line.clone()],
            Command::Argv(argv) => argv.clone(),
        };
        if argv.is_empty() {
            return Err(ScriptError::EmptyCommand);
        }
        Ok(argv)
    }

    /// Command line handed to the shell in `shell` mode.
    pub fn shell_line(&self) -> Result<String> {
        match self {
            Command::Line(line) => Ok(line.to_string_lossy().into_owned()),
            Command::Argv(argv) => {
                let parts: Vec<String> = argv
                    .iter()
                    .map(|a| a.to_string_lossy().into_owned())
                    .collect();
                shlex::try_join(parts.iter().map(String::as_str))
                    .map_err(|e| ScriptError::Other(anyhow!("cannot quote command: {e}")))
            }
        }
    }

    pub(crate) fn extend<I, S>(self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut argv = match self {
            Command::Line(line) => vec![line],
            Command::Argv(argv) => argv,
        };
        argv.extend(extra.into_iter().map(Into::into));
        Command::Argv(argv)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Line(line) => write!(f, "{}", line.to_string_lossy()),
            Command::Argv(argv) => {
                let parts: Vec<_> = argv.iter().map(|a| a.to_string_lossy()).collect();
                write!(f, "{}", parts.join(" "))
            }
        }
    }
}

impl From<&str> for Command {
    fn from(s: &str) -> Self {
        Command::Line(s.into())
    }
}

impl From<String> for Command {
    fn from(s: String) -> Self {
        Command::Line(s.into())
    }
}

impl From<&OsStr> for Command {
    fn from(s: &OsStr) -> Self {
        Command::Line(s.to_owned())
    }
}

impl From<&Path> for Command {
    fn from(p: &Path) -> Self {
        Command::Line(p.as_os_str().to_owned())
    }
}

impl From<PathBuf> for Command {
    fn from(p: PathBuf) -> Self {
        Command::Line(p.into_os_string())
    }
}

impl From<&PathBuf> for Command {
    fn from(p: &PathBuf) -> Self {
        Command::Line(p.as_os_str().to_owned())
    }
}

impl<S: Into<OsString>> From<Vec<S>> for Command {
    fn from(argv: Vec<S>) -> Self {
        Command::Argv(argv.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<OsString>, const N: usize> From<[S; N]> for Command {
    fn from(argv: [S; N]) -> Self {
        Command::Argv(argv.into_iter().map(Into::into).collect())
    }
}

/// One request to run a script.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: Command,
    pub cwd: Option<PathBuf>,
    /// Full replacement of the environment; `None` inherits it.
    pub env: Option<BTreeMap<OsString, OsString>>,
    /// Stdin content; `None` means an empty stdin.
    pub stdin: Option<Vec<u8>>,
    pub check: bool,
    /// Per-call override of automatic printing.
    pub print_result: Option<bool>,
    pub shell: bool,
    /// Subprocess only.
    pub timeout: Option<Duration>,
    /// Mode the invocation ran in; filled by the runner.
    pub launch_mode: Option<LaunchMode>,
}

impl Invocation {
    pub fn new(command: impl Into<Command>) -> Self {
        Self {
            command: command.into(),
            cwd: None,
            env: None,
            stdin: None,
            check: false,
            print_result: None,
            shell: false,
            timeout: None,
            launch_mode: None,
        }
    }
}

/// Builder returned by [`ScriptRunner::command`].
///
/// ```no_run
/// # fn demo(runner: &console_scripts::ScriptRunner) -> console_scripts::errors::Result<()> {
/// let result = runner
///     .command(["my-tool", "--verbose"])
///     .env([("HOME", "/tmp/home")])
///     .stdin("input\n")
///     .run()?;
/// assert!(result.success());
/// # Ok(())
/// # }
/// ```
#[must_use = "a RunBuilder does nothing until `run` is called"]
pub struct RunBuilder<'r> {
    runner: &'r ScriptRunner,
    invocation: Invocation,
}

impl<'r> RunBuilder<'r> {
    pub(crate) fn new(runner: &'r ScriptRunner, command: Command) -> Self {
        Self {
            runner,
            invocation: Invocation::new(command),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.invocation.command = self.invocation.command.extend([arg]);
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.invocation.command = self.invocation.command.extend(args);
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.invocation.cwd = Some(dir.into());
        self
    }

    /// Replace the environment of the script entirely.
    pub fn env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        self.invocation.env = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn stdin(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.invocation.stdin = Some(content.into());
        self
    }

    /// Fail with [`ScriptError::CalledProcess`] on a non-zero exit code.
    pub fn check(mut self, check: bool) -> Self {
        self.invocation.check = check;
        self
    }

    pub fn print_result(mut self, print: bool) -> Self {
        self.invocation.print_result = Some(print);
        self
    }

    /// Run through the system shell. Subprocess mode only.
    pub fn shell(mut self, shell: bool) -> Self {
        self.invocation.shell = shell;
        self
    }

    /// Kill the child after `timeout`. Ignored in in-process mode.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.invocation.timeout = Some(timeout);
        self
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    pub fn run(self) -> Result<RunResult> {
        self.runner.execute(self.invocation)
    }
}
