// src/exec/runner.rs

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::model::default_interpreters;
use crate::config::Session;
use crate::errors::{Result, ScriptError};
use crate::exec::invocation::{Command, Invocation, RunBuilder};
use crate::exec::result::RunResult;
use crate::exec::{inprocess, isolation, subprocess};
use crate::locate::{self, CommandRegistry, Locator, Target};
use crate::types::LaunchMode;

/// Runs scripts under test in one concrete launch mode.
///
/// Resolution happens before any output is captured; a command that cannot
/// be resolved yields an error, never a [`RunResult`].
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    launch_mode: LaunchMode,
    root_dir: PathBuf,
    print_result: bool,
    registry: Option<CommandRegistry>,
    interpreters: BTreeMap<String, Vec<String>>,
}

impl ScriptRunner {
    pub fn new(launch_mode: LaunchMode, root_dir: impl Into<PathBuf>, print_result: bool) -> Self {
        Self {
            launch_mode,
            root_dir: root_dir.into(),
            print_result,
            registry: None,
            interpreters: default_interpreters(),
        }
    }

    /// Runner configured from the session settings.
    pub fn from_session(session: &Session, launch_mode: LaunchMode, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            launch_mode,
            root_dir: root_dir.into(),
            print_result: !session.hide_run_results,
            registry: None,
            interpreters: session.config.interpreters.clone(),
        }
    }

    /// Use `registry` instead of the process-wide installed commands.
    pub fn with_registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_interpreters(mut self, interpreters: BTreeMap<String, Vec<String>>) -> Self {
        self.interpreters = interpreters;
        self
    }

    pub fn launch_mode(&self) -> LaunchMode {
        self.launch_mode
    }

    /// Scratch directory for the test using this runner.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn prints_results(&self) -> bool {
        self.print_result
    }

    /// Start building a run of `command`.
    pub fn command(&self, command: impl Into<Command>) -> RunBuilder<'_> {
        RunBuilder::new(self, command.into())
    }

    /// Run `command` with default options.
    pub fn run(&self, command: impl Into<Command>) -> Result<RunResult> {
        self.command(command).run()
    }

    /// Run `command` followed by `arguments`.
    #[deprecated(
        note = "pass the command and its arguments as one sequence: `runner.run([cmd, arg1, arg2])`"
    )]
    pub fn run_with<I, S>(&self, command: impl Into<Command>, arguments: I) -> Result<RunResult>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let command = command.into();
        warn!(
            %command,
            "script commands should be passed as a single sequence, not as multiple arguments"
        );
        self.command(command.extend(arguments)).run()
    }

    /// Resolve `name` the way a run from `cwd` with `env` would.
    pub fn resolve(
        &self,
        name: impl AsRef<OsStr>,
        cwd: Option<&Path>,
        env: Option<&BTreeMap<OsString, OsString>>,
    ) -> Result<Target> {
        let registry = self.registry();
        Locator::new(&registry, &self.interpreters).resolve(name.as_ref(), cwd, env)
    }

    fn registry(&self) -> Cow<'_, CommandRegistry> {
        match &self.registry {
            Some(registry) => Cow::Borrowed(registry),
            None => Cow::Owned(locate::installed()),
        }
    }

    /// Resolve and run one invocation.
    pub fn execute(&self, mut invocation: Invocation) -> Result<RunResult> {
        invocation.launch_mode = Some(self.launch_mode);
        let print = invocation.print_result.unwrap_or(self.print_result);

        if print {
            println!("# Running console script: {}", invocation.command);
        }

        if invocation.shell && self.launch_mode == LaunchMode::InProcess {
            return Err(ScriptError::ShellInProcess(invocation.command.to_string()));
        }

        let argv = invocation.command.argv(invocation.shell)?;
        let registry = self.registry();

        // Resolution and spawning read the process-wide cwd and PATH.
        let captured = {
            let _state = isolation::hold_process_state();
            let target = Locator::new(&registry, &self.interpreters).resolve(
                &argv[0],
                invocation.cwd.as_deref(),
                invocation.env.as_ref(),
            )?;
            debug!(mode = %self.launch_mode, %target, "dispatching script run");

            match self.launch_mode {
                LaunchMode::InProcess => {
                    inprocess::run_inprocess(&target, &invocation, argv, &registry)?
                }
                LaunchMode::SubProcess => subprocess::run_subprocess(&target, &invocation, &argv)?,
            }
        };

        let result = RunResult::new(
            captured.returncode,
            captured.stdout,
            captured.stderr,
            invocation,
        );

        if print {
            result.print();
        }

        if result.invocation().check && !result.success() {
            // Output must be visible before the failure is reported.
            if !print {
                result.print();
            }
            let argv = result.invocation().command.argv(result.invocation().shell)?;
            return Err(ScriptError::CalledProcess {
                code: result.returncode(),
                argv,
                stdout: result.stdout().to_string(),
                stderr: result.stderr().to_string(),
            });
        }

        Ok(result)
    }
}

impl fmt::Display for ScriptRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<ScriptRunner {}>", self.launch_mode)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serial_test::serial;

    use super::*;
    use crate::exec::context::ScriptExit;

    fn runner(mode: LaunchMode) -> ScriptRunner {
        let mut registry = CommandRegistry::new();
        registry
            .install("hello", |ctx| {
                writeln!(ctx.stdout(), "hello")?;
                Ok(())
            })
            .install("fail", |ctx| {
                writeln!(ctx.stdout(), "partial")?;
                Err(ScriptExit::code(2))
            })
            .install("echo-args", |ctx| {
                let args = ctx.args().join(",");
                writeln!(ctx.stdout(), "{args}")?;
                Ok(())
            });
        ScriptRunner::new(mode, std::env::temp_dir(), false).with_registry(registry)
    }

    #[test]
    #[serial]
    fn hello_scenario() {
        let result = runner(LaunchMode::InProcess).run("hello").unwrap();
        assert_eq!(result.stdout(), "hello\n");
        assert_eq!(result.stderr(), "");
        assert!(result.success());
        assert_eq!(result.invocation().launch_mode, Some(LaunchMode::InProcess));
    }

    #[test]
    #[serial]
    fn exit_code_two_is_failure() {
        let result = runner(LaunchMode::InProcess).run("fail").unwrap();
        assert!(!result.success());
        assert_eq!(result.returncode(), 2);
    }

    #[test]
    #[serial]
    fn check_raises_with_output() {
        let err = runner(LaunchMode::InProcess)
            .command("fail")
            .check(true)
            .run()
            .unwrap_err();
        match err {
            ScriptError::CalledProcess { code, stdout, .. } => {
                assert_eq!(code, 2);
                assert_eq!(stdout, "partial\n");
            }
            other => panic!("expected CalledProcess, got {other:?}"),
        }
    }

    #[test]
    #[serial]
    #[allow(deprecated)]
    fn legacy_variadic_arguments_are_appended() {
        let result = runner(LaunchMode::InProcess)
            .run_with("echo-args", ["a", "b"])
            .unwrap();
        assert_eq!(result.stdout(), "a,b\n");
    }

    #[test]
    fn shell_in_process_is_rejected() {
        let err = runner(LaunchMode::InProcess)
            .command("hello")
            .shell(true)
            .run()
            .unwrap_err();
        assert!(matches!(err, ScriptError::ShellInProcess(_)));
    }

    #[test]
    fn shell_in_process_is_rejected_before_resolution() {
        let err = runner(LaunchMode::InProcess)
            .command("no-such-program-anywhere --flag | wc -l")
            .shell(true)
            .run()
            .unwrap_err();
        assert!(matches!(err, ScriptError::ShellInProcess(_)));
    }

    #[test]
    fn unknown_command_is_not_a_result() {
        let err = runner(LaunchMode::SubProcess)
            .run("definitely-not-installed-anywhere")
            .unwrap_err();
        assert!(matches!(err, ScriptError::ScriptNotFound { .. }));
    }

    #[test]
    fn display_names_mode() {
        assert_eq!(runner(LaunchMode::SubProcess).to_string(), "<ScriptRunner subprocess>");
    }
}
