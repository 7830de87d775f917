// src/exec/inprocess.rs

//! In-process execution.
//!
//! Only installed commands and script files with a registered engine can run
//! here. The call happens under a [`ProcessStateGuard`] and inside
//! `catch_unwind`, so a failing script never takes the test process down:
//!
//! - normal return → 0
//! - `ExitRequest::Code(c)` → `c` (`None` → 0)
//! - `ExitRequest::Message(m)` → 1, `m` appended to stderr
//! - `ScriptExit::Fault(e)` or a panic → 1, the fault appended to stderr

use std::any::Any;
use std::ffi::{OsStr, OsString};
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::{Result, ScriptError};
use crate::exec::context::{CaptureBuffer, ExitRequest, ScriptContext, ScriptExit, ScriptResult};
use crate::exec::invocation::Invocation;
use crate::exec::isolation::ProcessStateGuard;
use crate::exec::Captured;
use crate::locate::{CommandRegistry, EntryPoint, ScriptEngine, Target};

enum Callable {
    Entry(EntryPoint),
    Engine {
        engine: Arc<dyn ScriptEngine>,
        path: PathBuf,
    },
}

impl Callable {
    fn for_target(target: &Target, registry: &CommandRegistry) -> Result<Self> {
        match target {
            Target::InstalledCommand { entry, .. } => Ok(Callable::Entry(entry.clone())),
            Target::ScriptFile { path, .. } => {
                let extension = path.extension().and_then(OsStr::to_str).unwrap_or("");
                match registry.engine_for(extension) {
                    Some(engine) => Ok(Callable::Engine {
                        engine,
                        path: path.clone(),
                    }),
                    None => Err(ScriptError::CannotRunInProcess {
                        name: path.display().to_string(),
                        reason: format!("no in-process engine registered for .{extension} files"),
                    }),
                }
            }
            Target::Executable { path } => Err(ScriptError::CannotRunInProcess {
                name: path.display().to_string(),
                reason: "native executable; use subprocess mode".to_string(),
            }),
        }
    }

    fn call(&self, ctx: &mut ScriptContext) -> ScriptResult {
        match self {
            Callable::Entry(entry) => entry.call(ctx),
            Callable::Engine { engine, path } => engine.run(path, ctx),
        }
    }
}

pub fn run_inprocess(
    target: &Target,
    invocation: &Invocation,
    argv: Vec<OsString>,
    registry: &CommandRegistry,
) -> Result<Captured> {
    if invocation.shell {
        return Err(ScriptError::ShellInProcess(invocation.command.to_string()));
    }
    if invocation.timeout.is_some() {
        warn!(
            command = %invocation.command,
            "timeout is ignored in inprocess mode; consider subprocess mode"
        );
    }

    let callable = Callable::for_target(target, registry)?;

    let stdout = CaptureBuffer::new();
    let stderr = CaptureBuffer::new();
    let mut ctx = ScriptContext::new(
        argv,
        invocation.stdin.clone().unwrap_or_default(),
        stdout.clone(),
        stderr.clone(),
    );

    info!(command = %invocation.command, %target, "running script in-process");

    let outcome = {
        let _state =
            ProcessStateGuard::acquire(invocation.cwd.as_deref(), invocation.env.as_ref(), &stderr)?;
        panic::catch_unwind(AssertUnwindSafe(|| callable.call(&mut ctx)))
    };

    let returncode = record_outcome(outcome, &stderr);

    info!(command = %invocation.command, exit_code = returncode, "in-process script finished");

    Ok(Captured {
        returncode,
        stdout: stdout.contents(),
        stderr: stderr.contents(),
    })
}

/// Map how the script finished to an exit code, appending any message to
/// captured stderr.
fn record_outcome(outcome: std::thread::Result<ScriptResult>, stderr: &CaptureBuffer) -> i32 {
    let mut stderr = stderr.clone();
    // Writes into a CaptureBuffer cannot fail.
    match outcome {
        Ok(Ok(())) => 0,
        Ok(Err(ScriptExit::Exit(request))) => {
            if let ExitRequest::Message(message) = &request {
                let _ = writeln!(stderr, "{message}");
            }
            request.exit_code()
        }
        Ok(Err(ScriptExit::Fault(err))) => {
            let _ = writeln!(stderr, "Error: {err:?}");
            1
        }
        Err(payload) => {
            let _ = writeln!(stderr, "panicked: {}", panic_message(payload.as_ref()));
            1
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn stderr_after(outcome: std::thread::Result<ScriptResult>) -> (i32, String) {
        let stderr = CaptureBuffer::new();
        let mut prior = stderr.clone();
        writeln!(prior, "earlier").unwrap();
        let code = record_outcome(outcome, &stderr);
        (code, stderr.contents())
    }

    #[test]
    fn normal_return_is_zero() {
        assert_eq!(stderr_after(Ok(Ok(()))), (0, "earlier\n".to_string()));
    }

    #[test]
    fn exit_codes_pass_through() {
        assert_eq!(stderr_after(Ok(Err(ScriptExit::code(7)))).0, 7);
        assert_eq!(stderr_after(Ok(Err(ScriptExit::success()))).0, 0);
    }

    #[test]
    fn exit_message_goes_to_stderr() {
        let (code, err) = stderr_after(Ok(Err(ScriptExit::message("boom"))));
        assert_eq!(code, 1);
        assert_eq!(err, "earlier\nboom\n");
    }

    #[test]
    fn fault_is_appended_after_output() {
        let (code, err) = stderr_after(Ok(Err(ScriptExit::fault(anyhow!("bad input")))));
        assert_eq!(code, 1);
        assert!(err.starts_with("earlier\n"));
        assert!(err.contains("bad input"));
    }

    #[test]
    fn panic_payloads_are_described() {
        let (code, err) = stderr_after(Err(Box::new("static message")));
        assert_eq!(code, 1);
        assert!(err.ends_with("panicked: static message\n"));

        let (_, err) = stderr_after(Err(Box::new(String::from("owned message"))));
        assert!(err.contains("owned message"));
    }

    #[test]
    fn executables_cannot_run_in_process() {
        let target = Target::Executable {
            path: PathBuf::from("/bin/true"),
        };
        let err = Callable::for_target(&target, &CommandRegistry::new())
            .err()
            .expect("executable must be rejected");
        assert!(matches!(err, ScriptError::CannotRunInProcess { .. }));
    }
}
