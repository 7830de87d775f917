// src/exec/context.rs

//! What an in-process script sees: its argument vector, its stdin and the
//! capture buffers standing in for stdout and stderr.
//!
//! Entry points report how they finished through [`ScriptResult`]:
//! - `Ok(())` is a normal return (exit code 0),
//! - `Err(ScriptExit::Exit(..))` is a controlled exit request,
//! - `Err(ScriptExit::Fault(..))` (or a panic) is an uncaught fault.

use std::ffi::OsString;
use std::fmt;
use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

use parking_lot::Mutex;

/// Shared, growable byte buffer used to capture one output stream.
///
/// Clones write into the same buffer, which lets the logging layer and the
/// script share captured stderr.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured bytes decoded as text; invalid UTF-8 is replaced, never fatal.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock()).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Explicit exit request made by a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitRequest {
    /// Exit with a code; `None` means success.
    Code(Option<i32>),
    /// Exit with a message: code 1, message written to stderr.
    Message(String),
}

impl ExitRequest {
    pub fn exit_code(&self) -> i32 {
        match self {
            ExitRequest::Code(code) => code.unwrap_or(0),
            ExitRequest::Message(_) => 1,
        }
    }
}

/// Non-normal completion of an in-process script.
#[derive(Debug)]
pub enum ScriptExit {
    Exit(ExitRequest),
    Fault(anyhow::Error),
}

impl ScriptExit {
    pub fn code(code: i32) -> Self {
        ScriptExit::Exit(ExitRequest::Code(Some(code)))
    }

    /// Exit request without a code (maps to 0).
    pub fn success() -> Self {
        ScriptExit::Exit(ExitRequest::Code(None))
    }

    pub fn message(message: impl Into<String>) -> Self {
        ScriptExit::Exit(ExitRequest::Message(message.into()))
    }

    pub fn fault(err: impl Into<anyhow::Error>) -> Self {
        ScriptExit::Fault(err.into())
    }
}

impl<E> From<E> for ScriptExit
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        ScriptExit::Fault(anyhow::Error::new(err))
    }
}

impl fmt::Display for ScriptExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptExit::Exit(ExitRequest::Code(code)) => {
                write!(f, "exit({})", code.unwrap_or(0))
            }
            ScriptExit::Exit(ExitRequest::Message(msg)) => write!(f, "exit({msg:?})"),
            ScriptExit::Fault(err) => write!(f, "{err}"),
        }
    }
}

pub type ScriptResult = Result<(), ScriptExit>;

/// Environment handed to an in-process entry point.
#[derive(Debug)]
pub struct ScriptContext {
    argv: Vec<OsString>,
    stdin: Cursor<Vec<u8>>,
    stdout: CaptureBuffer,
    stderr: CaptureBuffer,
}

impl ScriptContext {
    pub fn new(
        argv: Vec<OsString>,
        stdin: Vec<u8>,
        stdout: CaptureBuffer,
        stderr: CaptureBuffer,
    ) -> Self {
        Self {
            argv,
            stdin: Cursor::new(stdin),
            stdout,
            stderr,
        }
    }

    /// Full argument vector; `argv[0]` is the command name.
    pub fn argv(&self) -> &[OsString] {
        &self.argv
    }

    /// Arguments after the command name, lossily converted to `String`.
    pub fn args(&self) -> Vec<String> {
        self.argv
            .iter()
            .skip(1)
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Stdin of the run. Empty when the caller supplied none.
    pub fn stdin(&mut self) -> &mut Cursor<Vec<u8>> {
        &mut self.stdin
    }

    pub fn read_stdin_to_string(&mut self) -> io::Result<String> {
        let mut buf = String::new();
        self.stdin.read_to_string(&mut buf)?;
        Ok(buf)
    }

    pub fn stdout(&mut self) -> &mut CaptureBuffer {
        &mut self.stdout
    }

    pub fn stderr(&mut self) -> &mut CaptureBuffer {
        &mut self.stderr
    }
}
