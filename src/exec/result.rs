// src/exec/result.rs

use std::fmt;

use crate::exec::invocation::Invocation;

/// Captured outcome of one script run.
///
/// Immutable once created; `success()` is true iff the exit code is zero.
#[derive(Debug, Clone)]
pub struct RunResult {
    returncode: i32,
    stdout: String,
    stderr: String,
    invocation: Invocation,
}

impl RunResult {
    pub fn new(returncode: i32, stdout: String, stderr: String, invocation: Invocation) -> Self {
        Self {
            returncode,
            stdout,
            stderr,
            invocation,
        }
    }

    pub fn returncode(&self) -> i32 {
        self.returncode
    }

    pub fn success(&self) -> bool {
        self.returncode == 0
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    /// Print the result to the test's output channel.
    ///
    /// Works regardless of whether automatic printing is enabled, so tests can
    /// print only when an assertion is about to fail.
    pub fn print(&self) {
        print!("{self}");
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Script return code: {}", self.returncode)?;
        writeln!(f, "# Script stdout:\n{}", self.stdout)?;
        writeln!(f, "# Script stderr:\n{}", self.stderr)
    }
}
