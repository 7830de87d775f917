// src/exec/mod.rs

//! Script execution layer.
//!
//! - [`invocation`] describes what to run (`Command`, `Invocation`) and the
//!   `RunBuilder` used to set per-call options.
//! - [`runner`] owns `ScriptRunner`, which resolves the target and dispatches
//!   on the launch mode.
//! - [`subprocess`] spawns a child process with `std::process::Command`.
//! - [`inprocess`] calls an entry point inside this process.
//! - [`isolation`] provides the guard that snapshots and restores process-wide
//!   state around in-process calls.
//! - [`context`] is what an in-process script sees.
//! - [`result`] holds `RunResult`.

pub mod context;
pub mod inprocess;
pub mod invocation;
pub mod isolation;
pub mod result;
pub mod runner;
pub mod subprocess;

pub use context::{CaptureBuffer, ExitRequest, ScriptContext, ScriptExit, ScriptResult};
pub use invocation::{Command, Invocation, RunBuilder};
pub use result::RunResult;
pub use runner::ScriptRunner;

/// Raw outcome of one run, before it becomes a [`RunResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    pub returncode: i32,
    pub stdout: String,
    pub stderr: String,
}
