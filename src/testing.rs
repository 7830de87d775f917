// src/testing.rs

//! Test harness integration.
//!
//! [`script_test!`](crate::script_test) turns one test body into two
//! `#[test]` functions, `inprocess` and `subprocess`. Each one asks
//! [`run_in_mode`] whether its mode is selected for this test and, if so,
//! hands the body a [`ScriptRunner`] rooted in a fresh scratch directory.
//!
//! ```ignore
//! use console_scripts::script_test;
//!
//! script_test!(launch_mode = "both", fn prints_version(runner) {
//!     let result = runner.run(["my-tool", "--version"]).unwrap();
//!     assert!(result.success());
//! });
//! ```

use std::ops::Deref;

use tempfile::TempDir;
use tracing::info;

use crate::config::session;
use crate::errors::Result;
use crate::exec::ScriptRunner;
use crate::types::{LaunchMode, LaunchModeSetting};

/// A runner plus the temporary directory backing its `root_dir`.
///
/// The directory is removed when the fixture is dropped.
#[derive(Debug)]
pub struct ScriptFixture {
    runner: ScriptRunner,
    _tmp: TempDir,
}

impl ScriptFixture {
    /// Runner for `mode` using the session settings and a new
    /// `script-cwd` scratch directory.
    pub fn new(mode: LaunchMode) -> Result<Self> {
        let tmp = tempfile::tempdir()?;
        let root = tmp.path().join("script-cwd");
        std::fs::create_dir(&root)?;
        let runner = ScriptRunner::from_session(session()?, mode, root);
        Ok(Self { runner, _tmp: tmp })
    }

    pub fn runner(&self) -> &ScriptRunner {
        &self.runner
    }
}

impl Deref for ScriptFixture {
    type Target = ScriptRunner;

    fn deref(&self) -> &ScriptRunner {
        &self.runner
    }
}

/// Whether a test carrying `mark` runs in `mode` this session.
pub fn mode_selected(mark: Option<&str>, mode: LaunchMode) -> Result<bool> {
    let mark = mark.map(str::parse::<LaunchModeSetting>).transpose()?;
    Ok(session()?.launch_mode(mark).includes(mode))
}

/// Line written to stderr when a test half is skipped.
pub fn skip_notice(mark: Option<&str>, mode: LaunchMode) -> String {
    match mark {
        Some(mark) => format!("skipped (launch mode {mode} not selected by marking \"{mark}\")"),
        None => format!("skipped (launch mode {mode} not selected for this session)"),
    }
}

/// Run `body` with a fresh runner if `mode` is selected for this test.
///
/// Returns whether the body ran. The harness has no skip outcome, so an
/// unselected half still shows as passed; a `skipped (launch mode ...)`
/// line on stderr marks it.
///
/// # Panics
///
/// Panics (failing the test) on an invalid marking, an invalid session
/// configuration or when the scratch directory cannot be created.
pub fn run_in_mode<F>(mark: Option<&str>, mode: LaunchMode, body: F) -> bool
where
    F: FnOnce(&ScriptRunner),
{
    let selected = mode_selected(mark, mode)
        .unwrap_or_else(|e| panic!("cannot resolve script launch mode: {e}"));
    if !selected {
        info!(%mode, ?mark, "launch mode not selected; skipping");
        eprintln!("{}", skip_notice(mark, mode));
        return false;
    }

    let fixture = ScriptFixture::new(mode)
        .unwrap_or_else(|e| panic!("cannot prepare script runner: {e}"));
    body(&fixture);
    true
}

/// Declare a test that runs once per selected launch mode.
///
/// Without `launch_mode = "..."` the session setting decides (command-line
/// override, then config file, then `inprocess`).
///
/// Both halves always exist. The one whose mode is not selected returns
/// without running the body, is reported as passed, and prints a
/// `skipped (launch mode ...)` line to stderr (visible with `--nocapture`).
#[macro_export]
macro_rules! script_test {
    (@expand $mark:expr, $(#[$attr:meta])* fn $name:ident($runner:ident) $body:block) => {
        mod $name {
            #[allow(unused_imports)]
            use super::*;

            $(#[$attr])*
            #[test]
            fn inprocess() {
                $crate::testing::run_in_mode(
                    $mark,
                    $crate::LaunchMode::InProcess,
                    |$runner: &$crate::ScriptRunner| $body,
                );
            }

            $(#[$attr])*
            #[test]
            fn subprocess() {
                $crate::testing::run_in_mode(
                    $mark,
                    $crate::LaunchMode::SubProcess,
                    |$runner: &$crate::ScriptRunner| $body,
                );
            }
        }
    };
    (launch_mode = $mode:literal, $(#[$attr:meta])* fn $name:ident($runner:ident) $body:block) => {
        $crate::script_test!(@expand Some($mode), $(#[$attr])* fn $name($runner) $body);
    };
    ($(#[$attr:meta])* fn $name:ident($runner:ident) $body:block) => {
        $crate::script_test!(@expand None, $(#[$attr])* fn $name($runner) $body);
    };
}
