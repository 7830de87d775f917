// src/exec/isolation.rs

//! Scoped acquisition of process-wide state for in-process runs.
//!
//! [`ProcessStateGuard`] snapshots the working directory and the environment,
//! applies the invocation's overrides and installs a thread-scoped logging
//! dispatcher that writes into the captured stderr. Dropping the guard
//! restores everything in reverse order, on every exit path.
//!
//! Guards nest: a script that runs another script in-process acquires a
//! second guard on the same thread, and the inner guard is released first.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use parking_lot::{const_reentrant_mutex, ReentrantMutex, ReentrantMutexGuard};
use tracing::dispatcher::{self, DefaultGuard};
use tracing::{debug, warn};

use crate::errors::Result;
use crate::exec::context::CaptureBuffer;
use crate::logging;

/// Serializes in-process runs across threads; re-entrant for nested runs.
static INPROCESS_LOCK: ReentrantMutex<()> = const_reentrant_mutex(());

#[derive(Debug)]
struct EnvSnapshot(Vec<(OsString, OsString)>);

impl EnvSnapshot {
    fn capture() -> Self {
        Self(std::env::vars_os().collect())
    }

    fn restore(&self) {
        replace_env(self.0.iter().cloned());
    }
}

/// Replace the whole process environment with `vars`.
fn replace_env(vars: impl IntoIterator<Item = (OsString, OsString)>) {
    let vars: BTreeMap<OsString, OsString> = vars.into_iter().collect();
    let current: Vec<OsString> = std::env::vars_os().map(|(k, _)| k).collect();

    // SAFETY: environment mutation only happens while INPROCESS_LOCK is held,
    // so in-process runs never race each other. Code outside the runner that
    // reads the environment concurrently must be serialized by the caller.
    unsafe {
        for key in current {
            if !vars.contains_key(&key) {
                std::env::remove_var(&key);
            }
        }
        for (key, value) in &vars {
            std::env::set_var(key, value);
        }
    }
}

/// Hold the process-state lock without changing anything.
///
/// Subprocess runs take it while resolving and spawning, so they inherit the
/// test process's own cwd and environment rather than another thread's
/// in-process overrides.
pub(crate) fn hold_process_state() -> ReentrantMutexGuard<'static, ()> {
    INPROCESS_LOCK.lock()
}

/// Snapshot-then-restore guard around one in-process run.
pub struct ProcessStateGuard {
    log: Option<DefaultGuard>,
    env: Option<EnvSnapshot>,
    cwd: Option<PathBuf>,
    _lock: ReentrantMutexGuard<'static, ()>,
}

impl ProcessStateGuard {
    /// Take the in-process lock, snapshot state and apply the overrides.
    ///
    /// If applying an override fails, whatever was already changed is
    /// restored before the error is returned.
    pub fn acquire(
        cwd: Option<&Path>,
        env: Option<&BTreeMap<OsString, OsString>>,
        stderr: &CaptureBuffer,
    ) -> Result<Self> {
        let lock = INPROCESS_LOCK.lock();

        let mut guard = Self {
            log: None,
            env: None,
            cwd: None,
            _lock: lock,
        };

        match std::env::current_dir() {
            Ok(dir) => guard.cwd = Some(dir),
            Err(e) => warn!(error = %e, "current directory unavailable; it will not be restored"),
        }
        if let Some(dir) = cwd {
            std::env::set_current_dir(dir)?;
        }

        guard.env = Some(EnvSnapshot::capture());
        if let Some(env) = env {
            replace_env(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        guard.log = Some(install_script_logging(stderr));

        debug!(?cwd, env_override = env.is_some(), "in-process state acquired");
        Ok(guard)
    }
}

impl Drop for ProcessStateGuard {
    fn drop(&mut self) {
        drop(self.log.take());

        if let Some(env) = self.env.take() {
            env.restore();
        }

        if let Some(dir) = self.cwd.take() {
            if let Err(e) = std::env::set_current_dir(&dir) {
                warn!(dir = %dir.display(), error = %e, "failed to restore working directory");
            }
        }
    }
}

/// Scope a fresh subscriber to this thread, writing into captured stderr.
///
/// The filter is read from `RUST_LOG` of the (already overridden)
/// environment, mirroring what a freshly started process would do.
fn install_script_logging(stderr: &CaptureBuffer) -> DefaultGuard {
    let directives = std::env::var("RUST_LOG").ok();
    let filter = logging::filter_from(directives.as_deref(), logging::DEFAULT_FILTER);
    dispatcher::set_default(&logging::capture_dispatch(filter, stderr))
}
