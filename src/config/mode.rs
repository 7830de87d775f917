// src/config/mode.rs

//! Launch mode resolution and the per-session settings snapshot.
//!
//! Priority for the effective launch mode of one test:
//! 1. the test's own marking (`script_test!(launch_mode = ...)`)
//! 2. the command-line override (`--script-launch-mode`, or
//!    `SCRIPT_LAUNCH_MODE` under `cargo test`)
//! 3. `script_launch_mode` in the config file
//! 4. `inprocess`

use std::sync::OnceLock;

use tracing::debug;

use crate::config::loader::load_default;
use crate::config::model::ConfigFile;
use crate::errors::{Result, ScriptError};
use crate::types::LaunchModeSetting;

/// Launch mode override read from the environment.
pub const LAUNCH_MODE_ENV: &str = "SCRIPT_LAUNCH_MODE";

/// Truthy value disables automatic result printing for the session.
pub const HIDE_RUN_RESULTS_ENV: &str = "SCRIPT_HIDE_RUN_RESULTS";

/// Pure priority rule: mark, then option, then config, then `inprocess`.
pub fn resolve_launch_mode(
    mark: Option<LaunchModeSetting>,
    option: Option<LaunchModeSetting>,
    config: Option<LaunchModeSetting>,
) -> LaunchModeSetting {
    mark.or(option).or(config).unwrap_or_default()
}

/// Settings shared by every runner in one test session.
#[derive(Debug, Clone)]
pub struct Session {
    pub config: ConfigFile,
    /// Command-line level override.
    pub option_mode: Option<LaunchModeSetting>,
    pub hide_run_results: bool,
}

impl Session {
    /// Build a session from an already loaded config and explicit overrides.
    pub fn new(
        config: ConfigFile,
        option_mode: Option<LaunchModeSetting>,
        hide_run_results: bool,
    ) -> Self {
        let hide_run_results = hide_run_results || config.hide_run_results;
        Self {
            config,
            option_mode,
            hide_run_results,
        }
    }

    /// Read the config file and the environment overrides.
    pub fn from_env() -> Result<Self> {
        let config = load_default()?;
        let option_mode = match std::env::var(LAUNCH_MODE_ENV) {
            Ok(value) if !value.trim().is_empty() => Some(value.parse()?),
            _ => None,
        };
        let hide = std::env::var(HIDE_RUN_RESULTS_ENV)
            .map(|v| is_truthy(&v))
            .unwrap_or(false);
        Ok(Self::new(config, option_mode, hide))
    }

    /// Effective setting for a test carrying `mark`.
    pub fn launch_mode(&self, mark: Option<LaunchModeSetting>) -> LaunchModeSetting {
        resolve_launch_mode(mark, self.option_mode, self.config.script_launch_mode)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

static SESSION: OnceLock<std::result::Result<Session, String>> = OnceLock::new();

/// Session snapshot, loaded once so every test sees the same settings.
pub fn session() -> Result<&'static Session> {
    let loaded = SESSION.get_or_init(|| {
        let session = Session::from_env().map_err(|e| e.to_string());
        debug!(?session, "console-scripts session loaded");
        session
    });
    loaded
        .as_ref()
        .map_err(|msg| ScriptError::ConfigError(msg.clone()))
}
