// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::errors::ScriptError;

/// Concrete way of running a script under test.
///
/// - `InProcess`: call the script's entry point inside the current process,
///   capturing its output and isolating process-wide state.
/// - `SubProcess`: spawn the script as a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaunchMode {
    InProcess,
    SubProcess,
}

impl LaunchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LaunchMode::InProcess => "inprocess",
            LaunchMode::SubProcess => "subprocess",
        }
    }
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configured launch mode, as accepted from test markings, the command line
/// and the config file.
///
/// `Both` is not an execution mode: it schedules the same test once per
/// concrete mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum LaunchModeSetting {
    #[default]
    InProcess,
    SubProcess,
    Both,
}

impl LaunchModeSetting {
    /// Concrete modes this setting schedules, in execution order.
    pub fn modes(self) -> &'static [LaunchMode] {
        match self {
            LaunchModeSetting::InProcess => &[LaunchMode::InProcess],
            LaunchModeSetting::SubProcess => &[LaunchMode::SubProcess],
            LaunchModeSetting::Both => &[LaunchMode::InProcess, LaunchMode::SubProcess],
        }
    }

    pub fn includes(self, mode: LaunchMode) -> bool {
        self.modes().contains(&mode)
    }
}

impl FromStr for LaunchModeSetting {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inprocess" => Ok(LaunchModeSetting::InProcess),
            "subprocess" => Ok(LaunchModeSetting::SubProcess),
            "both" => Ok(LaunchModeSetting::Both),
            other => Err(ScriptError::InvalidLaunchMode(other.to_string())),
        }
    }
}

impl TryFrom<String> for LaunchModeSetting {
    type Error = ScriptError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for LaunchModeSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LaunchModeSetting::InProcess => "inprocess",
            LaunchModeSetting::SubProcess => "subprocess",
            LaunchModeSetting::Both => "both",
        };
        f.write_str(s)
    }
}

impl From<LaunchMode> for LaunchModeSetting {
    fn from(mode: LaunchMode) -> Self {
        match mode {
            LaunchMode::InProcess => LaunchModeSetting::InProcess,
            LaunchMode::SubProcess => LaunchModeSetting::SubProcess,
        }
    }
}
