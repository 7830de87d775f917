// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "CONSOLE_SCRIPTS_CONFIG";

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] for the
/// checked form.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Resolve the config path: `CONSOLE_SCRIPTS_CONFIG` if set, otherwise
/// `console-scripts.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("console-scripts.toml"))
}

/// Load the default config.
///
/// A missing implicit `console-scripts.toml` yields the defaults; a missing
/// file named explicitly through `CONSOLE_SCRIPTS_CONFIG` is an error.
pub fn load_default() -> Result<ConfigFile> {
    let explicit = std::env::var_os(CONFIG_PATH_ENV).is_some();
    let path = default_config_path();

    if !explicit && !path.is_file() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(ConfigFile::default());
    }

    debug!(path = %path.display(), "loading config file");
    load_and_validate(&path)
}
