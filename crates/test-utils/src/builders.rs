#![allow(dead_code)]

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use console_scripts::config::{ConfigFile, RawConfigFile};
use console_scripts::LaunchModeSetting;
use tempfile::TempDir;

/// Temporary directory holding scripts written by a test.
pub struct ScriptDir {
    dir: TempDir,
}

impl ScriptDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create script dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a plain (non-executable) file.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(&path, contents).expect("write script");
        path
    }

    /// Write a file with mode 0755.
    #[cfg(unix)]
    pub fn write_executable(&self, name: &str, contents: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.write(name, contents);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod script");
        path
    }

    pub fn subdir(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(&path).expect("create subdir");
        path
    }

    /// Current environment with this directory prepended to `PATH`.
    pub fn path_env(&self) -> BTreeMap<OsString, OsString> {
        let mut env: BTreeMap<OsString, OsString> = std::env::vars_os().collect();
        let mut dirs = vec![self.dir.path().to_path_buf()];
        if let Some(path) = std::env::var_os("PATH") {
            dirs.extend(std::env::split_paths(&path));
        }
        let joined = std::env::join_paths(dirs).expect("join PATH");
        env.insert(OsString::from("PATH"), joined);
        env
    }
}

impl Default for ScriptDir {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_launch_mode(mut self, mode: LaunchModeSetting) -> Self {
        self.config.script_launch_mode = Some(mode);
        self
    }

    pub fn hide_run_results(mut self, hide: bool) -> Self {
        self.config.hide_run_results = hide;
        self
    }

    pub fn with_interpreter(mut self, extension: &str, argv: &[&str]) -> Self {
        self.config.interpreters.insert(
            extension.to_string(),
            argv.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
