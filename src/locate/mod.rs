// src/locate/mod.rs

//! Script location: turn a command name into a [`Target`] before anything
//! runs.
//!
//! Resolution order:
//! 1. an installed command in the [`CommandRegistry`],
//! 2. an executable found on the search path (`PATH` of the override
//!    environment when one is given),
//! 3. a file relative to the working directory (or an absolute path).
//!
//! Files whose extension has a configured interpreter become
//! [`Target::ScriptFile`]; other executable files become
//! [`Target::Executable`]. Resolution only reads the filesystem.

pub mod registry;

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{Result, ScriptError};

pub use registry::{
    install_command, install_entry_point, installed, register_engine, CommandRegistry,
    EntryFn, EntryPoint, ScriptEngine,
};

/// Resolved identity of a command name.
#[derive(Debug, Clone)]
pub enum Target {
    /// Native executable; subprocess only.
    Executable { path: PathBuf },
    /// Registered entry point, optionally backed by a binary for subprocess
    /// mode.
    InstalledCommand {
        entry: EntryPoint,
        program: Option<PathBuf>,
    },
    /// Script run through an interpreter, or an in-process engine.
    ScriptFile {
        path: PathBuf,
        interpreter: Vec<String>,
        executable: bool,
    },
}

impl Target {
    pub fn kind(&self) -> &'static str {
        match self {
            Target::Executable { .. } => "executable",
            Target::InstalledCommand { .. } => "installed command",
            Target::ScriptFile { .. } => "script file",
        }
    }

    /// Program and leading arguments used to spawn this target.
    ///
    /// `None` for an installed command with no known binary.
    pub fn subprocess_prefix(&self) -> Option<Vec<OsString>> {
        match self {
            Target::Executable { path } => Some(vec![path.clone().into_os_string()]),
            Target::InstalledCommand { program, .. } => program
                .as_ref()
                .map(|p| vec![p.clone().into_os_string()]),
            Target::ScriptFile {
                path,
                interpreter,
                executable,
            } => {
                if *executable {
                    return Some(vec![path.clone().into_os_string()]);
                }
                let mut argv: Vec<OsString> = interpreter.iter().map(OsString::from).collect();
                argv.push(path.clone().into_os_string());
                Some(argv)
            }
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Executable { path } => write!(f, "executable {}", path.display()),
            Target::InstalledCommand { entry, program } => {
                write!(f, "installed command {}", entry.name())?;
                if let Some(program) = program {
                    write!(f, " (program {})", program.display())?;
                }
                Ok(())
            }
            Target::ScriptFile {
                path,
                interpreter,
                executable,
            } => {
                write!(f, "script file {}", path.display())?;
                if !executable {
                    write!(f, " (via {})", interpreter.join(" "))?;
                }
                Ok(())
            }
        }
    }
}

/// Resolves command names against a registry, the search path and the
/// working directory.
#[derive(Debug, Clone, Copy)]
pub struct Locator<'a> {
    registry: &'a CommandRegistry,
    interpreters: &'a BTreeMap<String, Vec<String>>,
}

impl<'a> Locator<'a> {
    pub fn new(
        registry: &'a CommandRegistry,
        interpreters: &'a BTreeMap<String, Vec<String>>,
    ) -> Self {
        Self {
            registry,
            interpreters,
        }
    }

    /// Resolve `name` as it would be run from `cwd` with environment `env`.
    ///
    /// `cwd = None` means the current directory; `env = None` means the
    /// current environment.
    pub fn resolve(
        &self,
        name: &OsStr,
        cwd: Option<&Path>,
        env: Option<&BTreeMap<OsString, OsString>>,
    ) -> Result<Target> {
        let search_path = search_path(env);

        if let Some(entry) = name.to_str().and_then(|n| self.registry.get(n)) {
            let program = match entry.program() {
                Some(program) => Some(program.to_path_buf()),
                None => which_in(name, search_path.as_deref(), cwd),
            };
            debug!(command = %entry.name(), ?program, "resolved installed command");
            return Ok(Target::InstalledCommand {
                entry: entry.clone(),
                program,
            });
        }

        if let Some(path) = which_in(name, search_path.as_deref(), cwd) {
            if let Some(target) = self.classify(path) {
                debug!(%target, "resolved on search path");
                return Ok(target);
            }
        }

        let base = match cwd {
            Some(dir) => dir.to_path_buf(),
            None => std::env::current_dir()?,
        };
        let candidate = base.join(name);
        if candidate.is_file() {
            let candidate = candidate.canonicalize()?;
            if let Some(target) = self.classify(candidate) {
                debug!(%target, "resolved relative to working directory");
                return Ok(target);
            }
        }

        let mut searched: Vec<PathBuf> = search_path
            .as_deref()
            .map(|p| std::env::split_paths(p).map(|dir| dir.join(name)).collect())
            .unwrap_or_default();
        searched.push(candidate);

        Err(ScriptError::ScriptNotFound {
            name: name.to_string_lossy().into_owned(),
            searched,
        })
    }

    fn classify(&self, path: PathBuf) -> Option<Target> {
        let executable = is_executable(&path);
        let interpreter = path
            .extension()
            .and_then(OsStr::to_str)
            .and_then(|ext| self.interpreters.get(ext));

        match interpreter {
            Some(interpreter) => Some(Target::ScriptFile {
                interpreter: interpreter.clone(),
                path,
                executable,
            }),
            None if executable => Some(Target::Executable { path }),
            None => None,
        }
    }
}

fn search_path(env: Option<&BTreeMap<OsString, OsString>>) -> Option<OsString> {
    match env {
        Some(env) => env.get(OsStr::new("PATH")).cloned(),
        None => std::env::var_os("PATH"),
    }
}

/// Directories of the effective search path.
pub fn search_dirs(env: Option<&BTreeMap<OsString, OsString>>) -> Vec<PathBuf> {
    search_path(env)
        .map(|p| std::env::split_paths(&p).collect())
        .unwrap_or_default()
}

fn which_in(name: &OsStr, paths: Option<&OsStr>, cwd: Option<&Path>) -> Option<PathBuf> {
    let cwd = match cwd {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().ok()?,
    };
    which::which_in(name, paths, cwd).ok()
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
