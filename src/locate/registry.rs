// src/locate/registry.rs

//! Installed command mappings.
//!
//! A [`CommandRegistry`] associates command names with in-process entry
//! points, and script file extensions with [`ScriptEngine`]s able to run a
//! script file inside the current process. A process-wide registry backs the
//! `install_*` helpers; runners read a snapshot of it at resolution time
//! unless they were given their own registry.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

use crate::exec::context::{ScriptContext, ScriptResult};

/// In-process entry point callable.
pub type EntryFn = dyn Fn(&mut ScriptContext) -> ScriptResult + Send + Sync;

/// A command name mapped to its entry point.
#[derive(Clone)]
pub struct EntryPoint {
    name: String,
    func: Arc<EntryFn>,
    program: Option<PathBuf>,
}

impl EntryPoint {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut ScriptContext) -> ScriptResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
            program: None,
        }
    }

    /// Binary implementing the same command, used in subprocess mode.
    ///
    /// Typically `env!("CARGO_BIN_EXE_<name>")` in integration tests.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> Option<&Path> {
        self.program.as_deref()
    }

    pub fn call(&self, ctx: &mut ScriptContext) -> ScriptResult {
        (self.func)(ctx)
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoint")
            .field("name", &self.name)
            .field("program", &self.program)
            .finish_non_exhaustive()
    }
}

/// Runs a script file inside the current process.
///
/// Engines are keyed by file extension. Without an engine for its extension a
/// script file can only be run as a subprocess.
pub trait ScriptEngine: Send + Sync {
    fn run(&self, path: &Path, ctx: &mut ScriptContext) -> ScriptResult;
}

impl<F> ScriptEngine for F
where
    F: Fn(&Path, &mut ScriptContext) -> ScriptResult + Send + Sync,
{
    fn run(&self, path: &Path, ctx: &mut ScriptContext) -> ScriptResult {
        self(path, ctx)
    }
}

#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, EntryPoint>,
    engines: BTreeMap<String, Arc<dyn ScriptEngine>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `func` as the entry point of command `name`.
    pub fn install<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(&mut ScriptContext) -> ScriptResult + Send + Sync + 'static,
    {
        self.install_entry_point(EntryPoint::new(name, func))
    }

    pub fn install_entry_point(&mut self, entry: EntryPoint) -> &mut Self {
        debug!(command = %entry.name, program = ?entry.program, "installing command");
        self.commands.insert(entry.name.clone(), entry);
        self
    }

    /// Register an in-process engine for script files ending in `.<extension>`.
    pub fn register_engine(
        &mut self,
        extension: impl Into<String>,
        engine: impl ScriptEngine + 'static,
    ) -> &mut Self {
        let extension = extension.into();
        let extension = extension.trim_start_matches('.').to_string();
        debug!(%extension, "registering script engine");
        self.engines.insert(extension, Arc::new(engine));
        self
    }

    pub fn get(&self, name: &str) -> Option<&EntryPoint> {
        self.commands.get(name)
    }

    pub fn engine_for(&self, extension: &str) -> Option<Arc<dyn ScriptEngine>> {
        self.engines.get(extension).cloned()
    }

    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .field("engines", &self.engines.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn global() -> &'static RwLock<CommandRegistry> {
    static INSTALLED: OnceLock<RwLock<CommandRegistry>> = OnceLock::new();
    INSTALLED.get_or_init(|| RwLock::new(CommandRegistry::new()))
}

/// Install a command into the process-wide registry.
///
/// Re-installing a name replaces the previous entry point.
pub fn install_command<F>(name: impl Into<String>, func: F)
where
    F: Fn(&mut ScriptContext) -> ScriptResult + Send + Sync + 'static,
{
    global().write().install(name, func);
}

pub fn install_entry_point(entry: EntryPoint) {
    global().write().install_entry_point(entry);
}

pub fn register_engine(extension: impl Into<String>, engine: impl ScriptEngine + 'static) {
    global().write().register_engine(extension, engine);
}

/// Snapshot of the process-wide registry.
pub fn installed() -> CommandRegistry {
    global().read().clone()
}
