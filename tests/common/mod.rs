// tests/common/mod.rs

#![allow(dead_code)]

use std::io::{Read, Write};
use std::sync::Once;

use anyhow::anyhow;
use console_scripts::{
    install_command, register_engine, CommandRegistry, LaunchMode, ScriptContext, ScriptExit,
    ScriptResult, ScriptRunner,
};
pub use console_scripts_test_utils::{init_tracing, ConfigFileBuilder, MiniSh, ScriptDir};

static SETUP: Once = Once::new();

/// Tracing plus the process-wide commands and engines used across tests.
pub fn setup() {
    init_tracing();
    SETUP.call_once(|| {
        register_engine("sh", MiniSh);
        install_command("greet", greet);
    });
}

/// `greet [NAME] [--loud]`
pub fn greet(ctx: &mut ScriptContext) -> ScriptResult {
    let args = ctx.args();
    let loud = args.iter().any(|a| a == "--loud");
    let name = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .map(String::as_str)
        .unwrap_or("world");
    let line = format!("hello, {name}");
    if loud {
        writeln!(ctx.stdout(), "{}", line.to_uppercase())?;
    } else {
        writeln!(ctx.stdout(), "{line}")?;
    }
    Ok(())
}

/// Registry with one command per way an in-process script can finish.
pub fn registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry
        .install("greet", greet)
        .install("exit-with", |ctx| {
            let code = ctx
                .args()
                .first()
                .and_then(|c| c.parse().ok())
                .unwrap_or(0);
            writeln!(ctx.stdout(), "exiting with {code}")?;
            Err(ScriptExit::code(code))
        })
        .install("exit-none", |_ctx| Err(ScriptExit::success()))
        .install("exit-message", |_ctx| Err(ScriptExit::message("bad config")))
        .install("fault", |ctx| {
            writeln!(ctx.stdout(), "before the fault")?;
            Err(ScriptExit::fault(anyhow!("disk quota exceeded")))
        })
        .install("panics", |_ctx| panic!("kaboom"))
        .install("upper", |ctx| {
            let mut input = String::new();
            ctx.stdin().read_to_string(&mut input)?;
            write!(ctx.stdout(), "{}", input.to_uppercase())?;
            Ok(())
        })
        .install("print-env", |ctx| {
            for key in ctx.args() {
                let value = std::env::var(&key).unwrap_or_else(|_| "<unset>".to_string());
                writeln!(ctx.stdout(), "{key}={value}")?;
            }
            Ok(())
        })
        .install("print-cwd", |ctx| {
            let dir = std::env::current_dir()?;
            writeln!(ctx.stdout(), "{}", dir.display())?;
            Ok(())
        })
        .install("vandal", |ctx| {
            // Leaves the process in a different state on purpose.
            std::env::set_current_dir(std::env::temp_dir())?;
            // SAFETY: runs under the in-process guard.
            unsafe {
                std::env::set_var("VANDAL_WAS_HERE", "1");
                std::env::remove_var("VANDAL_TARGET");
            }
            writeln!(ctx.stdout(), "done")?;
            Ok(())
        })
        .install("logs", |ctx| {
            tracing::warn!("disk almost full");
            tracing::debug!("verbose detail");
            writeln!(ctx.stdout(), "logged")?;
            Ok(())
        });
    registry
}

/// In-process runner over [`registry`] that does not print results.
pub fn inprocess_runner(root: &ScriptDir) -> ScriptRunner {
    ScriptRunner::new(LaunchMode::InProcess, root.path(), false).with_registry(registry())
}

pub fn subprocess_runner(root: &ScriptDir) -> ScriptRunner {
    ScriptRunner::new(LaunchMode::SubProcess, root.path(), false).with_registry(registry())
}
