// tests/concurrency.rs

//! Runs on parallel test threads must not see each other's overrides.

#![cfg(unix)]

mod common;

use std::io::Write;
use std::thread;
use std::time::Duration;

use common::ScriptDir;
use console_scripts::{CommandRegistry, LaunchMode, ScriptRunner};

#[test]
fn test_subprocess_run_ignores_concurrent_inprocess_overrides() {
    common::init_tracing();
    let root = ScriptDir::new();
    let scratch = root.subdir("scratch");
    let cwd = std::env::current_dir().unwrap();
    let path = std::env::var("PATH").unwrap_or_default();

    let mut registry = CommandRegistry::new();
    registry.install("slow", |ctx| {
        thread::sleep(Duration::from_millis(500));
        writeln!(ctx.stdout(), "slept")?;
        Ok(())
    });
    let inprocess = ScriptRunner::new(LaunchMode::InProcess, root.path(), false)
        .with_registry(registry);
    let subprocess = ScriptRunner::new(LaunchMode::SubProcess, root.path(), false);

    let slow = thread::spawn(move || {
        inprocess
            .command("slow")
            .cwd(&scratch)
            .env([("ONLY", "1")])
            .run()
            .unwrap()
    });

    thread::sleep(Duration::from_millis(150));
    let result = subprocess
        .run(["sh", "-c", "pwd; echo PATH=$PATH"])
        .unwrap();

    assert!(slow.join().unwrap().success());
    assert!(result.success(), "{result}");
    let mut lines = result.stdout().lines();
    let printed = std::path::PathBuf::from(lines.next().unwrap());
    assert_eq!(printed.canonicalize().unwrap(), cwd.canonicalize().unwrap());
    assert_eq!(lines.next(), Some(format!("PATH={path}").as_str()));
}
