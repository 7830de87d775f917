// tests/inprocess.rs

mod common;

use std::ffi::OsString;

use common::{inprocess_runner, registry, setup, ScriptDir};
use console_scripts::{LaunchMode, ScriptError, ScriptRunner};
use serial_test::serial;

#[test]
#[serial]
fn test_hello_scenario() {
    setup();
    let root = ScriptDir::new();
    let result = inprocess_runner(&root).run("greet").unwrap();

    assert_eq!(result.stdout(), "hello, world\n");
    assert_eq!(result.stderr(), "");
    assert_eq!(result.returncode(), 0);
    assert!(result.success());
    assert_eq!(result.invocation().launch_mode, Some(LaunchMode::InProcess));
}

#[test]
#[serial]
fn test_arguments_follow_command_name() {
    setup();
    let root = ScriptDir::new();
    let result = inprocess_runner(&root)
        .command(["greet", "Ada"])
        .arg("--loud")
        .run()
        .unwrap();
    assert_eq!(result.stdout(), "HELLO, ADA\n");
}

#[test]
#[serial]
fn test_string_command_is_split_like_a_shell() {
    setup();
    let root = ScriptDir::new();
    let result = inprocess_runner(&root).run("greet 'Grace Hopper'").unwrap();
    assert_eq!(result.stdout(), "hello, Grace Hopper\n");
}

#[test]
#[serial]
fn test_exit_code_two() {
    setup();
    let root = ScriptDir::new();
    let result = inprocess_runner(&root).run(["exit-with", "2"]).unwrap();
    assert_eq!(result.returncode(), 2);
    assert!(!result.success());
    assert_eq!(result.stdout(), "exiting with 2\n");
}

#[test]
#[serial]
fn test_exit_without_code_is_success() {
    setup();
    let root = ScriptDir::new();
    let result = inprocess_runner(&root).run("exit-none").unwrap();
    assert_eq!(result.returncode(), 0);
    assert_eq!(result.stderr(), "");
}

#[test]
#[serial]
fn test_exit_message_goes_to_stderr() {
    setup();
    let root = ScriptDir::new();
    let result = inprocess_runner(&root).run("exit-message").unwrap();
    assert_eq!(result.returncode(), 1);
    assert_eq!(result.stderr(), "bad config\n");
}

#[test]
#[serial]
fn test_fault_is_reported_not_raised() {
    setup();
    let root = ScriptDir::new();
    let result = inprocess_runner(&root).run("fault").unwrap();
    assert_eq!(result.returncode(), 1);
    assert_eq!(result.stdout(), "before the fault\n");
    assert!(result.stderr().contains("disk quota exceeded"));
}

#[test]
#[serial]
fn test_panic_is_reported_not_raised() {
    setup();
    let root = ScriptDir::new();
    let result = inprocess_runner(&root).run("panics").unwrap();
    assert_eq!(result.returncode(), 1);
    assert!(result.stderr().contains("kaboom"));
}

#[test]
#[serial]
fn test_stdin_is_fed_to_script() {
    setup();
    let root = ScriptDir::new();
    let runner = inprocess_runner(&root);

    let result = runner.command("upper").stdin("foo\nbar\n").run().unwrap();
    assert_eq!(result.stdout(), "FOO\nBAR\n");

    let result = runner.run("upper").unwrap();
    assert_eq!(result.stdout(), "");
}

#[test]
#[serial]
fn test_env_override_replaces_environment() {
    setup();
    let root = ScriptDir::new();
    // SAFETY: serialized with every other test that touches the environment.
    unsafe { std::env::set_var("INHERITED_ONLY", "yes") };

    let result = inprocess_runner(&root)
        .command(["print-env", "INHERITED_ONLY", "GIVEN"])
        .env([("GIVEN", "value")])
        .run()
        .unwrap();
    assert_eq!(result.stdout(), "INHERITED_ONLY=<unset>\nGIVEN=value\n");

    assert_eq!(std::env::var("INHERITED_ONLY").as_deref(), Ok("yes"));
    assert!(std::env::var_os("GIVEN").is_none());
    unsafe { std::env::remove_var("INHERITED_ONLY") };
}

#[test]
#[serial]
fn test_cwd_override_is_applied_and_restored() {
    setup();
    let root = ScriptDir::new();
    let work = root.subdir("work").canonicalize().unwrap();
    let before = std::env::current_dir().unwrap();

    let result = inprocess_runner(&root)
        .command("print-cwd")
        .cwd(&work)
        .run()
        .unwrap();
    assert_eq!(result.stdout(), format!("{}\n", work.display()));
    assert_eq!(std::env::current_dir().unwrap(), before);
}

#[test]
#[serial]
fn test_process_state_is_restored_after_script_changes_it() {
    setup();
    let root = ScriptDir::new();
    let before_cwd = std::env::current_dir().unwrap();
    // SAFETY: serialized with every other test that touches the environment.
    unsafe { std::env::set_var("VANDAL_TARGET", "keep me") };
    let before_env: Vec<(OsString, OsString)> = std::env::vars_os().collect();

    let result = inprocess_runner(&root).run("vandal").unwrap();
    assert!(result.success());

    assert_eq!(std::env::current_dir().unwrap(), before_cwd);
    let after_env: Vec<(OsString, OsString)> = std::env::vars_os().collect();
    assert_eq!(before_env.len(), after_env.len());
    for pair in &before_env {
        assert!(after_env.contains(pair), "lost {pair:?}");
    }
    assert!(std::env::var_os("VANDAL_WAS_HERE").is_none());
    unsafe { std::env::remove_var("VANDAL_TARGET") };
}

#[test]
#[serial]
fn test_state_is_restored_after_panic() {
    setup();
    let root = ScriptDir::new();
    let before = std::env::current_dir().unwrap();
    let work = root.subdir("elsewhere");

    let result = inprocess_runner(&root)
        .command("panics")
        .cwd(&work)
        .run()
        .unwrap();
    assert_eq!(result.returncode(), 1);
    assert_eq!(std::env::current_dir().unwrap(), before);
}

#[test]
#[serial]
fn test_script_logging_is_captured_per_run() {
    setup();
    let root = ScriptDir::new();
    let runner = inprocess_runner(&root);
    let env = [("RUST_LOG", "warn")];

    let first = runner.command("logs").env(env).run().unwrap();
    assert!(first.stderr().contains("disk almost full"));
    assert!(!first.stderr().contains("verbose detail"));

    // The second run starts with a clean capture.
    let second = runner.command("greet").env(env).run().unwrap();
    assert_eq!(second.stderr(), "");
}

#[test]
#[serial]
fn test_nested_inprocess_run() {
    setup();
    let root = ScriptDir::new();
    let mut registry = registry();
    let inner_root = root.path().to_path_buf();
    registry.install("outer", move |ctx| {
        use std::io::Write;

        let inner = ScriptRunner::new(LaunchMode::InProcess, &inner_root, false)
            .with_registry(common::registry());
        let result = inner
            .run(["greet", "inner"])
            .map_err(console_scripts::ScriptExit::fault)?;
        write!(ctx.stdout(), "outer saw: {}", result.stdout())?;
        Ok(())
    });
    let runner = ScriptRunner::new(LaunchMode::InProcess, root.path(), false).with_registry(registry);

    let result = runner.run("outer").unwrap();
    assert_eq!(result.stdout(), "outer saw: hello, inner\n");
}

#[test]
#[serial]
fn test_check_returns_called_process_error() {
    setup();
    let root = ScriptDir::new();
    let err = inprocess_runner(&root)
        .command(["exit-with", "3"])
        .check(true)
        .run()
        .unwrap_err();
    match err {
        ScriptError::CalledProcess { code, argv, stdout, .. } => {
            assert_eq!(code, 3);
            assert_eq!(argv, vec![OsString::from("exit-with"), OsString::from("3")]);
            assert_eq!(stdout, "exiting with 3\n");
        }
        other => panic!("expected CalledProcess, got {other:?}"),
    }
}

#[test]
#[serial]
fn test_check_passes_on_success() {
    setup();
    let root = ScriptDir::new();
    let result = inprocess_runner(&root).command("greet").check(true).run().unwrap();
    assert!(result.success());
}

#[cfg(unix)]
#[test]
fn test_native_executable_cannot_run_inprocess() {
    setup();
    let root = ScriptDir::new();
    let tool = root.write_executable("native-tool", "#!/bin/sh\necho native\n");
    let err = inprocess_runner(&root).run(&tool).unwrap_err();
    assert!(matches!(err, ScriptError::CannotRunInProcess { .. }));
}

#[test]
fn test_script_without_engine_cannot_run_inprocess() {
    setup();
    let root = ScriptDir::new();
    let script = root.write("job.py", "print('hi')\n");
    let err = inprocess_runner(&root).run(&script).unwrap_err();
    match err {
        ScriptError::CannotRunInProcess { reason, .. } => assert!(reason.contains(".py")),
        other => panic!("expected CannotRunInProcess, got {other:?}"),
    }
}

#[test]
fn test_shell_is_rejected_inprocess() {
    setup();
    let root = ScriptDir::new();
    let err = inprocess_runner(&root)
        .command("greet")
        .shell(true)
        .run()
        .unwrap_err();
    assert!(matches!(err, ScriptError::ShellInProcess(_)));
}

#[test]
fn test_missing_command_fails_before_running() {
    setup();
    let root = ScriptDir::new();
    let err = inprocess_runner(&root)
        .run("no-such-command-anywhere")
        .unwrap_err();
    match err {
        ScriptError::ScriptNotFound { name, .. } => assert_eq!(name, "no-such-command-anywhere"),
        other => panic!("expected ScriptNotFound, got {other:?}"),
    }
}

#[test]
#[serial]
fn test_timeout_is_ignored_inprocess() {
    setup();
    let root = ScriptDir::new();
    let result = inprocess_runner(&root)
        .command("greet")
        .timeout(std::time::Duration::from_millis(1))
        .run()
        .unwrap();
    assert!(result.success());
}
