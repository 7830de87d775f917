// tests/locate.rs

mod common;

use std::collections::BTreeMap;
use std::ffi::OsString;

use common::{registry, ScriptDir};
use console_scripts::config::default_interpreters;
use console_scripts::{CommandRegistry, LaunchMode, Locator, ScriptError, ScriptRunner, Target};

fn runner(root: &ScriptDir) -> ScriptRunner {
    ScriptRunner::new(LaunchMode::SubProcess, root.path(), false).with_registry(registry())
}

#[test]
fn test_installed_command_resolves_without_running() {
    let root = ScriptDir::new();
    let target = runner(&root).resolve("greet", None, None).unwrap();
    match target {
        Target::InstalledCommand { entry, .. } => assert_eq!(entry.name(), "greet"),
        other => panic!("expected installed command, got {other:?}"),
    }
}

#[test]
fn test_resolution_is_idempotent() {
    let root = ScriptDir::new();
    root.write("tool.sh", "echo hi\n");
    let runner = runner(&root);

    let first = runner.resolve("tool.sh", Some(root.path()), None).unwrap();
    let second = runner.resolve("tool.sh", Some(root.path()), None).unwrap();
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(first.kind(), "script file");
}

#[cfg(unix)]
#[test]
fn test_override_path_is_searched() {
    let root = ScriptDir::new();
    let bin = root.subdir("bin");
    std::fs::write(bin.join("only-here"), "#!/bin/sh\n").unwrap();
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(bin.join("only-here"), std::fs::Permissions::from_mode(0o755))
            .unwrap();
    }
    let runner = runner(&root);

    assert!(matches!(
        runner.resolve("only-here", Some(root.path()), None),
        Err(ScriptError::ScriptNotFound { .. })
    ));

    let mut env = BTreeMap::new();
    env.insert(OsString::from("PATH"), bin.clone().into_os_string());
    match runner.resolve("only-here", Some(root.path()), Some(&env)).unwrap() {
        Target::Executable { path } => assert_eq!(path, bin.join("only-here")),
        other => panic!("expected executable, got {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn test_executable_script_keeps_its_shebang() {
    let root = ScriptDir::new();
    let script = root.write_executable("run.sh", "#!/bin/sh\necho hi\n");
    let registry = CommandRegistry::new();
    let interpreters = default_interpreters();

    let target = Locator::new(&registry, &interpreters)
        .resolve(script.as_os_str(), None, None)
        .unwrap();
    assert_eq!(target.subprocess_prefix(), Some(vec![script.into_os_string()]));
}

#[test]
fn test_not_found_lists_search_locations() {
    let root = ScriptDir::new();
    let mut env = BTreeMap::new();
    env.insert(OsString::from("PATH"), root.path().as_os_str().to_owned());

    let err = runner(&root)
        .resolve("missing-tool", Some(root.path()), Some(&env))
        .unwrap_err();
    match err {
        ScriptError::ScriptNotFound { searched, .. } => {
            assert!(searched.iter().all(|p| p.ends_with("missing-tool")));
            assert!(!searched.is_empty());
        }
        other => panic!("expected ScriptNotFound, got {other:?}"),
    }
}
