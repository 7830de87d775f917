//! A tiny in-process interpreter for a subset of `sh`.
//!
//! It lets tests run the same `.sh` file in both launch modes. Supported,
//! one command per line:
//!
//! - `echo WORDS...` (append `>&2` to write to stderr)
//! - `cat` (copy stdin to stdout)
//! - `pwd`, `cd DIR`
//! - `export KEY=VALUE`
//! - `exit [CODE]`
//!
//! Words that are exactly `$NAME` expand to the environment variable.

use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::anyhow;
use console_scripts::{ScriptContext, ScriptEngine, ScriptExit, ScriptResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct MiniSh;

impl ScriptEngine for MiniSh {
    fn run(&self, path: &Path, ctx: &mut ScriptContext) -> ScriptResult {
        let source = std::fs::read_to_string(path)?;
        for line in source.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let words = shlex::split(line)
                .ok_or_else(|| ScriptExit::fault(anyhow!("mini-sh: bad quoting: {line}")))?;
            run_line(words, ctx)?;
        }
        Ok(())
    }
}

fn expand(word: String) -> String {
    match word.strip_prefix('$') {
        Some(name) if !name.is_empty() => std::env::var(name).unwrap_or_default(),
        _ => word,
    }
}

fn run_line(mut words: Vec<String>, ctx: &mut ScriptContext) -> ScriptResult {
    let to_stderr = words.last().is_some_and(|w| w == ">&2");
    if to_stderr {
        words.pop();
    }
    let mut words = words.into_iter().map(expand);
    let Some(command) = words.next() else {
        return Ok(());
    };
    let args: Vec<String> = words.collect();

    match command.as_str() {
        "echo" => {
            let text = args.join(" ");
            if to_stderr {
                writeln!(ctx.stderr(), "{text}")?;
            } else {
                writeln!(ctx.stdout(), "{text}")?;
            }
        }
        "cat" => {
            let mut input = Vec::new();
            ctx.stdin().read_to_end(&mut input)?;
            ctx.stdout().write_all(&input)?;
        }
        "pwd" => {
            let dir = std::env::current_dir()?;
            writeln!(ctx.stdout(), "{}", dir.display())?;
        }
        "cd" => {
            let dir = args.first().ok_or_else(|| io::Error::other("cd: missing operand"))?;
            std::env::set_current_dir(dir)?;
        }
        "export" => {
            for assignment in &args {
                let (key, value) = assignment
                    .split_once('=')
                    .ok_or_else(|| io::Error::other(format!("export: bad assignment {assignment}")))?;
                // SAFETY: engines only run under the runner's in-process guard,
                // which serializes environment access and restores it afterwards.
                unsafe { std::env::set_var(key, value) };
            }
        }
        "exit" => {
            return match args.first() {
                None => Err(ScriptExit::success()),
                Some(code) => match code.parse::<i32>() {
                    Ok(code) => Err(ScriptExit::code(code)),
                    Err(_) => Err(ScriptExit::message(code.clone())),
                },
            };
        }
        other => {
            return Err(ScriptExit::fault(anyhow!("mini-sh: unknown command: {other}")));
        }
    }
    Ok(())
}
