//! Command-line surface.
//!
//! Arguments are parsed with [`argh`]. A bare `<file>.fnr` is accepted as a
//! shorthand for `run <file>.fnr`.

use crate::source::is_source_file;
use argh::{EarlyExit, FromArgs};
use std::path::PathBuf;
use std::time::Duration;

/// Name used in usage text.
pub const COMMAND_NAME: &str = "fenrir";

#[derive(FromArgs, Debug, PartialEq)]
/// Transpile fenrir source files and run them with the host runtime.
pub struct Fenrir {
    #[argh(subcommand)]
    pub command: Command,
}

#[derive(FromArgs, Debug, PartialEq)]
#[argh(subcommand)]
pub enum Command {
    Run(RunCommand),
}

#[derive(FromArgs, Debug, PartialEq)]
/// Transpile a source file and execute it in a fresh workspace.
#[argh(subcommand, name = "run")]
pub struct RunCommand {
    #[argh(positional)]
    /// the .fnr file to run
    pub file: PathBuf,

    #[argh(option)]
    /// kill the program after this many milliseconds
    pub timeout: Option<u64>,

    #[argh(switch)]
    /// print the generated program instead of running it
    pub emit: bool,
}

impl RunCommand {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_millis)
    }
}

/// What the process should do after looking at its arguments.
#[derive(Debug, PartialEq)]
pub enum Invocation {
    Run(RunCommand),
    /// Print `output` and exit with `code` without running anything.
    Exit { output: String, code: i32 },
}

/// Turn `foo.fnr ...` into `run foo.fnr ...`.
pub fn normalize_args(mut args: Vec<String>) -> Vec<String> {
    if let Some(first) = args.first() {
        if !first.starts_with('-') && is_source_file(first) {
            args.insert(0, "run".to_string());
        }
    }
    args
}

/// Parse arguments that follow the program name.
///
/// Errors come back as [`Invocation::Exit`] carrying the message followed by
/// usage, with status 1. `--help` exits with status 0.
pub fn parse_args(args: &[String]) -> Invocation {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match Fenrir::from_args(&[COMMAND_NAME], &args) {
        Ok(Fenrir {
            command: Command::Run(run),
        }) => Invocation::Run(run),
        Err(EarlyExit { output, status }) => match status {
            Ok(()) => Invocation::Exit { output, code: 0 },
            Err(()) => Invocation::Exit {
                output: format!("{output}\n{}", usage()),
                code: 1,
            },
        },
    }
}

/// Top-level help text.
pub fn usage() -> String {
    match Fenrir::from_args(&[COMMAND_NAME], &["--help"]) {
        Ok(_) => String::new(),
        Err(EarlyExit { output, .. }) => output,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_bare_source_file_becomes_run() {
        assert_eq!(normalize_args(args(&["app.fnr"])), args(&["run", "app.fnr"]));
        assert_eq!(
            normalize_args(args(&["dir/app.fnr", "--emit"])),
            args(&["run", "dir/app.fnr", "--emit"])
        );
        assert_eq!(normalize_args(args(&["run", "app.fnr"])), args(&["run", "app.fnr"]));
        assert_eq!(normalize_args(args(&["build"])), args(&["build"]));
        assert!(normalize_args(Vec::new()).is_empty());
    }

    #[test]
    fn test_parse_run() {
        let invocation = parse_args(&args(&["run", "app.fnr", "--timeout", "500", "--emit"]));
        let expected = RunCommand {
            file: PathBuf::from("app.fnr"),
            timeout: Some(500),
            emit: true,
        };
        assert_eq!(invocation, Invocation::Run(expected));
    }

    #[test]
    fn test_parse_run_defaults() {
        match parse_args(&args(&["run", "app.fnr"])) {
            Invocation::Run(run) => {
                assert_eq!(run.timeout(), None);
                assert!(!run.emit);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unknown_command_prints_usage_and_fails() {
        match parse_args(&args(&["build", "app.fnr"])) {
            Invocation::Exit { output, code } => {
                assert_eq!(code, 1);
                assert!(output.contains("Usage: fenrir"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_argument_fails() {
        assert!(matches!(
            parse_args(&args(&["run"])),
            Invocation::Exit { code: 1, .. }
        ));
    }

    #[test]
    fn test_help_exits_zero() {
        match parse_args(&args(&["--help"])) {
            Invocation::Exit { output, code } => {
                assert_eq!(code, 0);
                assert!(output.contains("run"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
