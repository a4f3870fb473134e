//! Running an emitted program in an isolated workspace.
//!
//! One child process per execution. Its stdout and stderr are forwarded line
//! by line by two reader threads; both are drained completely before the
//! child's exit status is collected, so nothing written just before exit is
//! lost.

use crate::bridge;
use crate::emitter::EmittedProgram;
use crate::env::{Environment, SEARCH_PATH_VAR};
use crate::error::{FenrirError, Result};
use crate::host::exit_code_of;
use crate::io_adapters::OutputStreams;
use crate::workspace::{MirrorWarning, Workspace};
use regex::Regex;
use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::LazyLock;
use std::thread;
use std::time::{Duration, Instant};

/// Process exit code. Zero means success.
pub type ExitCode = i32;

/// Lines the host runtime prints when a program dies with an uncaught error.
///
/// Matching is on stderr text only, so a program that prints its own
/// `Error: ...` line and then exits non-zero is reported as a startup failure
/// too.
static ERROR_REPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z]*Error\b|Uncaught\b|node:internal|\(Use `node --trace-uncaught)")
        .unwrap()
});

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Knobs for one execution.
#[derive(Debug, Clone)]
pub struct SandboxOptions {
    /// Resolved host runtime executable.
    pub runtime: PathBuf,
    pub timeout: Option<Duration>,
    /// Name of the dependency directory inside the project root.
    pub dependency_dir: String,
    /// Print the generated source and search path before running.
    pub debug: bool,
    /// Where workspaces are created; the system temp directory when unset.
    pub workspace_parent: Option<PathBuf>,
}

impl SandboxOptions {
    pub fn new(runtime: impl Into<PathBuf>) -> Self {
        Self {
            runtime: runtime.into(),
            timeout: None,
            dependency_dir: "node_modules".to_string(),
            debug: false,
            workspace_parent: None,
        }
    }
}

/// What a finished execution looked like.
#[derive(Debug)]
pub struct Execution {
    /// The program's own exit code.
    pub exit_code: ExitCode,
    /// Workspace the program ran in. Already removed by the time this is returned.
    pub workspace: PathBuf,
    pub warnings: Vec<MirrorWarning>,
}

struct ChildOutcome {
    status: Option<ExitStatus>,
    timed_out: bool,
    reported_error: bool,
}

pub struct Sandbox<'a> {
    env: &'a Environment,
    options: SandboxOptions,
    output: OutputStreams,
}

impl<'a> Sandbox<'a> {
    pub fn new(env: &'a Environment, options: SandboxOptions) -> Self {
        Self {
            env,
            options,
            output: OutputStreams::inherit(),
        }
    }

    /// Send child output somewhere other than this process's own streams.
    pub fn with_output(mut self, output: OutputStreams) -> Self {
        self.output = output;
        self
    }

    /// Run `program` for the project rooted at `project_root`.
    ///
    /// The workspace is removed on every path out of this function.
    pub fn execute(
        &mut self,
        program: &EmittedProgram,
        project_root: &Path,
    ) -> Result<Execution> {
        let workspace = Workspace::create(self.options.workspace_parent.as_deref())?;
        let result = self.execute_in(&workspace, program, project_root);
        let workspace_path = workspace.path().to_path_buf();
        workspace.remove();

        let (exit_code, warnings) = result?;
        Ok(Execution {
            exit_code,
            workspace: workspace_path,
            warnings,
        })
    }

    fn execute_in(
        &mut self,
        workspace: &Workspace,
        program: &EmittedProgram,
        project_root: &Path,
    ) -> Result<(ExitCode, Vec<MirrorWarning>)> {
        let warnings = workspace.mirror_dependencies(project_root, &self.options.dependency_dir);
        workspace.write_prelude()?;
        let source = bridge::entry_source(program);
        let program_file = workspace.write_program(&source)?;
        let search_path = self.search_path(workspace, project_root)?;
        log::debug!("{}={}", SEARCH_PATH_VAR, search_path.to_string_lossy());

        if self.options.debug {
            self.print_debug(program, &search_path);
        }

        let outcome = match self.run_child(&program_file, workspace.path(), &search_path) {
            Ok(outcome) => outcome,
            Err(reason) => return Err(self.startup_failure(&source, reason, None)),
        };
        let exit_code = outcome.status.map(exit_code_of);

        if outcome.timed_out {
            let reason = match self.options.timeout {
                Some(limit) => format!("program exceeded the {} ms timeout", limit.as_millis()),
                None => "program timed out".to_string(),
            };
            return Err(self.startup_failure(&source, reason, exit_code));
        }

        match (outcome.status, exit_code) {
            (Some(status), Some(code)) if status.code().is_some() => {
                if code != 0 && outcome.reported_error {
                    let reason = format!("program exited with code {code} after an uncaught error");
                    return Err(self.startup_failure(&source, reason, Some(code)));
                }
                log::info!("program exited with code {code}");
                Ok((code, warnings))
            }
            (_, code) => {
                let reason = "program was terminated by a signal".to_string();
                Err(self.startup_failure(&source, reason, code))
            }
        }
    }

    /// Workspace dependencies first, then the project's, then whatever was inherited.
    fn search_path(&self, workspace: &Workspace, project_root: &Path) -> Result<OsString> {
        let mut entries = vec![
            workspace.path().join(&self.options.dependency_dir),
            project_root.join(&self.options.dependency_dir),
        ];
        if let Some(inherited) = self.env.inherited_search_path() {
            entries.extend(std::env::split_paths(inherited));
        }
        std::env::join_paths(entries).map_err(|e| {
            FenrirError::WorkspaceSetup(io::Error::new(io::ErrorKind::InvalidInput, e))
        })
    }

    fn print_debug(&mut self, program: &EmittedProgram, search_path: &OsString) {
        let stderr = &mut self.output.stderr;
        let _ = writeln!(stderr, "--- generated source ---");
        let _ = write!(stderr, "{}", render_numbered(program.as_str()));
        let _ = writeln!(stderr, "--- {SEARCH_PATH_VAR}={} ---", search_path.to_string_lossy());
    }

    /// Spawn the runtime and stream its output. `Err` carries why it could not run.
    fn run_child(
        &mut self,
        program_file: &Path,
        workspace_dir: &Path,
        search_path: &OsString,
    ) -> std::result::Result<ChildOutcome, String> {
        let mut child = Command::new(&self.options.runtime)
            .arg(program_file)
            .env_clear()
            .envs(self.env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .env(SEARCH_PATH_VAR, search_path)
            .current_dir(workspace_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("could not start {}: {e}", self.options.runtime.display()))?;

        let child_stdout = child.stdout.take();
        let child_stderr = child.stderr.take();
        let timeout = self.options.timeout;
        let OutputStreams { stdout, stderr } = &mut self.output;

        let (timed_out, reported_error) = thread::scope(|scope| {
            let out_reader = scope.spawn(move || match child_stdout {
                Some(pipe) => forward_lines(pipe, stdout.as_mut()),
                None => Ok(false),
            });
            let err_reader = scope.spawn(move || match child_stderr {
                Some(pipe) => forward_lines(pipe, stderr.as_mut()),
                None => Ok(false),
            });

            let timed_out = match timeout {
                Some(limit) => wait_or_kill(&mut child, limit),
                None => false,
            };

            let _ = join_reader(out_reader, "stdout");
            let reported_error = join_reader(err_reader, "stderr");
            (timed_out, reported_error)
        });

        let status = child
            .wait()
            .map_err(|e| format!("failed to wait for program: {e}"))?;
        let status = if timed_out { None } else { Some(status) };
        Ok(ChildOutcome {
            status,
            timed_out,
            reported_error,
        })
    }

    /// Show the entry file with line numbers, then build the error.
    fn startup_failure(
        &mut self,
        source: &str,
        reason: String,
        exit_code: Option<ExitCode>,
    ) -> FenrirError {
        log::error!("{reason}; generated source follows");
        let rendered = render_numbered(source);
        let _ = writeln!(
            self.output.stderr,
            "--- generated source (program starts at line {}) ---",
            bridge::program_start_line()
        );
        let _ = write!(self.output.stderr, "{rendered}");
        let _ = self.output.stderr.flush();
        FenrirError::SpawnFailure { reason, exit_code }
    }
}

/// Poll until the child exits or `limit` passes; kill it in the latter case.
fn wait_or_kill(child: &mut Child, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return false,
            Ok(None) if Instant::now() >= deadline => {
                if let Err(e) = child.kill() {
                    log::warn!("failed to kill timed out program: {e}");
                }
                return true;
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                log::warn!("failed to poll program status: {e}");
                return false;
            }
        }
    }
}

fn join_reader(handle: thread::ScopedJoinHandle<'_, io::Result<bool>>, name: &str) -> bool {
    match handle.join() {
        Ok(Ok(reported_error)) => reported_error,
        Ok(Err(e)) => {
            log::warn!("lost part of program {name}: {e}");
            false
        }
        Err(_) => {
            log::warn!("{name} reader panicked");
            false
        }
    }
}

/// Copy `reader` to `sink` one line at a time, flushing after each line.
///
/// Returns whether any line looked like an uncaught-error report.
fn forward_lines<R: Read>(reader: R, sink: &mut (dyn Write + Send)) -> io::Result<bool> {
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    let mut reported_error = false;
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        if !reported_error {
            reported_error = ERROR_REPORT.is_match(&String::from_utf8_lossy(&line));
        }
        sink.write_all(&line)?;
        sink.flush()?;
    }
    Ok(reported_error)
}

/// Source text with right-aligned 1-based line numbers.
pub fn render_numbered(source: &str) -> String {
    let width = source.lines().count().max(1).to_string().len().max(4);
    source
        .lines()
        .enumerate()
        .map(|(i, line)| format!("{:>width$} | {line}\n", i + 1))
        .collect()
}
