//! Pipeline driver: a source file in, an execution report out.
//!
//! [`Toolchain::compile`] runs every stage that comes before a workspace exists;
//! [`Toolchain::execute`] hands the result to the sandbox.

use crate::config::{ProjectConfig, find_project_root};
use crate::emitter::{EmittedProgram, emit};
use crate::env::Environment;
use crate::error::Result;
use crate::host::locate_runtime;
use crate::io_adapters::OutputStreams;
use crate::sandbox::{Execution, Sandbox, SandboxOptions};
use crate::scanner::split_into_statements;
use crate::source::SourceUnit;
use crate::transform::{TransformContext, transform_all};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A source file taken through every stage up to emission.
#[derive(Debug)]
pub struct Compiled {
    pub source: SourceUnit,
    pub project_root: PathBuf,
    pub config: ProjectConfig,
    pub program: EmittedProgram,
}

/// Per-invocation settings that do not come from the project.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Takes precedence over `timeoutMs` from the project configuration.
    pub timeout: Option<Duration>,
    /// Where workspaces are created; the system temp directory when unset.
    pub workspace_parent: Option<PathBuf>,
}

/// The transpile-and-execute pipeline.
///
/// Holds the [`Environment`] snapshot every stage reads from, so a toolchain
/// built with [`Toolchain::new`] never looks at ambient process state.
///
/// Example
/// ```no_run
/// use fenrir::{RunOptions, Toolchain};
/// use std::path::Path;
/// let toolchain = Toolchain::default();
/// let execution = toolchain.run(Path::new("app.fnr"), &RunOptions::default()).unwrap();
/// assert_eq!(execution.exit_code, 0);
/// ```
pub struct Toolchain {
    env: Environment,
}

impl Toolchain {
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Read, scan, transform and emit `path` without running anything.
    ///
    /// Every failure here happens before a workspace exists.
    pub fn compile(&self, path: &Path) -> Result<Compiled> {
        let source = SourceUnit::read(path, &self.env.current_dir)?;
        let project_root = find_project_root(source.dir());
        let config = ProjectConfig::load(&project_root)?;
        log::debug!(
            "compiling {} (project root {})",
            source.path().display(),
            project_root.display()
        );

        let statements = split_into_statements(source.text());
        log::debug!("{} statements", statements.len());
        let ctx = TransformContext {
            source_dir: source.dir(),
            config: &config,
        };
        let transformed = transform_all(&statements, &ctx)?;
        let program = emit(&transformed);

        Ok(Compiled {
            source,
            project_root,
            config,
            program,
        })
    }

    /// Compile and execute `path`, streaming output to this process.
    pub fn run(&self, path: &Path, options: &RunOptions) -> Result<Execution> {
        self.run_with_output(path, options, OutputStreams::inherit())
    }

    pub fn run_with_output(
        &self,
        path: &Path,
        options: &RunOptions,
        output: OutputStreams,
    ) -> Result<Execution> {
        let compiled = self.compile(path)?;
        self.execute(&compiled, options, output)
    }

    /// Execute an already compiled program.
    pub fn execute(
        &self,
        compiled: &Compiled,
        options: &RunOptions,
        output: OutputStreams,
    ) -> Result<Execution> {
        let runtime_name = self
            .env
            .runtime_override()
            .unwrap_or(&compiled.config.runtime);
        let runtime = locate_runtime(runtime_name, &self.env)?;
        log::debug!("host runtime {}", runtime.display());

        let mut sandbox_options = SandboxOptions::new(runtime);
        sandbox_options.timeout = options.timeout.or_else(|| compiled.config.timeout());
        sandbox_options.dependency_dir = compiled.config.dependency_dir.clone();
        sandbox_options.debug = self.env.debug_enabled();
        sandbox_options.workspace_parent = options.workspace_parent.clone();

        Sandbox::new(&self.env, sandbox_options)
            .with_output(output)
            .execute(&compiled.program, &compiled.project_root)
    }
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::new(Environment::new())
    }
}
