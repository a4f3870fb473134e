//! Process environment snapshot and the variables fenrir reads.

use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Variable that turns on printing of the generated program before it runs.
pub const DEBUG_VAR: &str = "FENRIR_DEBUG";
/// Variable that overrides the configured host runtime executable.
pub const RUNTIME_VAR: &str = "FENRIR_RUNTIME";
/// Module search path understood by the host runtime.
pub const SEARCH_PATH_VAR: &str = "NODE_PATH";

/// Snapshot of the process environment the toolchain works against.
///
/// The snapshot is taken once, so nothing in the pipeline reads ambient
/// process state after startup. Tests build one by hand with whatever
/// variables they need.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Variables visible to the toolchain and forwarded to the child process.
    pub vars: HashMap<String, String>,
    /// Directory relative source paths are resolved against.
    pub current_dir: PathBuf,
}

impl Environment {
    /// Capture the current process state.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { vars, current_dir }
    }

    /// Build an environment from explicit parts.
    pub fn with_vars(vars: HashMap<String, String>, current_dir: impl Into<PathBuf>) -> Self {
        Self {
            vars,
            current_dir: current_dir.into(),
        }
    }

    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// True when generated source should be printed before execution.
    pub fn debug_enabled(&self) -> bool {
        match self.get_var(DEBUG_VAR) {
            Some(v) => !matches!(v.trim(), "" | "0" | "false"),
            None => false,
        }
    }

    pub fn runtime_override(&self) -> Option<&str> {
        self.get_var(RUNTIME_VAR).filter(|v| !v.is_empty())
    }

    /// Search path inherited from the invoking process, if any.
    pub fn inherited_search_path(&self) -> Option<&str> {
        self.get_var(SEARCH_PATH_VAR).filter(|v| !v.is_empty())
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
