//! Runtime capability bridge.
//!
//! The bridge lives inside the executed program. Its source is a prelude
//! module written next to the program and imported by the program's first
//! line. Module imports are evaluated in order, so the prelude has bound
//! `globalThis.fenrir` before any declared module is loaded. Nothing here
//! keeps state in the toolchain process itself.

use crate::emitter::EmittedProgram;

/// Source of the prelude, in the host language.
pub const PRELUDE: &str = include_str!("prelude.mjs");

/// File the prelude is written to, beside the program.
pub const PRELUDE_FILE: &str = "fenrir-prelude.mjs";

/// Statement that loads the prelude ahead of every other import.
pub fn prelude_import() -> String {
    format!("import \"./{PRELUDE_FILE}\";")
}

/// 1-based line of the entry file on which the emitted program starts.
pub fn program_start_line() -> usize {
    prelude_import().lines().count() + 1
}

/// Entry file contents: the prelude import followed by the program.
pub fn entry_source(program: &EmittedProgram) -> String {
    let import = prelude_import();
    let mut combined = String::with_capacity(import.len() + program.as_str().len() + 1);
    combined.push_str(&import);
    combined.push('\n');
    combined.push_str(program.as_str());
    combined
}
