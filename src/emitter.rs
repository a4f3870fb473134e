//! Assembling terminated statements into the final host program.

use crate::terminator::terminate;
use crate::transform::Transformed;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Entry-point call appended to programs that do not start `main` themselves.
pub const ENTRY_POINT_GUARD: &str = r#"if (typeof main === "function") { await main(); }"#;

static EXISTING_ENTRY_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(?:await\s+)?main\(\)\s*;?\s*$").unwrap());

/// Final host source, in original statement order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedProgram {
    text: String,
}

impl EmittedProgram {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for EmittedProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// True when the program already starts `main` on its own.
pub fn has_entry_point(text: &str) -> bool {
    text.contains(ENTRY_POINT_GUARD) || EXISTING_ENTRY_CALL.is_match(text)
}

/// Terminate and join transformed statements, then add the entry point.
pub fn emit(statements: &[Transformed]) -> EmittedProgram {
    let mut text = statements
        .iter()
        .map(|statement| terminate(statement.text()))
        .collect::<Vec<_>>()
        .join("\n");

    if !has_entry_point(&text) {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(ENTRY_POINT_GUARD);
        text.push('\n');
    }
    EmittedProgram { text }
}
