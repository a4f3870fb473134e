//! Automatic statement termination.
//!
//! The decision is a fixed, ordered table evaluated against the trimmed
//! statement; the first matching row wins. Programs depend on the exact
//! outcome of this table, so rows are never reordered or "fixed".

use regex::Regex;
use std::sync::LazyLock;

pub const TERMINATOR: char = ';';

static CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_$][a-zA-Z0-9_$.]*\s*\(").unwrap());
static INCREMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w+\s*\+\+").unwrap());
static DECREMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w+\s*--").unwrap());
static COMPOUND_ASSIGN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+\s*[+\-*/]=").unwrap());
static CLOSE_THEN_ELSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^}\s*else").unwrap());

/// Control-flow and declaration openers that never take a terminator.
const KEYWORD_PREFIXES: &[&str] = &[
    "function ", "if ", "else", "for ", "while ", "switch ", "try", "catch", "finally",
    "import ", "export ",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Keep,
    Append,
}

const DECISIONS: &[(fn(&str) -> bool, Decision)] = &[
    (|s| s.is_empty(), Decision::Keep),
    (|s| s.ends_with(TERMINATOR), Decision::Keep),
    (|s| s.ends_with('{') || s.ends_with('}'), Decision::Keep),
    (|s| s.ends_with(')') && !has_assignment_or_call(s), Decision::Keep),
    (
        |s| KEYWORD_PREFIXES.iter().any(|k| s.starts_with(k)) || CLOSE_THEN_ELSE.is_match(s),
        Decision::Keep,
    ),
    (is_terminable, Decision::Append),
];

fn has_assignment_or_call(s: &str) -> bool {
    s.contains('=') || s.contains("console.log") || s.contains("return ") || CALL.is_match(s)
}

fn is_terminable(s: &str) -> bool {
    has_assignment_or_call(s)
        || s.starts_with("const ")
        || s.starts_with("let ")
        || s.starts_with("var ")
        || INCREMENT.is_match(s)
        || DECREMENT.is_match(s)
        || COMPOUND_ASSIGN.is_match(s)
}

/// Whether `statement` should get a terminator appended.
pub fn needs_terminator(statement: &str) -> bool {
    let trimmed = statement.trim();
    DECISIONS
        .iter()
        .find(|(applies, _)| applies(trimmed))
        .map(|(_, decision)| *decision == Decision::Append)
        .unwrap_or(false)
}

/// Append the terminator when the table asks for one.
///
/// Trailing whitespace is dropped when a terminator is added. Applying this
/// to its own output is a no-op.
pub fn terminate(statement: &str) -> String {
    if needs_terminator(statement) {
        let mut out = statement.trim_end().to_string();
        out.push(TERMINATOR);
        out
    } else {
        statement.to_string()
    }
}
