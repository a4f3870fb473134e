//! Statement-level rewriting of surface syntax into host JavaScript.
//!
//! Rewrites are line oriented, not a parse. Each statement is checked against
//! an ordered table of start-of-statement rules (first match wins), then the
//! logging alias is substituted anywhere in the result.

use crate::config::ProjectConfig;
use crate::error::{FenrirError, Result};
use crate::scanner::Statement;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

static FORBIDDEN_IMPORT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bimport\b").unwrap());
static FN_KEYWORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^fn\s+").unwrap());
static DECLARE_KEYWORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^declare\s").unwrap());
static DECLARE_FORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^declare\s+(.+?)\s+from\s+(?:"([^"]+)"|'([^']+)')\s*;?\s*$"#).unwrap()
});
static LOG_ALIAS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\blog\(").unwrap());
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap());

/// Extensions that mark a module path as a local file.
const LOCAL_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "ts", "json", "fnr"];

/// How the names of a `declare` statement are bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// `declare name from "..."`
    Default,
    /// `declare { a, b as c } from "..."`
    Named,
    /// `declare * as ns from "..."`
    Namespace,
}

/// A parsed `declare` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecord {
    pub kind: BindingKind,
    /// Bindings in source order. Named entries keep any `as` rename.
    pub binding_names: Vec<String>,
    /// Path after alias resolution.
    pub module_path: String,
    /// Fixed once from the surface form of `module_path`.
    pub is_external: bool,
}

impl ImportRecord {
    fn new(kind: BindingKind, binding_names: Vec<String>, module_path: String) -> Self {
        let is_external = is_external_module(&module_path);
        Self {
            kind,
            binding_names,
            module_path,
            is_external,
        }
    }

    /// Host import declaration for this record.
    ///
    /// Local paths become absolute `file://` URLs rooted at `source_dir`, so
    /// the program still resolves them when executed from elsewhere.
    pub fn to_host(&self, source_dir: &Path) -> String {
        let bindings = match self.kind {
            BindingKind::Named => format!("{{ {} }}", self.binding_names.join(", ")),
            BindingKind::Default | BindingKind::Namespace => self.binding_names.join(", "),
        };
        let specifier = if self.is_external {
            self.module_path.clone()
        } else {
            let resolved = normalize_path(&source_dir.join(&self.module_path));
            format!("file://{}", resolved.display())
        };
        format!("import {bindings} from \"{specifier}\";")
    }
}

/// Result of transforming one statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformed {
    /// Host text, still without a terminator decision.
    Raw(String),
    Import { record: ImportRecord, text: String },
}

impl Transformed {
    pub fn text(&self) -> &str {
        match self {
            Transformed::Raw(text) => text,
            Transformed::Import { text, .. } => text,
        }
    }

    pub fn import_record(&self) -> Option<&ImportRecord> {
        match self {
            Transformed::Import { record, .. } => Some(record),
            Transformed::Raw(_) => None,
        }
    }
}

/// Everything a rewrite may need beyond the statement itself.
pub struct TransformContext<'a> {
    pub source_dir: &'a Path,
    pub config: &'a ProjectConfig,
}

enum Rewrite {
    Text(String),
    Import(ImportRecord),
}

/// A start-of-statement rewrite. `applies` sees the trimmed statement.
struct Rule {
    name: &'static str,
    applies: fn(&str) -> bool,
    rewrite: fn(&str, &TransformContext) -> std::result::Result<Rewrite, String>,
}

const STATEMENT_RULES: &[Rule] = &[
    Rule {
        name: "function keyword",
        applies: |s| FN_KEYWORD.is_match(s),
        rewrite: |s, _| Ok(Rewrite::Text(FN_KEYWORD.replace(s, "function ").into_owned())),
    },
    Rule {
        name: "declare",
        applies: |s| DECLARE_KEYWORD.is_match(s),
        rewrite: rewrite_declare,
    },
];

fn rewrite_declare(
    statement: &str,
    ctx: &TransformContext,
) -> std::result::Result<Rewrite, String> {
    let caps = DECLARE_FORM.captures(statement).ok_or_else(|| {
        "malformed declare, expected: declare <names> from \"<module>\"".to_string()
    })?;
    let bindings = caps[1].trim();
    let raw_path = caps
        .get(2)
        .or_else(|| caps.get(3))
        .map(|m| m.as_str())
        .unwrap_or_default();

    let (kind, names) = parse_bindings(bindings)?;
    let module_path = ctx.config.resolve_alias(raw_path).to_string();
    let record = ImportRecord::new(kind, names, module_path);
    log::debug!(
        "declare {:?} from {} ({})",
        record.binding_names,
        record.module_path,
        if record.is_external { "external" } else { "local" }
    );
    Ok(Rewrite::Import(record))
}

fn parse_bindings(bindings: &str) -> std::result::Result<(BindingKind, Vec<String>), String> {
    if let Some(inner) = bindings
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
    {
        let names: Vec<String> = inner
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            return Err("declare needs at least one name".to_string());
        }
        return Ok((BindingKind::Named, names));
    }
    if let Some(ns) = bindings.strip_prefix('*') {
        let ns = ns.trim_start();
        let alias = ns.strip_prefix("as").map(str::trim).unwrap_or_default();
        if IDENTIFIER.is_match(alias) {
            return Ok((BindingKind::Namespace, vec![format!("* as {alias}")]));
        }
        return Err(format!("invalid namespace binding '{bindings}'"));
    }
    if IDENTIFIER.is_match(bindings) {
        return Ok((BindingKind::Default, vec![bindings.to_string()]));
    }
    Err(format!("invalid binding list '{bindings}'"))
}

/// Classify a module path: `true` for a registry module, `false` for a file.
pub fn is_external_module(module_path: &str) -> bool {
    if module_path.starts_with("./") || module_path.starts_with("../") {
        return false;
    }
    if module_path.starts_with('/') {
        return false;
    }
    let is_local_file = Path::new(module_path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| LOCAL_EXTENSIONS.contains(&ext));
    !is_local_file
}

/// Fold `.` and `..` components without touching the file system.
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Replace the logging alias with the host's console call.
///
/// Member calls such as `console.log(` or `$log(` are left alone.
pub fn substitute_log_alias(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in LOG_ALIAS.find_iter(text) {
        let member_call = text[..m.start()].ends_with(['.', '$']);
        out.push_str(&text[last..m.start()]);
        out.push_str(if member_call { m.as_str() } else { "console.log(" });
        last = m.end();
    }
    out.push_str(&text[last..]);
    out
}

/// Reject any use of the host's own import keyword.
///
/// In a well-formed `declare` only the binding list is checked; the quoted
/// module path may name things like `import-fresh` or `./import.mjs`.
fn check_forbidden(statement: &Statement) -> Result<()> {
    let text = statement.text.as_str();
    let lead = text.len() - text.trim_start().len();
    let (base, checked) = match DECLARE_FORM.captures(text.trim()).and_then(|caps| caps.get(1)) {
        Some(bindings) => (lead + bindings.start(), bindings.as_str()),
        None => (0, text),
    };
    match FORBIDDEN_IMPORT.find(checked) {
        Some(m) => {
            let offset = text[..base + m.start()].matches('\n').count();
            Err(FenrirError::ForbiddenConstruct {
                line: statement.line + offset,
            })
        }
        None => Ok(()),
    }
}

/// Transform a single statement.
pub fn transform_statement(statement: &Statement, ctx: &TransformContext) -> Result<Transformed> {
    check_forbidden(statement)?;
    if statement.is_blank() {
        return Ok(Transformed::Raw(statement.text.clone()));
    }
    if statement.unterminated {
        log::warn!(
            "line {}: statement has unbalanced parentheses at end of input",
            statement.line
        );
    }
    if statement.is_multi_line() {
        log::debug!(
            "line {}: statement spans {} lines",
            statement.line,
            statement.line_count
        );
    }

    let content = statement.text.trim();
    let indent = &statement.text[..statement.text.len() - statement.text.trim_start().len()];

    let rewrite = match STATEMENT_RULES.iter().find(|rule| (rule.applies)(content)) {
        Some(rule) => (rule.rewrite)(content, ctx).map_err(|reason| {
            log::debug!("rule '{}' failed on line {}", rule.name, statement.line);
            FenrirError::TransformFailure {
                line: statement.line,
                reason,
            }
        })?,
        None => Rewrite::Text(content.to_string()),
    };

    Ok(match rewrite {
        Rewrite::Text(text) => Transformed::Raw(format!("{indent}{}", substitute_log_alias(&text))),
        Rewrite::Import(record) => {
            let text = format!("{indent}{}", record.to_host(ctx.source_dir));
            Transformed::Import { record, text }
        }
    })
}

/// Transform all statements in order, stopping at the first failure.
pub fn transform_all(statements: &[Statement], ctx: &TransformContext) -> Result<Vec<Transformed>> {
    statements
        .iter()
        .map(|statement| transform_statement(statement, ctx))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::split_into_statements;
    use std::collections::HashMap;

    fn transform_src(src: &str, config: &ProjectConfig) -> Result<Vec<Transformed>> {
        let ctx = TransformContext {
            source_dir: Path::new("/project/src"),
            config,
        };
        transform_all(&split_into_statements(src), &ctx)
    }

    fn texts(src: &str) -> Vec<String> {
        transform_src(src, &ProjectConfig::default())
            .unwrap()
            .iter()
            .map(|t| t.text().to_string())
            .collect()
    }

    #[test]
    fn test_import_classification() {
        for local in ["./a.ts", "../x/b.js", "/abs/c.mjs", "data.json", "lib/util.fnr"] {
            assert!(!is_external_module(local), "{local} should be local");
        }
        for external in ["lodash", "left-pad", "@scope/pkg", "node:fs", "lodash/fp"] {
            assert!(is_external_module(external), "{external} should be external");
        }
    }

    #[test]
    fn test_fn_keyword_keeps_remainder_and_indent() {
        assert_eq!(texts("  fn add(a, b) {"), vec!["  function add(a, b) {"]);
        assert_eq!(texts("fnord()"), vec!["fnord()"]);
    }

    #[test]
    fn test_log_alias_inside_multi_line_statement() {
        let out = texts("call(a,\n  log(\"x\"))\nconsole.log(1)\nlogger(2)");
        assert_eq!(out[0], "call(a,\n  console.log(\"x\"))");
        assert_eq!(out[1], "console.log(1)");
        assert_eq!(out[2], "logger(2)");
        assert_eq!(texts("log(log(1))"), vec!["console.log(console.log(1))"]);
    }

    #[test]
    fn test_external_declare() {
        let out = transform_src("declare _ from \"lodash\"", &ProjectConfig::default()).unwrap();
        let record = out[0].import_record().unwrap();
        assert!(record.is_external);
        assert_eq!(record.kind, BindingKind::Default);
        assert_eq!(out[0].text(), "import _ from \"lodash\";");
    }

    #[test]
    fn test_local_declare_resolves_against_source_dir() {
        let out = texts("declare { x, y as z } from '../lib/./util.fnr'");
        assert_eq!(out[0], "import { x, y as z } from \"file:///project/lib/util.fnr\";");
    }

    #[test]
    fn test_namespace_declare() {
        let out = texts("declare * as path from \"node:path\"");
        assert_eq!(out[0], "import * as path from \"node:path\";");
    }

    #[test]
    fn test_alias_applied_before_classification() {
        let config = ProjectConfig {
            imports: HashMap::from([("utils".to_string(), "./lib/utils.mjs".to_string())]),
            ..ProjectConfig::default()
        };
        let out = transform_src("declare { helper } from \"utils\"", &config).unwrap();
        let record = out[0].import_record().unwrap();
        assert!(!record.is_external);
        assert_eq!(record.module_path, "./lib/utils.mjs");
    }

    #[test]
    fn test_forbidden_import_reports_line() {
        let err = transform_src("log(1)\n\nimport fs from \"fs\"", &ProjectConfig::default())
            .unwrap_err();
        assert!(matches!(err, FenrirError::ForbiddenConstruct { line: 3 }));

        let err = transform_src("call(\n  1,\n  import(\"x\"))", &ProjectConfig::default())
            .unwrap_err();
        assert!(matches!(err, FenrirError::ForbiddenConstruct { line: 3 }));
    }

    #[test]
    fn test_declare_paths_may_contain_import() {
        let out = transform_src(
            "declare importFresh from \"import-fresh\"\ndeclare { x } from \"./import.mjs\"",
            &ProjectConfig::default(),
        )
        .unwrap();
        let fresh = out[0].import_record().unwrap();
        assert!(fresh.is_external);
        assert_eq!(fresh.binding_names, vec!["importFresh"]);
        assert_eq!(out[0].text(), "import importFresh from \"import-fresh\";");
        assert_eq!(out[1].text(), "import { x } from \"file:///project/src/import.mjs\";");

        let err = transform_src("\ndeclare { import } from \"x\"", &ProjectConfig::default())
            .unwrap_err();
        assert!(matches!(err, FenrirError::ForbiddenConstruct { line: 2 }));
    }

    #[test]
    fn test_malformed_declare_is_transform_failure() {
        let err = transform_src("\ndeclare lodash", &ProjectConfig::default()).unwrap_err();
        assert!(matches!(err, FenrirError::TransformFailure { line: 2, .. }));

        let err = transform_src("declare {} from \"x\"", &ProjectConfig::default()).unwrap_err();
        assert!(matches!(err, FenrirError::TransformFailure { line: 1, .. }));
    }

    #[test]
    fn test_blank_lines_pass_through_verbatim() {
        assert_eq!(texts("a = 1\n   \nb = 2"), vec!["a = 1", "   ", "b = 2"]);
    }
}
