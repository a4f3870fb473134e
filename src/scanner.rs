//! Splitting surface source into logical statements.
//!
//! A statement is normally one line. When a line opens more parentheses than
//! it closes, following lines are folded into the same statement until the
//! counts balance, so multi-line calls and parameter lists are transformed as
//! one unit.

/// One logical statement: a run of consecutive source lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Original text of the covered lines, joined with `\n`.
    pub text: String,
    /// 1-based line number of the first covered line.
    pub line: usize,
    /// Number of source lines covered.
    pub line_count: usize,
    /// Input ended while parentheses were still open.
    pub unterminated: bool,
}

impl Statement {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn is_multi_line(&self) -> bool {
        self.line_count > 1
    }
}

struct StatementScanner<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> StatementScanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.split('\n').collect(),
            pos: 0,
        }
    }

    fn read_line(&mut self) -> Option<&'a str> {
        let line = self.lines.get(self.pos).copied();
        if line.is_some() {
            self.pos += 1;
        }
        line
    }

    fn make_statements(&mut self) -> Vec<Statement> {
        let mut out = Vec::new();
        while let Some(first) = self.read_line() {
            let line = self.pos;
            let mut text = first.to_string();
            let mut depth = paren_balance(first);
            let mut line_count = 1;

            while depth > 0 {
                match self.read_line() {
                    Some(next) => {
                        text.push('\n');
                        text.push_str(next);
                        depth += paren_balance(next);
                        line_count += 1;
                    }
                    None => break,
                }
            }

            out.push(Statement {
                text,
                line,
                line_count,
                unterminated: depth > 0,
            });
        }
        out
    }
}

/// Opening minus closing parentheses on one line.
fn paren_balance(line: &str) -> isize {
    line.chars().fold(0, |acc, c| match c {
        '(' => acc + 1,
        ')' => acc - 1,
        _ => acc,
    })
}

/// Split `text` into statements.
///
/// Joining the returned statements' `text` with `\n` reproduces `text`
/// exactly. Blank lines become blank statements.
pub fn split_into_statements(text: &str) -> Vec<Statement> {
    StatementScanner::new(text).make_statements()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejoin(statements: &[Statement]) -> String {
        statements
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_single_lines_and_blanks() {
        let src = "let a = 1\n\nlog(a)\n";
        let stmts = split_into_statements(src);
        let texts: Vec<_> = stmts.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["let a = 1", "", "log(a)", ""]);
        assert_eq!(stmts[2].line, 3);
        assert!(stmts[1].is_blank());
    }

    #[test]
    fn test_multi_line_call_is_merged() {
        let src = "log(\n  \"a\",\n  \"b\"\n)\nlet x = 2";
        let stmts = split_into_statements(src);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].text, "log(\n  \"a\",\n  \"b\"\n)");
        assert_eq!(stmts[0].line_count, 4);
        assert!(stmts[0].is_multi_line());
        assert_eq!(stmts[1].line, 5);
    }

    #[test]
    fn test_nested_parens_on_later_lines() {
        let src = "foo(bar(\n1), baz(\n2))\nnext()";
        let stmts = split_into_statements(src);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].line_count, 3);
        assert!(!stmts[0].unterminated);
    }

    #[test]
    fn test_more_closers_do_not_merge() {
        let stmts = split_into_statements("})\nlog(1)");
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn test_unbalanced_at_end_is_kept() {
        let src = "log(\"a\",\n  \"b\"";
        let stmts = split_into_statements(src);
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].unterminated);
        assert_eq!(stmts[0].text, src);
    }

    #[test]
    fn test_round_trip() {
        let sources = [
            "fn main() {\n  log(\"hi\")\n}\n",
            "\n\n",
            "a(\n\n)\r\nb\r\n",
            "fn add(\n  a,\n  b\n) {\n  return a + b\n}",
            "log((1 + 2) * (3\n+ 4))\n\n\nlet y = 0",
        ];
        for src in sources {
            assert_eq!(rejoin(&split_into_statements(src)), src);
        }
    }
}
