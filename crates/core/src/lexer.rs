use std::sync::LazyLock;

use regex::Regex;

use crate::error::LineIssue;

/// Code of the header line that opens a new employee record.
pub const EMPLOYEE_MARKER: &str = "S21.G00.30";

static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]\d+\.G\d+\.\d+(?:\.\d+)?),'(.*)'$").expect("line pattern is valid")
});

/// One parsed `CODE,'VALUE'` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Full field code, e.g. `S21.G00.30.001`.
    pub code: String,
    /// Payload with the surrounding quotes stripped.
    pub value: String,
    /// First segment of the code (`S10`, `S20`, `S21`).
    pub block: String,
    /// First three segments of the code (`S21.G00.30`).
    pub group: String,
    /// Empty payload: the line opens a section instead of carrying data.
    pub is_header: bool,
    /// 1-based line number in the source text.
    pub line: u32,
}

impl Token {
    /// True for the header that starts a new employee record.
    pub fn is_employee_marker(&self) -> bool {
        self.is_header && self.code == EMPLOYEE_MARKER
    }
}

/// Result of tokenizing a whole file.
#[derive(Debug, Clone, Default)]
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub issues: Vec<LineIssue>,
    /// Non-blank lines seen, valid or not.
    pub total_lines: usize,
}

/// Tokenize a single line.
///
/// Blank lines yield `Ok(None)`. Lines that do not match the DSN line shape
/// yield a [`LineIssue`]; the caller decides whether to log and continue.
pub fn lex_line(raw: &str, line: u32) -> Result<Option<Token>, LineIssue> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let caps = LINE_RE
        .captures(trimmed)
        .ok_or_else(|| LineIssue::malformed(line, trimmed))?;
    let code = caps[1].to_owned();
    let value = caps[2].to_owned();

    let block = code.split('.').next().unwrap_or_default().to_owned();
    let group = code.splitn(4, '.').take(3).collect::<Vec<_>>().join(".");

    Ok(Some(Token {
        is_header: value.is_empty(),
        code,
        value,
        block,
        group,
        line,
    }))
}

/// Tokenize a whole file. Never fails: malformed lines are logged, recorded
/// in [`LexOutput::issues`] and skipped.
pub fn lex(src: &str) -> LexOutput {
    let mut out = LexOutput::default();

    for (idx, raw) in src.lines().enumerate() {
        let line = u32::try_from(idx + 1).unwrap_or(u32::MAX);
        if raw.trim().is_empty() {
            continue;
        }
        out.total_lines += 1;
        match lex_line(raw, line) {
            Ok(Some(token)) => out.tokens.push(token),
            Ok(None) => {}
            Err(issue) => {
                log::warn!("skipping {}", issue);
                out.issues.push(issue);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_line() {
        let t = lex_line("S21.G00.30.001,'123456789'", 3).unwrap().unwrap();
        assert_eq!(t.code, "S21.G00.30.001");
        assert_eq!(t.value, "123456789");
        assert_eq!(t.block, "S21");
        assert_eq!(t.group, "S21.G00.30");
        assert!(!t.is_header);
        assert_eq!(t.line, 3);
    }

    #[test]
    fn header_line() {
        let t = lex_line("S21.G00.30,''", 1).unwrap().unwrap();
        assert!(t.is_header);
        assert!(t.is_employee_marker());
        assert_eq!(t.group, "S21.G00.30");
        assert_eq!(t.value, "");
    }

    #[test]
    fn empty_data_value_is_header_but_not_marker() {
        let t = lex_line("S21.G00.30.003,''", 1).unwrap().unwrap();
        assert!(t.is_header);
        assert!(!t.is_employee_marker());
    }

    #[test]
    fn value_may_contain_quotes_and_commas() {
        let t = lex_line("S10.G00.01.003,'L'ATELIER, SARL'", 1)
            .unwrap()
            .unwrap();
        assert_eq!(t.value, "L'ATELIER, SARL");
    }

    #[test]
    fn crlf_and_surrounding_whitespace_are_tolerated() {
        let t = lex_line("  S20.G00.05.005,'20250101'\r", 9)
            .unwrap()
            .unwrap();
        assert_eq!(t.code, "S20.G00.05.005");
        assert_eq!(t.value, "20250101");
    }

    #[test]
    fn blank_line_is_none() {
        assert_eq!(lex_line("   ", 1).unwrap(), None);
    }

    #[test]
    fn malformed_lines_are_issues() {
        for bad in [
            "S21.G00.30.001,123",
            "s21.G00.30.001,'x'",
            "S21.X00.30.001,'x'",
            "S21.G00,'x'",
            "S21.G00.30.001.002.003,'x'",
            "hello world",
        ] {
            let err = lex_line(bad, 4).unwrap_err();
            assert_eq!(err.line, 4, "{}", bad);
        }
    }

    #[test]
    fn lex_skips_bad_lines_and_counts() {
        let src = "S10.G00.00.001,'PAYE'\n\nnot a line\nS21.G00.30,''\n";
        let out = lex(src);
        assert_eq!(out.tokens.len(), 2);
        assert_eq!(out.issues.len(), 1);
        assert_eq!(out.issues[0].line, 3);
        assert_eq!(out.total_lines, 3);
        assert_eq!(out.tokens[1].line, 4);
    }
}
