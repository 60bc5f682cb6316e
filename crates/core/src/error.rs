use serde::{Deserialize, Serialize};

/// Why a single input line was skipped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// The line does not match `CODE,'VALUE'`.
    Malformed,
    /// Employee data arrived while no employee record was open.
    NoOpenEmployee,
}

/// A recoverable, per-line problem. The parse continues past it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineIssue {
    pub kind: IssueKind,
    pub line: u32,
    pub content: String,
    pub message: String,
}

impl LineIssue {
    pub fn new(kind: IssueKind, line: u32, content: &str, message: impl Into<String>) -> Self {
        LineIssue {
            kind,
            line,
            content: content.to_owned(),
            message: message.into(),
        }
    }

    pub fn malformed(line: u32, content: &str) -> Self {
        LineIssue::new(
            IssueKind::Malformed,
            line,
            content,
            "expected CODE,'VALUE' (e.g. S21.G00.30.001,'123')",
        )
    }

    pub fn no_open_employee(line: u32, content: &str, block: &str) -> Self {
        LineIssue::new(
            IssueKind::NoOpenEmployee,
            line,
            content,
            format!("{} data before any S21.G00.30 employee marker", block),
        )
    }
}

impl std::fmt::Display for LineIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {} ({:?})", self.line, self.message, self.content)
    }
}

/// Whole-input failure. No partial result is returned alongside it.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The byte buffer is not valid UTF-8 text.
    #[error("input '{filename}' is not valid UTF-8: {source}")]
    Decode {
        filename: String,
        #[source]
        source: std::str::Utf8Error,
    },

    /// The input contains NUL bytes and is almost certainly binary.
    #[error("input '{filename}' looks like binary data (NUL byte at offset {offset})")]
    Binary { filename: String, offset: usize },

    /// The input holds nothing but whitespace.
    #[error("input '{filename}' is empty")]
    Empty { filename: String },
}

impl ParseError {
    /// JSON shape used by the CLI when `--output json` is selected.
    pub fn to_json_value(&self) -> serde_json::Value {
        let kind = match self {
            ParseError::Decode { .. } => "decode",
            ParseError::Binary { .. } => "binary",
            ParseError::Empty { .. } => "empty",
        };
        serde_json::json!({
            "error": kind,
            "message": self.to_string(),
        })
    }
}
