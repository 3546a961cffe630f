//! Compile-time errors and warnings as reported to callers.

use std::fmt;

use serde::Serialize;

/// A warning or error found at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// 1-based line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// 0-based column
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
    /// Reported by the type checker rather than the compiler
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub typechecker: bool,
}

impl Issue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            file: None,
            line: None,
            column: None,
            cause: None,
            code: None,
            typechecker: false,
        }
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Attributes the issue to `file` unless it already names one.
    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        if self.file.is_none() {
            self.file = Some(file.into());
        }
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{}:", file)?;
            if let Some(line) = self.line {
                write!(f, "{}:", line)?;
                if let Some(column) = self.column {
                    write!(f, "{}:", column)?;
                }
            }
            write!(f, " ")?;
        }
        write!(f, "{}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let issue = Issue::new("Unknown import: \"A\"").at(3, 7).in_file("b.nx");
        assert_eq!(issue.to_string(), "b.nx:3:7: Unknown import: \"A\"");
        assert_eq!(Issue::new("oops").to_string(), "oops");
    }

    #[test]
    fn test_first_file_wins() {
        let issue = Issue::new("x").in_file("a.nx").in_file("b.nx");
        assert_eq!(issue.file.as_deref(), Some("a.nx"));
    }

    #[test]
    fn test_serialize_skips_empty_fields() {
        let json = serde_json::to_value(Issue::new("m").at_line(2)).unwrap();
        assert_eq!(json, serde_json::json!({ "message": "m", "line": 2 }));
    }
}
