//! Parse error types

use nyx_ast::{LineIndex, Span};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    /// 1-based line, filled in once the error is located in its source
    pub line: usize,
    /// 0-based column
    pub column: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            line: 0,
            column: 0,
        }
    }

    pub(crate) fn locate(mut self, line_index: &LineIndex) -> Self {
        let (line, column) = line_index.line_col(self.span.start);
        self.line = line;
        self.column = column;
        self
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
