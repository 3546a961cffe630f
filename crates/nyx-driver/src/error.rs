//! Error taxonomy for the compilation pipeline.
//!
//! Only [`CompileError`] rejects a whole `compile()` call. Everything that
//! can go wrong with a single file is a [`FileError`], captured on the
//! file's unit and reported as an [`Issue`].

use nyx_parser::ParseError;
use thiserror::Error;

use crate::issue::Issue;

/// Fatal errors: raised before any usable result exists.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// Invalid options, parent incompatibility, squeezer exhaustion
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Conflicts between this compiler and the compilers it uses
    #[error(transparent)]
    Composition(#[from] CompositionError),
}

/// Result type for whole-call operations.
pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Unknown compiler option '{0}'.")]
    UnknownOption(String),

    #[error("Compiler option '{0}' is private.")]
    PrivateOption(String),

    /// A value failed its option's validator; carries the full message.
    #[error("{0}")]
    Invalid(String),

    #[error("Compiler option '{0}' differs from parent's options.")]
    ParentMismatch(String),

    #[error("Duplicate path '{path}' in compiler option '{option}'.")]
    DuplicateFile { option: String, path: String },

    #[error("Squeezer reached max index of {0}")]
    SqueezeRangeExceeded(u64),

    #[error("Inheritance cycle between files: {}", .0.join(" -> "))]
    InheritanceCycle(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositionError {
    #[error("A compiler cannot use itself, directly or through its parents")]
    Cycle,

    #[error("Duplicate export '{name}' in '{first}' and '{second}'")]
    DuplicateExport {
        name: String,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Squeeze(#[from] SqueezeError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SqueezeError {
    #[error("Squeezer conflict for '{name}': '{existing}' vs '{incoming}'")]
    NameConflict {
        name: String,
        existing: String,
        incoming: String,
    },

    #[error("Squeezer conflict for token '{token}': '{existing}' vs '{incoming}'")]
    TokenConflict {
        token: String,
        existing: String,
        incoming: String,
    },

    #[error("Squeezer reached max index of {max}")]
    RangeExceeded { max: u64 },
}

/// Errors raised by `before-compile`/`after-compile` hooks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("Line count mismatch: {new} vs. {old}")]
    LineCountMismatch { new: usize, old: usize },

    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("The type checker pool must be configured before its first use")]
pub struct PoolStartedError;

/// A declaration could not be added to the model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BuildError {
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl BuildError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line: Some(line),
            column: Some(column),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    /// A construct the generator cannot emit, or a failing interceptor
    #[error("{message}")]
    Invalid {
        message: String,
        line: Option<usize>,
        column: Option<usize>,
        cause: Option<String>,
    },

    #[error(transparent)]
    Squeeze(#[from] SqueezeError),
}

impl GenerateError {
    pub fn at(message: impl Into<String>, line: usize, column: usize) -> Self {
        GenerateError::Invalid {
            message: message.into(),
            line: Some(line),
            column: Some(column),
            cause: None,
        }
    }
}

/// A per-file failure. Recoverable: the file retries from the failed stage
/// on the next call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FileError {
    #[error("Could not read '{path}': {message}")]
    Read { path: String, message: String },

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Generate(#[from] GenerateError),
}

impl FileError {
    pub fn to_issue(&self, path: &str) -> Issue {
        let issue = Issue::new(self.to_string());

        let issue = match self {
            FileError::Read { .. } | FileError::Hook(_) => issue,
            FileError::Parse(err) => issue.at(err.line, err.column),
            FileError::Build(BuildError { line, column, .. }) => located(issue, *line, *column),
            FileError::Generate(GenerateError::Invalid {
                line,
                column,
                cause,
                ..
            }) => {
                let issue = located(issue, *line, *column);
                match cause {
                    Some(cause) => issue.with_cause(cause.clone()),
                    None => issue,
                }
            }
            FileError::Generate(GenerateError::Squeeze(_)) => issue,
        };

        issue.in_file(path)
    }
}

fn located(mut issue: Issue, line: Option<usize>, column: Option<usize>) -> Issue {
    issue.line = line;
    issue.column = column;
    issue
}

#[cfg(test)]
mod tests {
    use super::*;
    use nyx_ast::Span;

    #[test]
    fn test_parse_error_issue() {
        let mut err = ParseError::new("Unexpected token 'B', expected ',' or '}'", Span::new(11, 12));
        err.line = 1;
        err.column = 11;

        let issue = FileError::Parse(err).to_issue("a.nx");
        assert_eq!(issue.file.as_deref(), Some("a.nx"));
        assert_eq!(issue.line, Some(1));
        assert_eq!(issue.column, Some(11));
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            HookError::LineCountMismatch { new: 3, old: 2 }.to_string(),
            "Line count mismatch: 3 vs. 2"
        );
        assert_eq!(
            ConfigError::InheritanceCycle(vec!["a.nx".into(), "b.nx".into(), "a.nx".into()]).to_string(),
            "Inheritance cycle between files: a.nx -> b.nx -> a.nx"
        );
        assert_eq!(
            CompileError::from(ConfigError::UnknownOption("moo".into())).to_string(),
            "Unknown compiler option 'moo'."
        );
    }
}
