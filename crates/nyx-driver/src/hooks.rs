//! Caller-supplied callbacks: per-file compile hooks and template
//! interceptors.

use std::fmt;
use std::sync::Arc;

use crate::error::HookError;
use crate::issue::Issue;

/// The view of a file handed to `before-compile` and `after-compile` hooks.
#[derive(Debug, Clone)]
pub struct CallbackFile {
    path: String,
    lines: Vec<String>,
    warnings: Vec<Issue>,
}

impl CallbackFile {
    pub fn new(path: impl Into<String>, lines: Vec<String>, warnings: Vec<Issue>) -> Self {
        Self {
            path: path.into(),
            lines,
            warnings,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn contents(&self) -> String {
        self.lines.join("\n")
    }

    /// Replaces the file contents. The new contents may not have more lines
    /// than the old; fewer lines are padded with empty ones so that line
    /// numbers stay valid.
    pub fn set_contents(&mut self, contents: &str) -> Result<(), HookError> {
        let mut lines: Vec<String> = if contents.is_empty() {
            Vec::new()
        } else {
            contents.split('\n').map(str::to_string).collect()
        };

        if lines.len() > self.lines.len() {
            return Err(HookError::LineCountMismatch {
                new: lines.len(),
                old: self.lines.len(),
            });
        }

        lines.resize(self.lines.len(), String::new());
        self.lines = lines;
        Ok(())
    }

    pub fn add_warning(&mut self, line: usize, message: impl Into<String>) {
        let warning = Issue::new(message).at_line(line).in_file(self.path.clone());
        self.warnings.push(warning);
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Issue>) {
        (self.lines, self.warnings)
    }
}

type HookFn = dyn Fn(&mut CallbackFile) -> Result<(), HookError> + Send + Sync;

/// A per-file callback run before parsing or after generation.
#[derive(Clone)]
pub struct Hook(Arc<HookFn>);

impl Hook {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&mut CallbackFile) -> Result<(), HookError> + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    pub fn call(&self, file: &mut CallbackFile) -> Result<(), HookError> {
        (self.0)(file)
    }
}

impl PartialEq for Hook {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hook(..)")
    }
}

type InterceptorFn = dyn Fn(&[String]) -> Result<Vec<String>, String> + Send + Sync;

/// Rewrites the raw strings of a tagged template literal.
#[derive(Clone)]
pub struct Interceptor(Arc<InterceptorFn>);

impl Interceptor {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&[String]) -> Result<Vec<String>, String> + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    pub fn call(&self, strings: &[String]) -> Result<Vec<String>, String> {
        (self.0)(strings)
    }
}

impl PartialEq for Interceptor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Interceptor(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(lines: &[&str]) -> CallbackFile {
        CallbackFile::new("a.nx", lines.iter().map(|l| l.to_string()).collect(), Vec::new())
    }

    #[test]
    fn test_set_contents_pads_lines() {
        let mut file = file(&["a", "b", "c"]);
        file.set_contents("x\ny").unwrap();
        assert_eq!(file.contents(), "x\ny\n");
    }

    #[test]
    fn test_set_contents_rejects_extra_lines() {
        let mut file = file(&["a"]);
        let err = file.set_contents("x\ny").unwrap_err();
        assert_eq!(err.to_string(), "Line count mismatch: 2 vs. 1");
        assert_eq!(file.contents(), "a");
    }

    #[test]
    fn test_add_warning() {
        let mut file = file(&["a"]);
        file.add_warning(1, "careful");
        let (_, warnings) = file.into_parts();
        assert_eq!(warnings[0].file.as_deref(), Some("a.nx"));
        assert_eq!(warnings[0].line, Some(1));
    }

    #[test]
    fn test_hooks_compare_by_identity() {
        let hook = Hook::new(|_| Ok(()));
        let same = hook.clone();
        let other = Hook::new(|_| Ok(()));
        assert_eq!(hook, same);
        assert_ne!(hook, other);
    }
}
