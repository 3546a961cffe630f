//! Line-preserving text patches over a source file.

use nyx_ast::Span;

#[derive(Debug, Clone)]
struct Edit {
    span: Span,
    text: String,
}

/// Collects replacements against the original text and applies them in one
/// pass. Removed line breaks are put back at the end of each replacement,
/// so every original line keeps its line number.
#[derive(Debug)]
pub struct Patcher<'a> {
    source: &'a str,
    edits: Vec<Edit>,
}

impl<'a> Patcher<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            edits: Vec::new(),
        }
    }

    pub fn replace(&mut self, span: Span, text: impl Into<String>) {
        self.edits.push(Edit {
            span,
            text: text.into(),
        });
    }

    pub fn remove(&mut self, span: Span) {
        self.replace(span, String::new());
    }

    pub fn insert(&mut self, offset: usize, text: impl Into<String>) {
        self.replace(Span::new(offset, offset), text);
    }

    /// Applies every edit. Of two overlapping edits, the one starting first
    /// wins; edits at the same offset keep their insertion order.
    pub fn finish(mut self) -> String {
        self.edits.sort_by_key(|edit| edit.span.start);

        let mut result = String::with_capacity(self.source.len());
        let mut cursor = 0;

        for edit in &self.edits {
            if edit.span.start < cursor || edit.span.end > self.source.len() {
                tracing::trace!(start = edit.span.start, end = edit.span.end, "dropping overlapping edit");
                continue;
            }

            result.push_str(&self.source[cursor..edit.span.start]);
            result.push_str(&edit.text);

            let removed = &self.source[edit.span.start..edit.span.end];
            let missing = removed.matches('\n').count().saturating_sub(edit.text.matches('\n').count());
            for _ in 0..missing {
                result.push('\n');
            }

            cursor = edit.span.end;
        }

        result.push_str(&self.source[cursor..]);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_and_insert() {
        let mut patcher = Patcher::new("export class A {}");
        patcher.remove(Span::new(0, 7));
        patcher.insert(17, " X = A;");
        assert_eq!(patcher.finish(), "class A {} X = A;");
    }

    #[test]
    fn test_preserves_line_count() {
        let source = "import {\n  A,\n  B\n};\nlet x;";
        let mut patcher = Patcher::new(source);
        patcher.replace(Span::new(0, 20), "const A = 1;");
        let result = patcher.finish();
        assert_eq!(result, "const A = 1;\n\n\n\nlet x;");
        assert_eq!(result.lines().count(), source.lines().count());
    }

    #[test]
    fn test_overlapping_edit_is_dropped() {
        let mut patcher = Patcher::new("abcdef");
        patcher.replace(Span::new(0, 4), "X");
        patcher.replace(Span::new(2, 3), "Y");
        assert_eq!(patcher.finish(), "Xef");
    }
}
