//! Inheritance-aware file ordering for concatenated output

use rustc_hash::FxHashMap;

use crate::error::ConfigError;
use crate::frontend::FileDeclarations;

/// The parts of a file that matter for ordering.
#[derive(Debug, Clone)]
pub struct FileOutline<'a> {
    pub path: &'a str,
    pub exports: Vec<&'a str>,
    /// Imported names that a top-level class of this file extends
    pub inherited: Vec<&'a str>,
}

impl<'a> FileOutline<'a> {
    pub fn new(declarations: &'a FileDeclarations) -> Self {
        let inherited = declarations
            .declarations
            .iter()
            .filter_map(|declaration| declaration.kind.superclass())
            .filter(|superclass| declarations.imports.iter().any(|name| name == superclass))
            .collect();

        Self {
            path: &declarations.path,
            exports: declarations.export_names(),
            inherited,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    InProgress,
    Done,
}

/// Orders files so that a subclass's file follows its superclass's file,
/// keeping the original relative order wherever inheritance allows.
pub struct DependencyReorderer<'a> {
    files: &'a [FileOutline<'a>],
    /// Superclass name -> indices of files that extend it
    dependents: FxHashMap<&'a str, Vec<usize>>,
}

impl<'a> DependencyReorderer<'a> {
    pub fn new(files: &'a [FileOutline<'a>]) -> Self {
        let mut dependents: FxHashMap<&str, Vec<usize>> = FxHashMap::default();

        for (index, file) in files.iter().enumerate() {
            for superclass in &file.inherited {
                let list = dependents.entry(superclass).or_default();
                if !list.contains(&index) {
                    list.push(index);
                }
            }
        }

        Self { files, dependents }
    }

    /// Returns file indices in emission order. Mutual inheritance between
    /// files cannot be emitted in any order and is an error.
    pub fn order(&self) -> Result<Vec<usize>, ConfigError> {
        let mut state = vec![Visit::Unvisited; self.files.len()];
        let mut stack = Vec::new();
        let mut placed = Vec::with_capacity(self.files.len());

        for index in (0..self.files.len()).rev() {
            self.visit(index, &mut state, &mut stack, &mut placed)?;
        }

        // Files were placed last-first
        placed.reverse();
        Ok(placed)
    }

    fn visit(
        &self,
        index: usize,
        state: &mut [Visit],
        stack: &mut Vec<usize>,
        placed: &mut Vec<usize>,
    ) -> Result<(), ConfigError> {
        match state[index] {
            Visit::Done => return Ok(()),
            Visit::InProgress => return Err(self.cycle_error(index, stack)),
            Visit::Unvisited => {}
        }

        state[index] = Visit::InProgress;
        stack.push(index);

        for export in &self.files[index].exports {
            let Some(dependents) = self.dependents.get(export) else {
                continue;
            };
            for &dependent in dependents {
                if dependent != index {
                    self.visit(dependent, state, stack, placed)?;
                }
            }
        }

        stack.pop();
        state[index] = Visit::Done;
        placed.push(index);
        Ok(())
    }

    fn cycle_error(&self, index: usize, stack: &[usize]) -> ConfigError {
        let start = stack.iter().position(|&i| i == index).unwrap_or(0);
        let mut cycle: Vec<String> = stack[start..]
            .iter()
            .map(|&i| self.files[i].path.to_string())
            .collect();
        cycle.push(self.files[index].path.to_string());
        ConfigError::InheritanceCycle(cycle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outline<'a>(path: &'a str, exports: &[&'a str], inherited: &[&'a str]) -> FileOutline<'a> {
        FileOutline {
            path,
            exports: exports.to_vec(),
            inherited: inherited.to_vec(),
        }
    }

    fn order<'a>(files: &[FileOutline<'a>]) -> Vec<&'a str> {
        DependencyReorderer::new(files)
            .order()
            .unwrap()
            .into_iter()
            .map(|i| files[i].path)
            .collect()
    }

    #[test]
    fn test_superclass_first() {
        let files = [outline("b.nx", &["Sub"], &["Base"]), outline("a.nx", &["Base"], &[])];
        assert_eq!(order(&files), vec!["a.nx", "b.nx"]);
    }

    #[test]
    fn test_independent_files_keep_order() {
        let files = [
            outline("c.nx", &["C"], &[]),
            outline("a.nx", &["A"], &[]),
            outline("b.nx", &["B"], &[]),
        ];
        assert_eq!(order(&files), vec!["c.nx", "a.nx", "b.nx"]);
    }

    #[test]
    fn test_chain() {
        let files = [
            outline("c.nx", &["C"], &["B"]),
            outline("b.nx", &["B"], &["A"]),
            outline("x.nx", &["X"], &[]),
            outline("a.nx", &["A"], &[]),
        ];
        assert_eq!(order(&files), vec!["x.nx", "a.nx", "b.nx", "c.nx"]);
    }

    #[test]
    fn test_cycle_is_an_error() {
        let files = [outline("a.nx", &["A"], &["B"]), outline("b.nx", &["B"], &["A"])];
        let err = DependencyReorderer::new(&files).order().unwrap_err();
        assert!(matches!(err, ConfigError::InheritanceCycle(ref cycle) if cycle.len() == 3));
    }

    #[test]
    fn test_from_declarations() {
        let source = nyx_parser::parse("import { Base, Other };\nexport class Sub extends Base {}").unwrap();
        let declarations = crate::frontend::DeclarationBuilder::build(
            &crate::frontend::OutlineBuilder,
            "b.nx",
            &source,
        )
        .unwrap();
        let outline = FileOutline::new(&declarations);
        assert_eq!(outline.exports, vec!["Sub"]);
        assert_eq!(outline.inherited, vec!["Base"]);
    }
}
