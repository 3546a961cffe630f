//! Import classification
//!
//! Each imported name is looked up in the model and classified against the
//! final file order: provided by the runtime, already defined by an earlier
//! file or a parent compiler ("past"), or defined by a file that runs later
//! ("future") and therefore only reachable through a deferred accessor.

use rustc_hash::FxHashSet;

use crate::model::{DeclarationKind, Model};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Runtime,
    Past,
    Future,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImport {
    pub name: String,
    pub kind: ImportKind,
    /// Defining file, when the declaration has one
    pub path: Option<String>,
}

/// Resolved imports of one file. Names the model does not know are left
/// out; the generator reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportTable {
    entries: Vec<ResolvedImport>,
}

impl ImportTable {
    pub fn get(&self, name: &str) -> Option<&ResolvedImport> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn kind_of(&self, name: &str) -> Option<ImportKind> {
        self.get(name).map(|entry| entry.kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedImport> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct ImportResolver<'a> {
    model: &'a Model,
}

impl<'a> ImportResolver<'a> {
    pub fn new(model: &'a Model) -> Self {
        Self { model }
    }

    /// Classifies the imports of every file. `files` is `(path, imports)`
    /// in final order; the result is parallel to it.
    pub fn classify(&self, files: &[(&str, &[String])]) -> Vec<ImportTable> {
        let batch: FxHashSet<&str> = files.iter().map(|(path, _)| *path).collect();
        let mut past: FxHashSet<&str> = FxHashSet::default();
        let mut tables = Vec::with_capacity(files.len());

        for (path, imports) in files {
            let mut table = ImportTable::default();

            for name in imports.iter() {
                let Some(declaration) = self.model.get(name) else {
                    continue;
                };

                let declared_in = declaration.location.path.as_deref();
                let kind = match (&declaration.kind, declared_in) {
                    (DeclarationKind::Runtime, _) => ImportKind::Runtime,
                    (_, Some(declared_in)) if batch.contains(declared_in) && !past.contains(declared_in) => {
                        ImportKind::Future
                    }
                    _ => ImportKind::Past,
                };

                table.entries.push(ResolvedImport {
                    name: name.clone(),
                    kind,
                    path: declared_in.map(str::to_string),
                });
            }

            tables.push(table);
            past.insert(*path);
        }

        tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Declaration, Location};
    use std::sync::Arc;

    fn model_with(declarations: &[(&str, &str)]) -> Model {
        let mut model = Model::new(1, Vec::new()).unwrap();
        for (name, path) in declarations {
            model
                .add(Declaration {
                    name: name.to_string(),
                    kind: DeclarationKind::Class { superclass: None },
                    location: Location {
                        path: Some(path.to_string()),
                        line: 1,
                        column: 0,
                    },
                    origin: 1,
                })
                .unwrap();
        }
        model
    }

    #[test]
    fn test_past_and_future() {
        let model = model_with(&[("A", "a.nx")]);
        let resolver = ImportResolver::new(&model);
        let none: Vec<String> = Vec::new();
        let b_imports = vec!["A".to_string()];

        let tables = resolver.classify(&[("a.nx", none.as_slice()), ("b.nx", b_imports.as_slice())]);
        assert_eq!(tables[1].kind_of("A"), Some(ImportKind::Past));

        let tables = resolver.classify(&[("b.nx", b_imports.as_slice()), ("a.nx", none.as_slice())]);
        assert_eq!(tables[0].kind_of("A"), Some(ImportKind::Future));
    }

    #[test]
    fn test_runtime_parent_and_unknown() {
        let parent = Arc::new(model_with(&[("P", "p.nx")]));
        let model = Model::new(2, vec![parent]).unwrap();
        let resolver = ImportResolver::new(&model);
        let imports = vec!["Nyx".to_string(), "P".to_string(), "Missing".to_string()];

        let tables = resolver.classify(&[("c.nx", imports.as_slice())]);
        assert_eq!(tables[0].kind_of("Nyx"), Some(ImportKind::Runtime));
        assert_eq!(tables[0].kind_of("P"), Some(ImportKind::Past));
        assert_eq!(tables[0].kind_of("Missing"), None);
        assert_eq!(tables[0].len(), 2);
    }

    #[test]
    fn test_self_import_is_future() {
        let model = model_with(&[("A", "a.nx")]);
        let resolver = ImportResolver::new(&model);
        let imports = vec!["A".to_string()];

        let tables = resolver.classify(&[("a.nx", imports.as_slice())]);
        assert_eq!(tables[0].kind_of("A"), Some(ImportKind::Future));
    }
}
