//! The model: exported declarations visible to a compiler instance.
//!
//! A model holds the declarations exported by one instance's files and
//! looks through to the committed models of the instances it uses. Parent
//! models are shared read-only; children never write into them.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::Value;
use xxhash_rust::xxh64::Xxh64;

use crate::error::{BuildError, CompositionError};

/// Name under which the runtime is imported.
pub const RUNTIME_NAME: &str = "Nyx";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DeclarationKind {
    Class {
        #[serde(skip_serializing_if = "Option::is_none")]
        superclass: Option<String>,
    },
    Function,
    Variable,
    /// Built-in runtime hooks
    Runtime,
}

impl DeclarationKind {
    pub fn superclass(&self) -> Option<&str> {
        match self {
            DeclarationKind::Class { superclass } => superclass.as_deref(),
            _ => None,
        }
    }
}

/// Where a declaration is defined. Lines are 1-based, columns 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    pub name: String,
    #[serde(flatten)]
    pub kind: DeclarationKind,
    pub location: Location,
    /// Id of the compiler instance that declared it
    #[serde(skip)]
    pub origin: u64,
}

impl Declaration {
    fn runtime() -> Self {
        Self {
            name: RUNTIME_NAME.to_string(),
            kind: DeclarationKind::Runtime,
            location: Location {
                path: None,
                line: 0,
                column: 0,
            },
            origin: 0,
        }
    }

    fn describe(&self) -> String {
        match &self.location.path {
            Some(path) => path.clone(),
            None => format!("compiler #{}", self.origin),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Model {
    origin: u64,
    parents: Vec<Arc<Model>>,
    declarations: FxHashMap<String, Arc<Declaration>>,
}

impl Model {
    /// Creates an empty model for instance `origin` on top of `parents`.
    /// Fails when two parents export the same name from different
    /// instances; a name reached twice through a shared ancestor is fine.
    pub fn new(origin: u64, parents: Vec<Arc<Model>>) -> Result<Self, CompositionError> {
        let mut visible: FxHashMap<&str, &Arc<Declaration>> = FxHashMap::default();

        for parent in &parents {
            for declaration in parent.visible_declarations() {
                match visible.get(declaration.name.as_str()) {
                    Some(existing) if existing.origin != declaration.origin => {
                        return Err(CompositionError::DuplicateExport {
                            name: declaration.name.clone(),
                            first: existing.describe(),
                            second: declaration.describe(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        visible.insert(declaration.name.as_str(), declaration);
                    }
                }
            }
        }

        let mut declarations = FxHashMap::default();
        declarations.insert(RUNTIME_NAME.to_string(), Arc::new(Declaration::runtime()));

        Ok(Self {
            origin,
            parents,
            declarations,
        })
    }

    pub fn origin(&self) -> u64 {
        self.origin
    }

    /// Looks up `name` here, then in each parent.
    pub fn get(&self, name: &str) -> Option<&Declaration> {
        if let Some(declaration) = self.declarations.get(name) {
            return Some(declaration);
        }
        self.parents.iter().find_map(|parent| parent.get(name))
    }

    /// Adds an exported declaration from one of this instance's files.
    pub fn add(&mut self, declaration: Declaration) -> Result<(), BuildError> {
        if let Some(existing) = self.get(&declaration.name) {
            let message = match &existing.location.path {
                Some(path) => format!(
                    "Duplicate declaration of '{}', previously declared in '{}'",
                    declaration.name, path
                ),
                None => format!("'{}' is reserved", declaration.name),
            };
            return Err(BuildError::new(
                message,
                declaration.location.line,
                declaration.location.column,
            ));
        }

        self.declarations
            .insert(declaration.name.clone(), Arc::new(declaration));
        Ok(())
    }

    /// Declarations added by this instance, sorted by name.
    pub fn own_declarations(&self) -> Vec<&Declaration> {
        let mut own: Vec<&Declaration> = self
            .declarations
            .values()
            .map(Arc::as_ref)
            .filter(|declaration| declaration.kind != DeclarationKind::Runtime)
            .collect();
        own.sort_by(|a, b| a.name.cmp(&b.name));
        own
    }

    fn visible_declarations(&self) -> Vec<&Arc<Declaration>> {
        let mut result: Vec<&Arc<Declaration>> = self
            .declarations
            .values()
            .filter(|declaration| declaration.kind != DeclarationKind::Runtime)
            .collect();
        for parent in &self.parents {
            result.extend(parent.visible_declarations());
        }
        result
    }

    /// Hash of everything that can change another file's output: exported
    /// names, their kinds and defining files. Line numbers are left out so
    /// that edits inside a file do not regenerate every other file.
    pub fn signature(&self) -> u64 {
        let mut hasher = Xxh64::new(0);

        for declaration in self.own_declarations() {
            hasher.update(declaration.name.as_bytes());
            hasher.update(&[0]);
            match &declaration.kind {
                DeclarationKind::Class { superclass } => {
                    hasher.update(b"class");
                    hasher.update(superclass.as_deref().unwrap_or_default().as_bytes());
                }
                DeclarationKind::Function => hasher.update(b"function"),
                DeclarationKind::Variable => hasher.update(b"variable"),
                DeclarationKind::Runtime => hasher.update(b"runtime"),
            }
            hasher.update(&[0]);
            hasher.update(declaration.location.path.as_deref().unwrap_or_default().as_bytes());
            hasher.update(&[0]);
        }

        for parent in &self.parents {
            hasher.update(&parent.signature().to_le_bytes());
        }

        hasher.digest()
    }

    /// JSON dump of this instance's declarations.
    pub fn to_bridged(&self) -> Value {
        serde_json::to_value(self.own_declarations()).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str, path: &str, origin: u64) -> Declaration {
        Declaration {
            name: name.to_string(),
            kind: DeclarationKind::Class { superclass: None },
            location: Location {
                path: Some(path.to_string()),
                line: 1,
                column: 0,
            },
            origin,
        }
    }

    fn parent_with(origin: u64, names: &[&str]) -> Arc<Model> {
        let mut model = Model::new(origin, Vec::new()).unwrap();
        for name in names {
            model.add(class(name, &format!("p{}.nx", origin), origin)).unwrap();
        }
        Arc::new(model)
    }

    #[test]
    fn test_runtime_is_always_present() {
        let model = Model::new(1, Vec::new()).unwrap();
        assert_eq!(model.get("Nyx").map(|d| &d.kind), Some(&DeclarationKind::Runtime));
        assert!(model.own_declarations().is_empty());
    }

    #[test]
    fn test_parent_lookup() {
        let parent = parent_with(1, &["Base"]);
        let mut child = Model::new(2, vec![parent]).unwrap();
        child.add(class("Sub", "c.nx", 2)).unwrap();

        assert_eq!(child.get("Base").and_then(|d| d.location.path.as_deref()), Some("p1.nx"));
        assert!(child.get("Sub").is_some());
        assert!(child.get("Missing").is_none());
    }

    #[test]
    fn test_duplicate_between_parents() {
        let err = Model::new(3, vec![parent_with(1, &["X"]), parent_with(2, &["X"])]).unwrap_err();
        assert_eq!(
            err,
            CompositionError::DuplicateExport {
                name: "X".to_string(),
                first: "p1.nx".to_string(),
                second: "p2.nx".to_string(),
            }
        );
    }

    #[test]
    fn test_diamond_is_allowed() {
        let root = parent_with(1, &["Shared"]);
        let left = Arc::new(Model::new(2, vec![root.clone()]).unwrap());
        let right = Arc::new(Model::new(3, vec![root]).unwrap());
        assert!(Model::new(4, vec![left, right]).is_ok());
    }

    #[test]
    fn test_duplicate_with_parent_is_build_error() {
        let mut child = Model::new(2, vec![parent_with(1, &["X"])]).unwrap();
        let err = child.add(class("X", "c.nx", 2)).unwrap_err();
        assert_eq!(
            err.message,
            "Duplicate declaration of 'X', previously declared in 'p1.nx'"
        );

        let err = child.add(class("Nyx", "c.nx", 2)).unwrap_err();
        assert_eq!(err.message, "'Nyx' is reserved");
    }

    #[test]
    fn test_signature_ignores_lines() {
        let mut a = Model::new(1, Vec::new()).unwrap();
        a.add(class("A", "a.nx", 1)).unwrap();

        let mut moved = class("A", "a.nx", 1);
        moved.location.line = 20;
        let mut b = Model::new(1, Vec::new()).unwrap();
        b.add(moved).unwrap();
        assert_eq!(a.signature(), b.signature());

        let mut c = Model::new(1, Vec::new()).unwrap();
        c.add(class("A", "b.nx", 1)).unwrap();
        assert_ne!(a.signature(), c.signature());
    }

    #[test]
    fn test_bridged() {
        let mut model = Model::new(1, Vec::new()).unwrap();
        model.add(class("A", "a.nx", 1)).unwrap();
        assert_eq!(
            model.to_bridged(),
            serde_json::json!([{ "name": "A", "kind": "class", "location": { "path": "a.nx", "line": 1, "column": 0 } }])
        );
    }
}
