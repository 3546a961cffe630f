//! Pluggable front end: parser, declaration builder and code generator.
//!
//! The orchestrator only talks to these traits. The bundled
//! implementations (`OutlineParser`, `OutlineBuilder` and
//! [`ScriptGenerator`](crate::generator::ScriptGenerator)) are collected in
//! [`Toolchain::default`].

use std::sync::Arc;

use nyx_ast::{Decl, ModuleItem, Node};
use nyx_parser::{ParseError, ParsedSource};
use rustc_hash::FxHashSet;

use crate::error::{BuildError, GenerateError};
use crate::generator::ScriptGenerator;
use crate::issue::Issue;
use crate::model::{Declaration, DeclarationKind, Location, Model};
use crate::options::{CompilerOptions, OutputLanguage};
use crate::resolver::ImportTable;
use crate::squeezer::Squeezer;

pub trait SourceParser: Send + Sync {
    fn parse(&self, path: &str, text: &str) -> Result<Arc<ParsedSource>, ParseError>;
}

pub trait DeclarationBuilder: Send + Sync {
    fn build(&self, path: &str, source: &ParsedSource) -> Result<FileDeclarations, BuildError>;
}

pub trait CodeGenerator: Send + Sync {
    fn generate(&self, request: GenerateRequest<'_>) -> Result<Generated, GenerateError>;
}

/// Everything the generator may consult for one file.
#[derive(Clone, Copy)]
pub struct GenerateRequest<'a> {
    pub path: &'a str,
    pub source: &'a ParsedSource,
    pub imports: &'a ImportTable,
    pub model: &'a Model,
    pub squeezer: Option<&'a Squeezer>,
    pub options: &'a CompilerOptions,
    pub language: OutputLanguage,
}

/// Generated lines for one file, one per input line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generated {
    pub lines: Vec<String>,
    pub warnings: Vec<Issue>,
}

#[derive(Clone)]
pub struct Toolchain {
    pub parser: Arc<dyn SourceParser>,
    pub builder: Arc<dyn DeclarationBuilder>,
    pub generator: Arc<dyn CodeGenerator>,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            parser: Arc::new(OutlineParser),
            builder: Arc::new(OutlineBuilder),
            generator: Arc::new(ScriptGenerator),
        }
    }
}

// =============================================================================
// Declarations
// =============================================================================

/// A top-level declaration of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopLevel {
    pub name: String,
    pub kind: DeclarationKind,
    pub line: usize,
    pub column: usize,
    pub exported: bool,
}

/// What the builder extracted from one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDeclarations {
    pub path: String,
    /// Imported names in source order
    pub imports: Vec<String>,
    pub declarations: Vec<TopLevel>,
}

impl FileDeclarations {
    pub fn exports(&self) -> impl Iterator<Item = &TopLevel> {
        self.declarations.iter().filter(|declaration| declaration.exported)
    }

    pub fn export_names(&self) -> Vec<&str> {
        self.exports().map(|declaration| declaration.name.as_str()).collect()
    }

    /// Adds this file's exports to `model`.
    pub fn add_to_model(&self, model: &mut Model) -> Result<(), BuildError> {
        let origin = model.origin();
        for export in self.exports() {
            model.add(Declaration {
                name: export.name.clone(),
                kind: export.kind.clone(),
                location: Location {
                    path: Some(self.path.clone()),
                    line: export.line,
                    column: export.column,
                },
                origin,
            })?;
        }
        Ok(())
    }
}

// =============================================================================
// Reference implementations
// =============================================================================

/// Parses with the outline parser from `nyx-parser`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutlineParser;

impl SourceParser for OutlineParser {
    fn parse(&self, _path: &str, text: &str) -> Result<Arc<ParsedSource>, ParseError> {
        nyx_parser::parse(text).map(Arc::new)
    }
}

/// Collects imports and top-level declarations from the outline AST.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutlineBuilder;

impl DeclarationBuilder for OutlineBuilder {
    fn build(&self, path: &str, source: &ParsedSource) -> Result<FileDeclarations, BuildError> {
        let mut result = FileDeclarations {
            path: path.to_string(),
            imports: source.program.imports().map(|i| i.value.name.clone()).collect(),
            declarations: Vec::new(),
        };

        let mut exported_names = FxHashSet::default();

        for item in &source.program.items {
            let (decl, exported) = match &item.value {
                ModuleItem::Export(export) => (export.decl.as_ref(), true),
                ModuleItem::Decl(decl) => (decl, false),
                _ => continue,
            };

            for (name, kind) in declared_names(decl) {
                let (line, column) = source.line_index.line_col(name.span.start);

                if exported && !exported_names.insert(name.value.name.clone()) {
                    return Err(BuildError::new(
                        format!("Duplicate export '{}'", name.value.name),
                        line,
                        column,
                    ));
                }

                result.declarations.push(TopLevel {
                    name: name.value.name.clone(),
                    kind,
                    line,
                    column,
                    exported,
                });
            }
        }

        Ok(result)
    }
}

fn declared_names(decl: &Node<Decl>) -> Vec<(&Node<nyx_ast::Ident>, DeclarationKind)> {
    match &decl.value {
        Decl::Class(class) => vec![(
            &class.name,
            DeclarationKind::Class {
                superclass: class.extends.as_ref().map(|e| e.value.name.clone()),
            },
        )],
        Decl::Function(function) => vec![(&function.name, DeclarationKind::Function)],
        Decl::Var(var) => var
            .names
            .iter()
            .map(|name| (name, DeclarationKind::Variable))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(text: &str) -> Result<FileDeclarations, BuildError> {
        let source = OutlineParser.parse("a.nx", text).unwrap();
        OutlineBuilder.build("a.nx", &source)
    }

    #[test]
    fn test_build_collects_declarations() {
        let declarations = build("import { Base };\nexport class Sub extends Base {}\nfunction local() {}\nexport const a = 1, b = 2;").unwrap();

        assert_eq!(declarations.imports, vec!["Base".to_string()]);
        assert_eq!(declarations.export_names(), vec!["Sub", "a", "b"]);

        let sub = &declarations.declarations[0];
        assert_eq!(sub.kind.superclass(), Some("Base"));
        assert_eq!((sub.line, sub.column), (2, 13));
        assert!(!declarations.declarations[1].exported);
    }

    #[test]
    fn test_duplicate_export_in_file() {
        let err = build("export class A {}\nexport function A() {}").unwrap_err();
        assert_eq!(err.message, "Duplicate export 'A'");
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn test_add_to_model() {
        let declarations = build("export class A {}").unwrap();
        let mut model = Model::new(7, Vec::new()).unwrap();
        declarations.add_to_model(&mut model).unwrap();

        let a = model.get("A").unwrap();
        assert_eq!(a.location.path.as_deref(), Some("a.nx"));
        assert_eq!(a.origin, 7);

        assert!(declarations.add_to_model(&mut model).is_err());
    }
}
