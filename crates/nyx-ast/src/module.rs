//! Module system definitions for the AST

use super::*;

/// Module item (top-level in a module)
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleItem {
    /// `import { A, B };`
    Import(ImportDecl),

    /// `export <declaration>`
    Export(ExportDecl),

    /// Declaration
    Decl(Node<Decl>),

    /// Any other statement, kept opaque
    Stmt,
}

/// Import declaration. Imports name declarations, not files: the model
/// decides where each name comes from.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub specifiers: Vec<Node<Ident>>,
}

/// Export declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ExportDecl {
    /// Span of the `export` keyword
    pub keyword: Span,
    pub decl: Box<Node<Decl>>,
}

/// Root AST node - represents a complete source file
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub items: Vec<Node<ModuleItem>>,
    pub span: Span,
}

impl Program {
    /// Imported names in source order.
    pub fn imports(&self) -> impl Iterator<Item = &Node<Ident>> {
        self.items.iter().flat_map(|item| match &item.value {
            ModuleItem::Import(import) => import.specifiers.iter(),
            _ => [].iter(),
        })
    }

    /// Exported declarations in source order.
    pub fn exports(&self) -> impl Iterator<Item = &Node<Decl>> {
        self.items.iter().filter_map(|item| match &item.value {
            ModuleItem::Export(export) => Some(export.decl.as_ref()),
            _ => None,
        })
    }

    /// Every top-level declaration, exported or not.
    pub fn declarations(&self) -> impl Iterator<Item = &Node<Decl>> {
        self.items.iter().filter_map(|item| match &item.value {
            ModuleItem::Export(export) => Some(export.decl.as_ref()),
            ModuleItem::Decl(decl) => Some(decl),
            _ => None,
        })
    }
}
