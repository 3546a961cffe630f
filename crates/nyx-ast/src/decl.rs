//! Declaration definitions for the AST

use super::*;

/// Top-level declaration
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    /// Function declaration
    Function(FunctionDecl),

    /// Class declaration
    Class(ClassDecl),

    /// Variable declaration
    Var(VarDecl),
}

impl Decl {
    /// Names bound by this declaration, in source order.
    pub fn bound_names(&self) -> Vec<&Node<Ident>> {
        match self {
            Decl::Function(func) => vec![&func.name],
            Decl::Class(class) => vec![&class.name],
            Decl::Var(var) => var.names.iter().collect(),
        }
    }
}

/// Function declaration
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: Node<Ident>,
    pub body: Span,
    pub is_async: bool,
    pub is_generator: bool,
}

/// Class declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: Node<Ident>,
    pub extends: Option<Node<Ident>>,
    pub members: Vec<ClassMember>,
    /// Span of the `{ ... }` body
    pub body: Span,
}

/// Class member
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMember {
    pub name: Node<Ident>,
    pub kind: MemberKind,
    pub is_static: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Constructor,
    Method,
    Getter,
    Setter,
    Field,
}

/// Variable declaration kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarDeclKind {
    Var,
    Let,
    Const,
}

/// Variable declaration. Only simple identifier bindings are recorded;
/// destructuring patterns bind nothing at module level.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub kind: VarDeclKind,
    pub names: Vec<Node<Ident>>,
}
