//! # Nyx Parser
//!
//! Recursive descent outline parser for Nyx.
//! Module structure (imports, exports, classes, functions, variables) is
//! parsed precisely; statement and expression bodies are skipped as
//! balanced token runs and left to the generator, which patches the
//! original text token by token.

use std::sync::Arc;

use nyx_ast::*;
use nyx_lexer::{Lexer, Token, TokenKind};

// Module declarations
mod error;
mod parser;
mod decl;
mod helpers;

// Re-export public types
pub use error::{ParseError, ParseResult};
pub use parser::Parser;

/// A parsed source file: the outline AST together with the token stream
/// and text it was parsed from.
#[derive(Debug, Clone)]
pub struct ParsedSource {
    pub program: Program,
    pub tokens: Vec<Token>,
    pub text: Arc<str>,
    pub line_index: LineIndex,
}

impl ParsedSource {
    pub fn slice(&self, span: Span) -> &str {
        &self.text[span.start..span.end]
    }

    /// 1-based line of a byte offset.
    pub fn line_of(&self, offset: usize) -> usize {
        self.line_index.line(offset)
    }
}

/// Parses `text` into a [`ParsedSource`], reporting the first error with
/// its line and column.
pub fn parse(text: &str) -> Result<ParsedSource, ParseError> {
    let line_index = LineIndex::new(text);
    let tokens = Lexer::new(text).tokenize();
    let mut parser = Parser::new(tokens);

    match parser.parse_program() {
        Ok(program) => Ok(ParsedSource {
            program,
            tokens: parser.into_tokens(),
            text: Arc::from(text),
            line_index,
        }),
        Err(mut errors) => Err(errors.swap_remove(0).locate(&line_index)),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn class_of(item: &Node<ModuleItem>) -> &ClassDecl {
        let decl = match &item.value {
            ModuleItem::Export(export) => &export.decl.value,
            ModuleItem::Decl(decl) => &decl.value,
            other => panic!("expected a declaration, found {:?}", other),
        };
        match decl {
            Decl::Class(class) => class,
            other => panic!("expected a class, found {:?}", other),
        }
    }

    #[test]
    fn test_parse_import_and_exported_class() {
        let source = r#"import { Base };
export class Sub extends Base {
    constructor() { super(); }
    static create() { return new Sub(); }
    get name() { return "sub"; }
    count = 0;
    #secret = 1
    run() {}
}
"#;
        let parsed = parse(source).unwrap();
        let items = &parsed.program.items;
        assert_eq!(items.len(), 2);

        match &items[0].value {
            ModuleItem::Import(import) => {
                let names: Vec<&str> = import.specifiers.iter().map(|s| s.value.name.as_str()).collect();
                assert_eq!(names, vec!["Base"]);
            }
            other => panic!("expected import, found {:?}", other),
        }

        let class = class_of(&items[1]);
        assert_eq!(class.name.value.name, "Sub");
        assert_eq!(class.extends.as_ref().map(|e| e.value.name.as_str()), Some("Base"));

        let members: Vec<(&str, MemberKind, bool)> = class
            .members
            .iter()
            .map(|m| (m.name.value.name.as_str(), m.kind, m.is_static))
            .collect();
        assert_eq!(
            members,
            vec![
                ("constructor", MemberKind::Constructor, false),
                ("create", MemberKind::Method, true),
                ("name", MemberKind::Getter, false),
                ("count", MemberKind::Field, false),
                ("#secret", MemberKind::Field, false),
                ("run", MemberKind::Method, false),
            ]
        );

        assert_eq!(parsed.line_of(class.members[5].span.start), 8);
    }

    #[test]
    fn test_parse_statements_without_semicolons() {
        let source = r#"
let a = 1, b = function() { return 2 }
const { c, d } = obj
foo(a)
function bar() {}
if (a) { bar() } else { foo() }
class Baz {}
"#;
        let parsed = parse(source).unwrap();
        let items = &parsed.program.items;
        assert_eq!(items.len(), 6);

        match &items[0].value {
            ModuleItem::Decl(decl) => match &decl.value {
                Decl::Var(var) => {
                    let names: Vec<&str> = var.names.iter().map(|n| n.value.name.as_str()).collect();
                    assert_eq!(names, vec!["a", "b"]);
                    assert_eq!(var.kind, VarDeclKind::Let);
                }
                other => panic!("expected var, found {:?}", other),
            },
            other => panic!("expected declaration, found {:?}", other),
        }

        assert!(matches!(&items[1].value, ModuleItem::Decl(d) if d.value.bound_names().is_empty()));
        assert!(matches!(items[2].value, ModuleItem::Stmt));
        assert!(matches!(&items[3].value, ModuleItem::Decl(d) if matches!(d.value, Decl::Function(_))));
        assert!(matches!(items[4].value, ModuleItem::Stmt));
        assert_eq!(class_of(&items[5]).name.value.name, "Baz");
    }

    #[test]
    fn test_parse_program_helpers() {
        let source = "import { A, B };\nexport function f() {}\nexport let x = 1, y = 2;\nclass Local {}";
        let parsed = parse(source).unwrap();
        let program = &parsed.program;

        let imports: Vec<&str> = program.imports().map(|i| i.value.name.as_str()).collect();
        assert_eq!(imports, vec!["A", "B"]);

        let exported: Vec<&str> = program
            .exports()
            .flat_map(|d| d.value.bound_names())
            .map(|n| n.value.name.as_str())
            .collect();
        assert_eq!(exported, vec!["f", "x", "y"]);
        assert_eq!(program.declarations().count(), 3);
    }

    #[test]
    fn test_complex_heritage_is_not_recorded() {
        let parsed = parse("class A extends mixin(B) {}").unwrap();
        let class = class_of(&parsed.program.items[0]);
        assert!(class.extends.is_none());
    }

    #[test]
    fn test_braces_inside_literals() {
        let source = "const s = `${ { a: 1 }.a }`; const r = /}/;";
        let parsed = parse(source).unwrap();
        assert_eq!(parsed.program.items.len(), 2);
    }

    #[test]
    fn test_parse_error_position() {
        let err = parse("import { A B };").unwrap_err();
        assert_eq!(err.message, "Unexpected token 'B', expected ',' or '}'");
        assert_eq!((err.line, err.column), (1, 11));
    }

    #[test]
    fn test_lexer_error_is_reported() {
        let err = parse("let ok = 1;\nlet s = \"abc").unwrap_err();
        assert_eq!(err.message, "Unterminated string literal");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_export_requires_declaration() {
        let err = parse("export default 1;").unwrap_err();
        assert_eq!(
            err.message,
            "Unexpected token 'default', expected declaration after 'export'"
        );
    }

    #[test]
    fn test_unbalanced_brace() {
        let err = parse("foo();\n}").unwrap_err();
        assert_eq!(err.line, 2);
    }
}
