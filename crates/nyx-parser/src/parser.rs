//! Core Parser struct and module-level parsing

use super::*;

/// Recursive descent outline parser for Nyx
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) current: usize,
}

impl Parser {
    /// Creates a new parser from a token stream
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let end = tokens.last().map(|t| t.span.end).unwrap_or(0);
            tokens.push(Token {
                kind: TokenKind::Eof,
                span: Span::new(end, end),
                value: String::new(),
                newline_before: false,
            });
        }
        Self { tokens, current: 0 }
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    /// Parses a complete program
    pub fn parse_program(&mut self) -> Result<Program, Vec<ParseError>> {
        let start_span = self.current_token().span;
        let mut items = Vec::new();
        let mut errors = Vec::new();

        while !self.is_at_end() {
            match self.parse_module_item() {
                Ok(item) => items.push(item),
                Err(err) => {
                    errors.push(err);
                    self.synchronize();
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let end_span = self.current_token().span;
        Ok(Program {
            items,
            span: start_span.merge(&end_span),
        })
    }

    // =========================================================================
    // Module Items
    // =========================================================================

    pub(crate) fn parse_module_item(&mut self) -> ParseResult<Node<ModuleItem>> {
        let start = self.current_token().span;

        let item = match self.current_token().kind {
            TokenKind::Import if self.peek_kind(1) == Some(TokenKind::LBrace) => {
                ModuleItem::Import(self.parse_import_decl()?)
            }
            TokenKind::Export => ModuleItem::Export(self.parse_export_decl()?),
            TokenKind::Semicolon => {
                self.advance();
                ModuleItem::Stmt
            }
            _ => match self.parse_declaration()? {
                Some(decl) => ModuleItem::Decl(decl),
                None => {
                    self.skip_statement()?;
                    ModuleItem::Stmt
                }
            },
        };

        let span = start.merge(&self.previous_token().span);
        Ok(Node::new(item, span))
    }

    // =========================================================================
    // Import/Export
    // =========================================================================

    /// `import { A, B };`
    pub(crate) fn parse_import_decl(&mut self) -> ParseResult<ImportDecl> {
        self.consume(TokenKind::Import, "'import'")?;
        self.consume(TokenKind::LBrace, "'{'")?;

        let mut specifiers = Vec::new();

        while !self.check(TokenKind::RBrace) {
            specifiers.push(self.parse_identifier()?);
            if !self.check(TokenKind::RBrace) {
                self.consume(TokenKind::Comma, "',' or '}'")?;
            }
        }

        self.consume(TokenKind::RBrace, "'}'")?;
        self.end_statement()?;

        Ok(ImportDecl { specifiers })
    }

    /// `export <declaration>`
    pub(crate) fn parse_export_decl(&mut self) -> ParseResult<ExportDecl> {
        let keyword = self.consume(TokenKind::Export, "'export'")?.span;

        match self.parse_declaration()? {
            Some(decl) => Ok(ExportDecl {
                keyword,
                decl: Box::new(decl),
            }),
            None => Err(self.unexpected("declaration after 'export'")),
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// Skips an opaque statement, ending at a semicolon, a closing block, or
    /// a line break before the next statement.
    pub(crate) fn skip_statement(&mut self) -> ParseResult<()> {
        let first = self.current;

        self.skip_until(|p| {
            p.current > first && (p.check(TokenKind::Semicolon) || p.at_implicit_statement_end())
        })?;

        self.consume_semicolon();
        Ok(())
    }

    /// Ends a statement: a semicolon, a line break, or the end of input.
    pub(crate) fn end_statement(&mut self) -> ParseResult<()> {
        if self.check(TokenKind::Semicolon) {
            self.advance();
            Ok(())
        } else if self.is_at_end()
            || self.current_token().newline_before
            || self.check(TokenKind::RBrace)
        {
            Ok(())
        } else {
            Err(self.unexpected("';'"))
        }
    }
}
