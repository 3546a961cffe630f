//! Helper methods and utilities

use super::*;

impl Parser {
    pub(crate) fn current_token(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    pub(crate) fn previous_token(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1).min(self.tokens.len() - 1)]
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous_token()
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.current_token().kind == kind
    }

    pub(crate) fn check_value(&self, value: &str) -> bool {
        self.current_token().kind == TokenKind::Identifier && self.current_token().value == value
    }

    pub(crate) fn peek_token(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.current + offset)
    }

    pub(crate) fn peek_kind(&self, offset: usize) -> Option<TokenKind> {
        self.peek_token(offset).map(|token| token.kind)
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len() || self.current_token().kind == TokenKind::Eof
    }

    pub(crate) fn consume(&mut self, kind: TokenKind, what: &str) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance().clone())
        } else {
            Err(self.unexpected(what))
        }
    }

    pub(crate) fn consume_semicolon(&mut self) {
        if self.check(TokenKind::Semicolon) {
            self.advance();
        }
    }

    pub(crate) fn parse_identifier(&mut self) -> ParseResult<Node<Ident>> {
        let token = self.current_token();
        if !token.kind.is_identifier_like() {
            return Err(self.unexpected("identifier"));
        }
        let node = Node::new(Ident::new(token.value.clone()), token.span);
        self.advance();
        Ok(node)
    }

    pub(crate) fn error(&self, message: String) -> ParseError {
        let token = self.current_token();
        if token.kind == TokenKind::Error {
            return ParseError::new(token.value.clone(), token.span);
        }
        ParseError::new(message, token.span)
    }

    pub(crate) fn unexpected(&self, expected: &str) -> ParseError {
        let token = self.current_token();
        if token.kind == TokenKind::Eof {
            self.error(format!("Unexpected end of input, expected {}", expected))
        } else {
            self.error(format!("Unexpected token '{}', expected {}", self.token_text(token), expected))
        }
    }

    fn token_text(&self, token: &Token) -> String {
        match token.kind {
            TokenKind::StringLiteral => format!("\"{}\"", token.value),
            TokenKind::TemplateLiteral => format!("`{}`", token.value),
            _ => token.value.clone(),
        }
    }

    // =========================================================================
    // Skipping
    // =========================================================================

    /// Skips a balanced `(...)`, `[...]` or `{...}` group starting at the
    /// current token. Returns the span of the whole group.
    pub(crate) fn skip_balanced(&mut self) -> ParseResult<Span> {
        let start = self.current_token().span;
        let mut depth = 0usize;

        loop {
            let token = self.current_token();
            match token.kind {
                TokenKind::Eof => return Err(self.unexpected("closing bracket")),
                TokenKind::Error => return Err(self.error(String::new())),
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        let end = self.advance().span;
                        return Ok(start.merge(&end));
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Skips a `<...>` type parameter list.
    pub(crate) fn skip_angle_brackets(&mut self) -> ParseResult<()> {
        let mut depth = 0isize;

        loop {
            match self.current_token().kind {
                TokenKind::Lt => depth += 1,
                TokenKind::Gt => depth -= 1,
                TokenKind::GtGt => depth -= 2,
                TokenKind::GtGtGt => depth -= 3,
                TokenKind::Eof | TokenKind::LBrace | TokenKind::Semicolon => {
                    return Err(self.unexpected("'>'"));
                }
                _ => {}
            }
            self.advance();
            if depth <= 0 {
                return Ok(());
            }
        }
    }

    /// Skips tokens until `stop` returns true for a token at bracket depth
    /// zero. The stopping token is not consumed.
    pub(crate) fn skip_until(&mut self, stop: impl Fn(&Parser) -> bool) -> ParseResult<()> {
        loop {
            let kind = self.current_token().kind;
            if kind == TokenKind::Eof || stop(self) {
                return Ok(());
            }
            match kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                    self.skip_balanced()?;
                }
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    return Err(self.unexpected("expression"));
                }
                TokenKind::Error => return Err(self.error(String::new())),
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// True when the current token begins a new statement on a new line,
    /// which ends the previous statement without a semicolon.
    pub(crate) fn at_implicit_statement_end(&self) -> bool {
        let token = self.current_token();
        token.newline_before
            && self.current > 0
            && self.previous_token().kind.ends_expression()
            && (token.kind.starts_statement() || token.kind.is_identifier_like())
    }

    pub(crate) fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous_token().kind == TokenKind::Semicolon {
                return;
            }

            if self.current_token().newline_before && self.current_token().kind.starts_statement() {
                return;
            }

            self.advance();
        }
    }
}
