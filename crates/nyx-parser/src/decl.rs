//! Declaration parsing: classes, functions and variables

use super::*;

const MEMBER_MODIFIERS: &[&str] = &[
    "public", "private", "protected", "readonly", "abstract", "override", "accessor", "get", "set",
];

impl Parser {
    /// Parses a declaration if the current token starts one. Returns
    /// `Ok(None)` without consuming anything otherwise.
    pub(crate) fn parse_declaration(&mut self) -> ParseResult<Option<Node<Decl>>> {
        let next = self.peek_token(1).map(|t| (t.kind, t.newline_before));

        let decl = match self.current_token().kind {
            TokenKind::Class if next.is_some_and(|(kind, _)| kind.is_identifier_like()) => {
                self.parse_class_decl()?
            }
            TokenKind::Identifier
                if self.check_value("abstract") && next == Some((TokenKind::Class, false)) =>
            {
                self.parse_class_decl()?
            }
            TokenKind::Function if self.names_function(1) => self.parse_function_decl()?,
            TokenKind::Async
                if next == Some((TokenKind::Function, false)) && self.names_function(2) =>
            {
                self.parse_function_decl()?
            }
            TokenKind::Let | TokenKind::Const | TokenKind::Var => self.parse_var_decl()?,
            _ => return Ok(None),
        };

        Ok(Some(decl))
    }

    fn names_function(&self, offset: usize) -> bool {
        match self.peek_kind(offset) {
            Some(TokenKind::Star) => self
                .peek_kind(offset + 1)
                .is_some_and(|kind| kind.is_identifier_like()),
            Some(kind) => kind.is_identifier_like(),
            None => false,
        }
    }

    // =========================================================================
    // Classes
    // =========================================================================

    fn parse_class_decl(&mut self) -> ParseResult<Node<Decl>> {
        let start = self.current_token().span;

        if self.check_value("abstract") {
            self.advance();
        }
        self.consume(TokenKind::Class, "'class'")?;
        let name = self.parse_identifier()?;

        if self.check(TokenKind::Lt) {
            self.skip_angle_brackets()?;
        }

        let extends = if self.check(TokenKind::Extends) {
            self.advance();
            self.parse_heritage()?
        } else {
            None
        };

        if self.check_value("implements") {
            self.advance();
            self.skip_until(|p| p.check(TokenKind::LBrace))?;
        }

        let (members, body) = self.parse_class_body()?;

        Ok(Node::new(
            Decl::Class(ClassDecl {
                name,
                extends,
                members,
                body,
            }),
            start.merge(&body),
        ))
    }

    /// The superclass is only recorded when it is a plain name.
    fn parse_heritage(&mut self) -> ParseResult<Option<Node<Ident>>> {
        let is_simple = self.current_token().kind.is_identifier_like()
            && match self.peek_token(1) {
                Some(next) => {
                    matches!(next.kind, TokenKind::LBrace | TokenKind::Lt)
                        || (next.kind == TokenKind::Identifier && next.value == "implements")
                }
                None => false,
            };

        if is_simple {
            let superclass = self.parse_identifier()?;
            if self.check(TokenKind::Lt) {
                self.skip_angle_brackets()?;
            }
            return Ok(Some(superclass));
        }

        self.skip_until(|p| p.check(TokenKind::LBrace) || p.check_value("implements"))?;
        Ok(None)
    }

    fn parse_class_body(&mut self) -> ParseResult<(Vec<ClassMember>, Span)> {
        let open = self.consume(TokenKind::LBrace, "'{'")?.span;
        let mut members = Vec::new();

        while !self.check(TokenKind::RBrace) {
            if self.is_at_end() {
                return Err(self.unexpected("'}'"));
            }
            if self.check(TokenKind::Semicolon) {
                self.advance();
                continue;
            }
            if let Some(member) = self.parse_class_member()? {
                members.push(member);
            }
        }

        let close = self.advance().span;
        Ok((members, open.merge(&close)))
    }

    fn parse_class_member(&mut self) -> ParseResult<Option<ClassMember>> {
        let start = self.current_token().span;
        let mut is_static = false;
        let mut accessor = None;

        self.skip_decorators()?;

        // Static initialization block
        if self.check(TokenKind::Static) && self.peek_kind(1) == Some(TokenKind::LBrace) {
            self.advance();
            self.skip_balanced()?;
            return Ok(None);
        }

        loop {
            let token = self.current_token();
            let (kind, value) = (token.kind, token.value.clone());
            let is_modifier = match kind {
                TokenKind::Static | TokenKind::Async | TokenKind::Declare => true,
                TokenKind::Identifier => MEMBER_MODIFIERS.contains(&value.as_str()),
                _ => false,
            };
            if !is_modifier || !self.modifier_applies() {
                break;
            }
            match (kind, value.as_str()) {
                (TokenKind::Static, _) => is_static = true,
                (_, "get") => accessor = Some(MemberKind::Getter),
                (_, "set") => accessor = Some(MemberKind::Setter),
                _ => {}
            }
            self.advance();
        }

        if self.check(TokenKind::Star) {
            self.advance();
        }

        let token = self.current_token().clone();
        let name = match token.kind {
            kind if kind.is_word() || kind == TokenKind::PrivateName => {
                self.advance();
                Some(Node::new(Ident::new(token.value), token.span))
            }
            TokenKind::StringLiteral | TokenKind::NumberLiteral => {
                self.advance();
                None
            }
            TokenKind::LBracket => {
                self.skip_balanced()?;
                None
            }
            _ => return Err(self.unexpected("class member")),
        };

        if self.check(TokenKind::Question) || self.check(TokenKind::Bang) {
            self.advance();
        }

        let kind = if self.check(TokenKind::LParen) || self.check(TokenKind::Lt) {
            self.skip_method_rest()?;
            match accessor {
                Some(kind) => kind,
                None if !is_static && name.as_ref().is_some_and(|n| n.value.name == "constructor") => {
                    MemberKind::Constructor
                }
                None => MemberKind::Method,
            }
        } else {
            self.skip_until(|p| {
                p.check(TokenKind::Semicolon) || p.check(TokenKind::RBrace) || p.at_member_boundary()
            })?;
            self.consume_semicolon();
            MemberKind::Field
        };

        let span = start.merge(&self.previous_token().span);

        Ok(name.map(|name| ClassMember {
            name,
            kind,
            is_static,
            span,
        }))
    }

    /// A modifier keyword only acts as one when a member name follows it on
    /// the same line; otherwise it is the member's own name.
    fn modifier_applies(&self) -> bool {
        match self.peek_token(1) {
            Some(next) if !next.newline_before => {
                next.kind.is_word()
                    || matches!(
                        next.kind,
                        TokenKind::PrivateName
                            | TokenKind::StringLiteral
                            | TokenKind::NumberLiteral
                            | TokenKind::LBracket
                            | TokenKind::Star
                    )
            }
            _ => false,
        }
    }

    fn at_member_boundary(&self) -> bool {
        let token = self.current_token();
        token.newline_before
            && self.previous_token().kind.ends_expression()
            && (token.kind.is_word()
                || matches!(
                    token.kind,
                    TokenKind::PrivateName | TokenKind::StringLiteral | TokenKind::Star | TokenKind::At
                ))
    }

    fn skip_decorators(&mut self) -> ParseResult<()> {
        while self.check(TokenKind::At) {
            self.advance();
            self.parse_identifier()?;
            while self.check(TokenKind::Dot) {
                self.advance();
                self.advance();
            }
            if self.check(TokenKind::LParen) {
                self.skip_balanced()?;
            }
        }
        Ok(())
    }

    /// Type parameters, parameters, return type and body of a method or
    /// function.
    fn skip_method_rest(&mut self) -> ParseResult<Option<Span>> {
        if self.check(TokenKind::Lt) {
            self.skip_angle_brackets()?;
        }
        if !self.check(TokenKind::LParen) {
            return Err(self.unexpected("'('"));
        }
        self.skip_balanced()?;

        if self.check(TokenKind::Colon) {
            self.advance();
            self.skip_until(|p| {
                p.check(TokenKind::LBrace) || p.check(TokenKind::Semicolon) || p.check(TokenKind::RBrace)
            })?;
        }

        if self.check(TokenKind::LBrace) {
            return self.skip_balanced().map(Some);
        }

        // Overload signature or abstract member
        self.consume_semicolon();
        Ok(None)
    }

    // =========================================================================
    // Functions
    // =========================================================================

    fn parse_function_decl(&mut self) -> ParseResult<Node<Decl>> {
        let start = self.current_token().span;

        let is_async = self.check(TokenKind::Async);
        if is_async {
            self.advance();
        }
        self.consume(TokenKind::Function, "'function'")?;

        let is_generator = self.check(TokenKind::Star);
        if is_generator {
            self.advance();
        }

        let name = self.parse_identifier()?;
        let body = self
            .skip_method_rest()?
            .unwrap_or_else(|| self.previous_token().span);

        Ok(Node::new(
            Decl::Function(FunctionDecl {
                name,
                body,
                is_async,
                is_generator,
            }),
            start.merge(&body),
        ))
    }

    // =========================================================================
    // Variables
    // =========================================================================

    fn parse_var_decl(&mut self) -> ParseResult<Node<Decl>> {
        let start = self.current_token().span;

        let kind = match self.current_token().kind {
            TokenKind::Let => VarDeclKind::Let,
            TokenKind::Const => VarDeclKind::Const,
            _ => VarDeclKind::Var,
        };
        self.advance();

        let mut names = Vec::new();

        loop {
            match self.current_token().kind {
                token_kind if token_kind.is_identifier_like() => {
                    names.push(self.parse_identifier()?)
                }
                TokenKind::LBrace | TokenKind::LBracket => {
                    self.skip_balanced()?;
                }
                _ => return Err(self.unexpected("variable name")),
            }

            // Type annotation and initializer
            self.skip_until(|p| {
                p.check(TokenKind::Comma)
                    || p.check(TokenKind::Semicolon)
                    || p.at_implicit_statement_end()
            })?;

            if self.check(TokenKind::Comma) {
                self.advance();
                continue;
            }
            break;
        }

        self.end_statement()?;
        let span = start.merge(&self.previous_token().span);

        Ok(Node::new(Decl::Var(VarDecl { kind, names }), span))
    }
}
