use nyx_ast::Span;
use crate::token::{Token, TokenKind};

/// Punctuators, longest spelling first so that the first prefix match wins.
const PUNCTUATORS: &[(&str, TokenKind)] = &[
    (">>>=", TokenKind::GtGtGtEq),
    ("...", TokenKind::DotDotDot),
    ("===", TokenKind::EqEqEq),
    ("!==", TokenKind::BangEqEq),
    ("**=", TokenKind::StarStarEq),
    ("<<=", TokenKind::LtLtEq),
    (">>=", TokenKind::GtGtEq),
    (">>>", TokenKind::GtGtGt),
    ("&&=", TokenKind::AmpAmpEq),
    ("||=", TokenKind::PipePipeEq),
    ("??=", TokenKind::QuestionQuestionEq),
    ("=>", TokenKind::FatArrow),
    ("==", TokenKind::EqEq),
    ("!=", TokenKind::BangEq),
    ("<=", TokenKind::LtEq),
    (">=", TokenKind::GtEq),
    ("&&", TokenKind::AmpAmp),
    ("||", TokenKind::PipePipe),
    ("??", TokenKind::QuestionQuestion),
    ("?.", TokenKind::QuestionDot),
    ("++", TokenKind::PlusPlus),
    ("--", TokenKind::MinusMinus),
    ("+=", TokenKind::PlusEq),
    ("-=", TokenKind::MinusEq),
    ("*=", TokenKind::StarEq),
    ("/=", TokenKind::SlashEq),
    ("%=", TokenKind::PercentEq),
    ("&=", TokenKind::AmpEq),
    ("|=", TokenKind::PipeEq),
    ("^=", TokenKind::CaretEq),
    ("**", TokenKind::StarStar),
    ("<<", TokenKind::LtLt),
    (">>", TokenKind::GtGt),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("=", TokenKind::Eq),
    ("!", TokenKind::Bang),
    ("<", TokenKind::Lt),
    (">", TokenKind::Gt),
    ("&", TokenKind::Amp),
    ("|", TokenKind::Pipe),
    ("^", TokenKind::Caret),
    ("~", TokenKind::Tilde),
    ("?", TokenKind::Question),
    (".", TokenKind::Dot),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    ("[", TokenKind::LBracket),
    ("]", TokenKind::RBracket),
    (";", TokenKind::Semicolon),
    (",", TokenKind::Comma),
    (":", TokenKind::Colon),
    ("@", TokenKind::At),
];

/// One raw string piece of a template literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateQuasi {
    pub raw: String,
    pub span: Span,
}

/// The lexer/tokenizer for Nyx.
pub struct Lexer<'a> {
    source: &'a str,
    chars: std::str::CharIndices<'a>,
    current_pos: usize,
    current_char: Option<char>,
    newline_before: bool,
    last_kind: Option<TokenKind>,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer from source code.
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.char_indices();
        let current_char = chars.next().map(|(_, c)| c);
        Self {
            source,
            chars,
            current_pos: 0,
            current_char,
            newline_before: false,
            last_kind: None,
        }
    }

    /// Tokenizes the entire source code and returns all tokens.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    /// Gets the next token from the source.
    pub fn next_token(&mut self) -> Token {
        self.newline_before = false;

        let mut token = match self.skip_whitespace_and_comments() {
            Some(error_token) => error_token,
            None => self.scan_token(),
        };

        token.newline_before = self.newline_before;
        self.last_kind = Some(token.kind);
        token
    }

    fn scan_token(&mut self) -> Token {
        let start = self.current_pos;

        match self.current_char {
            None => self.token(TokenKind::Eof, start, String::new()),
            Some(ch) => match ch {
                '"' | '\'' => self.read_string_literal(ch),
                '`' => self.read_template_literal(),
                '0'..='9' => self.read_number(),
                '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => self.read_number(),
                '#' => self.read_private_name(),
                '/' if self.regex_allowed() => self.read_regex(),
                _ if is_identifier_start(ch) => self.read_identifier_or_keyword(),
                _ => self.read_punctuator(ch),
            },
        }
    }

    // Helper methods

    fn token(&self, kind: TokenKind, start: usize, value: String) -> Token {
        Token::new(kind, Span::new(start, self.current_pos), value)
    }

    fn error(&self, start: usize, message: &str) -> Token {
        self.token(TokenKind::Error, start, message.to_string())
    }

    fn advance(&mut self) {
        if let Some((pos, ch)) = self.chars.next() {
            self.current_pos = pos;
            self.current_char = Some(ch);
        } else {
            self.current_pos = self.source.len();
            self.current_char = None;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.clone().next().map(|(_, c)| c)
    }

    fn regex_allowed(&self) -> bool {
        match self.last_kind {
            None => true,
            Some(kind) => !kind.ends_expression(),
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Option<Token> {
        loop {
            match self.current_char {
                Some('\n') => {
                    self.newline_before = true;
                    self.advance();
                }
                Some(ch) if ch.is_whitespace() => {
                    self.advance();
                }
                Some('/') => {
                    if self.peek() == Some('/') {
                        self.skip_single_line_comment();
                    } else if self.peek() == Some('*') {
                        let start = self.current_pos;
                        if !self.skip_multi_line_comment() {
                            return Some(self.error(start, "Unterminated multi-line comment"));
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        None
    }

    fn skip_single_line_comment(&mut self) {
        while let Some(ch) = self.current_char {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn skip_multi_line_comment(&mut self) -> bool {
        // Skip /*
        self.advance();
        self.advance();

        while let Some(ch) = self.current_char {
            if ch == '*' && self.peek() == Some('/') {
                self.advance();
                self.advance();
                return true;
            }
            if ch == '\n' {
                self.newline_before = true;
            }
            self.advance();
        }
        false
    }

    fn read_string_literal(&mut self, quote: char) -> Token {
        let start = self.current_pos;
        self.advance();

        let mut value = String::new();

        while let Some(ch) = self.current_char {
            if ch == quote {
                self.advance();
                return self.token(TokenKind::StringLiteral, start, value);
            } else if ch == '\\' {
                self.advance();
                if let Some(escaped) = self.current_char {
                    match escaped {
                        'u' => {
                            self.advance();
                            value.push(self.read_hex_escape(4));
                        }
                        'x' => {
                            self.advance();
                            value.push(self.read_hex_escape(2));
                        }
                        '\n' => self.advance(),
                        _ => {
                            value.push(match escaped {
                                'n' => '\n',
                                'r' => '\r',
                                't' => '\t',
                                '0' => '\0',
                                other => other,
                            });
                            self.advance();
                        }
                    }
                }
            } else if ch == '\n' {
                break;
            } else {
                value.push(ch);
                self.advance();
            }
        }

        self.error(start, "Unterminated string literal")
    }

    fn read_hex_escape(&mut self, digits: usize) -> char {
        let mut code = 0u32;
        for _ in 0..digits {
            match self.current_char.and_then(|ch| ch.to_digit(16)) {
                Some(digit) => {
                    code = code * 16 + digit;
                    self.advance();
                }
                None => break,
            }
        }
        char::from_u32(code).unwrap_or('\u{FFFD}')
    }

    fn read_template_literal(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();

        if self.skip_template_body(None) {
            let raw = self.source[start + 1..self.current_pos - 1].to_string();
            self.token(TokenKind::TemplateLiteral, start, raw)
        } else {
            self.error(start, "Unterminated template literal")
        }
    }

    /// Consumes a template body up to and including the closing backtick.
    /// When `pieces` is given, records the span of every raw string piece.
    fn skip_template_body(&mut self, mut pieces: Option<&mut Vec<Span>>) -> bool {
        let mut piece_start = self.current_pos;

        while let Some(ch) = self.current_char {
            match ch {
                '\\' => {
                    self.advance();
                    self.advance();
                }
                '`' => {
                    if let Some(pieces) = pieces.as_deref_mut() {
                        pieces.push(Span::new(piece_start, self.current_pos));
                    }
                    self.advance();
                    return true;
                }
                '$' if self.peek() == Some('{') => {
                    if let Some(pieces) = pieces.as_deref_mut() {
                        pieces.push(Span::new(piece_start, self.current_pos));
                    }
                    self.advance();
                    self.advance();
                    if !self.skip_substitution() {
                        return false;
                    }
                    piece_start = self.current_pos;
                }
                _ => self.advance(),
            }
        }
        false
    }

    /// Consumes a `${ ... }` substitution, starting after the `${`.
    fn skip_substitution(&mut self) -> bool {
        let mut depth = 1usize;

        while let Some(ch) = self.current_char {
            match ch {
                '{' => {
                    depth += 1;
                    self.advance();
                }
                '}' => {
                    depth -= 1;
                    self.advance();
                    if depth == 0 {
                        return true;
                    }
                }
                '"' | '\'' => {
                    if self.read_string_literal(ch).kind == TokenKind::Error {
                        return false;
                    }
                }
                '`' => {
                    self.advance();
                    if !self.skip_template_body(None) {
                        return false;
                    }
                }
                '/' if self.peek() == Some('/') => self.skip_single_line_comment(),
                '/' if self.peek() == Some('*') => {
                    if !self.skip_multi_line_comment() {
                        return false;
                    }
                }
                _ => self.advance(),
            }
        }
        false
    }

    fn read_regex(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();

        let mut in_class = false;
        loop {
            match self.current_char {
                None | Some('\n') => return self.error(start, "Unterminated regular expression"),
                Some('\\') => {
                    self.advance();
                    if self.current_char != Some('\n') {
                        self.advance();
                    }
                }
                Some('[') => {
                    in_class = true;
                    self.advance();
                }
                Some(']') => {
                    in_class = false;
                    self.advance();
                }
                Some('/') if !in_class => {
                    self.advance();
                    break;
                }
                Some(_) => self.advance(),
            }
        }

        // Flags
        while self.current_char.is_some_and(|c| c.is_ascii_alphabetic()) {
            self.advance();
        }

        let text = self.source[start..self.current_pos].to_string();
        self.token(TokenKind::RegexLiteral, start, text)
    }

    fn read_number(&mut self) -> Token {
        let start = self.current_pos;
        let is_radix = self.current_char == Some('0')
            && matches!(self.peek(), Some('x' | 'X' | 'o' | 'O' | 'b' | 'B'));
        let mut seen_dot = false;

        while let Some(ch) = self.current_char {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                let is_exponent = !is_radix && matches!(ch, 'e' | 'E');
                self.advance();
                if is_exponent && matches!(self.current_char, Some('+' | '-')) {
                    self.advance();
                }
            } else if ch == '.'
                && !seen_dot
                && !is_radix
                && !self.peek().is_some_and(is_identifier_start)
            {
                seen_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        let text: String = self.source[start..self.current_pos]
            .chars()
            .filter(|c| *c != '_')
            .collect();

        match text.strip_suffix('n') {
            Some(digits) if !is_radix || !digits.is_empty() => {
                self.token(TokenKind::BigIntLiteral, start, digits.to_string())
            }
            _ => self.token(TokenKind::NumberLiteral, start, text),
        }
    }

    fn read_identifier_text(&mut self) -> String {
        let mut value = String::new();
        while let Some(ch) = self.current_char {
            if is_identifier_part(ch) {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        value
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        let start = self.current_pos;
        let value = self.read_identifier_text();
        let kind = TokenKind::keyword(&value).unwrap_or(TokenKind::Identifier);
        self.token(kind, start, value)
    }

    fn read_private_name(&mut self) -> Token {
        let start = self.current_pos;
        self.advance();

        if !self.current_char.is_some_and(is_identifier_start) {
            return self.error(start, "Unexpected character: #");
        }

        let name = self.read_identifier_text();
        self.token(TokenKind::PrivateName, start, format!("#{}", name))
    }

    fn read_punctuator(&mut self, ch: char) -> Token {
        let start = self.current_pos;
        let rest = &self.source[start..];

        for (text, kind) in PUNCTUATORS {
            if !rest.starts_with(text) {
                continue;
            }
            // `a?.5:b` is a conditional, not optional chaining
            if *kind == TokenKind::QuestionDot
                && rest[2..].starts_with(|c: char| c.is_ascii_digit())
            {
                continue;
            }
            for _ in 0..text.len() {
                self.advance();
            }
            return self.token(*kind, start, text.to_string());
        }

        self.advance();
        self.token(
            TokenKind::Error,
            start,
            format!("Unexpected character: {}", ch),
        )
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_identifier_part(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// Splits the template literal at `span` into its raw string pieces.
pub fn template_quasis(source: &str, span: Span) -> Vec<TemplateQuasi> {
    let text = &source[span.start..span.end];
    let mut lexer = Lexer::new(text);
    let mut pieces = Vec::new();

    if lexer.current_char == Some('`') {
        lexer.advance();
        lexer.skip_template_body(Some(&mut pieces));
    }

    pieces
        .into_iter()
        .map(|piece| TemplateQuasi {
            raw: text[piece.start..piece.end].to_string(),
            span: Span::new(span.start + piece.start, span.start + piece.end),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).tokenize().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords() {
        let source = "let const function class extends import export static";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::Let,
                TokenKind::Const,
                TokenKind::Function,
                TokenKind::Class,
                TokenKind::Extends,
                TokenKind::Import,
                TokenKind::Export,
                TokenKind::Static,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_contextual_keywords_are_identifier_like() {
        assert!(TokenKind::From.is_identifier_like());
        assert!(TokenKind::Async.is_word());
        assert!(TokenKind::Return.is_word());
        assert!(!TokenKind::Return.is_identifier_like());
        assert!(!TokenKind::NumberLiteral.is_keyword());
    }

    #[test]
    fn test_numbers() {
        let tokens = Lexer::new("42 3.14 0xFF 1_000 10n 1e-3 .5").tokenize();
        assert_eq!(tokens[0].value, "42");
        assert_eq!(tokens[1].value, "3.14");
        assert_eq!(tokens[2].value, "0xFF");
        assert_eq!(tokens[3].value, "1000");
        assert_eq!(tokens[4].kind, TokenKind::BigIntLiteral);
        assert_eq!(tokens[4].value, "10");
        assert_eq!(tokens[5].value, "1e-3");
        assert_eq!(tokens[6].kind, TokenKind::NumberLiteral);
        assert_eq!(tokens[6].value, ".5");
    }

    #[test]
    fn test_member_access_on_number() {
        assert_eq!(
            kinds("1.toString"),
            vec![
                TokenKind::NumberLiteral,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_strings() {
        let tokens = Lexer::new(r#""hello" 'wor\nld' "\x41B""#).tokenize();
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].value, "hello");
        assert_eq!(tokens[1].value, "wor\nld");
        assert_eq!(tokens[2].value, "AB");
    }

    #[test]
    fn test_unterminated_string() {
        let tokens = Lexer::new("'abc\nlet").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[0].value, "Unterminated string literal");
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            kinds("a >>>= b ?? c?.d === e ... f"),
            vec![
                TokenKind::Identifier,
                TokenKind::GtGtGtEq,
                TokenKind::Identifier,
                TokenKind::QuestionQuestion,
                TokenKind::Identifier,
                TokenKind::QuestionDot,
                TokenKind::Identifier,
                TokenKind::EqEqEq,
                TokenKind::Identifier,
                TokenKind::DotDotDot,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_conditional_with_decimal() {
        assert_eq!(
            kinds("a?.5:b"),
            vec![
                TokenKind::Identifier,
                TokenKind::Question,
                TokenKind::NumberLiteral,
                TokenKind::Colon,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_and_newlines() {
        let source = "let x = 5; // trailing\n/* multi\nline */ const y = 10;";
        let tokens = Lexer::new(source).tokenize();

        assert_eq!(tokens[0].kind, TokenKind::Let);
        assert!(!tokens[0].newline_before);
        assert_eq!(tokens[5].kind, TokenKind::Const);
        assert!(tokens[5].newline_before);
        assert!(!tokens[6].newline_before);
    }

    #[test]
    fn test_unterminated_comment() {
        let tokens = Lexer::new("let /* nope").tokenize();
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(tokens[1].value, "Unterminated multi-line comment");
    }

    #[test]
    fn test_regex_versus_division() {
        let tokens = Lexer::new("let r = /a[/]b/gi; let d = a / b / c;").tokenize();
        assert_eq!(tokens[3].kind, TokenKind::RegexLiteral);
        assert_eq!(tokens[3].value, "/a[/]b/gi");
        assert_eq!(tokens[9].kind, TokenKind::Slash);
        assert_eq!(tokens[11].kind, TokenKind::Slash);
    }

    #[test]
    fn test_regex_after_return() {
        let tokens = Lexer::new("return /x/.test(s)").tokenize();
        assert_eq!(tokens[1].kind, TokenKind::RegexLiteral);
    }

    #[test]
    fn test_private_names() {
        let tokens = Lexer::new("this.#count #").tokenize();
        assert_eq!(tokens[2].kind, TokenKind::PrivateName);
        assert_eq!(tokens[2].value, "#count");
        assert_eq!(tokens[3].kind, TokenKind::Error);
    }

    #[test]
    fn test_template_literal_is_one_token() {
        let source = "tag`a${ {x: `in${1}ner`}.x }b`;";
        let tokens = Lexer::new(source).tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].kind, TokenKind::TemplateLiteral);
        assert_eq!(tokens[2].kind, TokenKind::Semicolon);
    }

    #[test]
    fn test_template_quasis() {
        let source = "x = `one${a}two${ `${b}` }three`";
        let tokens = Lexer::new(source).tokenize();
        let template = &tokens[2];
        assert_eq!(template.kind, TokenKind::TemplateLiteral);

        let quasis = template_quasis(source, template.span);
        let raws: Vec<&str> = quasis.iter().map(|q| q.raw.as_str()).collect();
        assert_eq!(raws, vec!["one", "two", "three"]);
        assert_eq!(&source[quasis[1].span.start..quasis[1].span.end], "two");
    }

    #[test]
    fn test_template_quasis_without_substitutions() {
        let source = "`plain \\` text`";
        let quasis = template_quasis(source, Span::new(0, source.len()));
        assert_eq!(quasis.len(), 1);
        assert_eq!(quasis[0].raw, "plain \\` text");
    }

    #[test]
    fn test_unterminated_template() {
        let tokens = Lexer::new("`abc${").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[0].value, "Unterminated template literal");
    }
}
