use nyx_ast::Span;

/// Represents the different kinds of tokens in Nyx source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Keywords - reserved
    Let,
    Const,
    Var,
    Function,
    Return,
    If,
    Else,
    For,
    While,
    Do,
    Break,
    Continue,
    Switch,
    Case,
    Default,
    Class,
    Extends,
    Import,
    Export,
    New,
    This,
    Super,
    Typeof,
    Instanceof,
    In,
    Void,
    Delete,
    Null,
    True,
    False,
    Await,
    Yield,
    Try,
    Catch,
    Finally,
    Throw,
    Debugger,
    With,

    // Keywords - contextual (also valid identifiers)
    From,
    As,
    Of,
    Async,
    Static,
    Type,
    Declare,

    // Literals
    NumberLiteral,
    StringLiteral,
    TemplateLiteral,
    RegexLiteral,
    BigIntLiteral,

    // Identifiers
    Identifier,
    PrivateName,       // #name

    // Operators
    Plus,              // +
    Minus,             // -
    Star,              // *
    Slash,             // /
    Percent,           // %
    StarStar,          // **
    Eq,                // =
    EqEq,              // ==
    EqEqEq,            // ===
    BangEq,            // !=
    BangEqEq,          // !==
    Lt,                // <
    Gt,                // >
    LtEq,              // <=
    GtEq,              // >=
    AmpAmp,            // &&
    PipePipe,          // ||
    Bang,              // !
    Amp,               // &
    Pipe,              // |
    Caret,             // ^
    Tilde,             // ~
    LtLt,              // <<
    GtGt,              // >>
    GtGtGt,            // >>>
    PlusEq,            // +=
    MinusEq,           // -=
    StarEq,            // *=
    SlashEq,           // /=
    PercentEq,         // %=
    StarStarEq,        // **=
    AmpAmpEq,          // &&=
    PipePipeEq,        // ||=
    QuestionQuestionEq,// ??=
    LtLtEq,            // <<=
    GtGtEq,            // >>=
    GtGtGtEq,          // >>>=
    AmpEq,             // &=
    PipeEq,            // |=
    CaretEq,           // ^=
    QuestionQuestion,  // ??
    QuestionDot,       // ?.
    PlusPlus,          // ++
    MinusMinus,        // --
    FatArrow,          // =>
    DotDotDot,         // ...

    // Delimiters
    LParen,            // (
    RParen,            // )
    LBrace,            // {
    RBrace,            // }
    LBracket,          // [
    RBracket,          // ]
    Semicolon,         // ;
    Comma,             // ,
    Dot,               // .
    Colon,             // :
    Question,          // ?
    At,                // @

    // Special
    Eof,
    Error,
}

impl TokenKind {
    /// Looks up the keyword spelled by `word`.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "let" => TokenKind::Let,
            "const" => TokenKind::Const,
            "var" => TokenKind::Var,
            "function" => TokenKind::Function,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "switch" => TokenKind::Switch,
            "case" => TokenKind::Case,
            "default" => TokenKind::Default,
            "class" => TokenKind::Class,
            "extends" => TokenKind::Extends,
            "import" => TokenKind::Import,
            "export" => TokenKind::Export,
            "new" => TokenKind::New,
            "this" => TokenKind::This,
            "super" => TokenKind::Super,
            "typeof" => TokenKind::Typeof,
            "instanceof" => TokenKind::Instanceof,
            "in" => TokenKind::In,
            "void" => TokenKind::Void,
            "delete" => TokenKind::Delete,
            "null" => TokenKind::Null,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "await" => TokenKind::Await,
            "yield" => TokenKind::Yield,
            "try" => TokenKind::Try,
            "catch" => TokenKind::Catch,
            "finally" => TokenKind::Finally,
            "throw" => TokenKind::Throw,
            "debugger" => TokenKind::Debugger,
            "with" => TokenKind::With,
            "from" => TokenKind::From,
            "as" => TokenKind::As,
            "of" => TokenKind::Of,
            "async" => TokenKind::Async,
            "static" => TokenKind::Static,
            "type" => TokenKind::Type,
            "declare" => TokenKind::Declare,
            _ => return None,
        };
        Some(kind)
    }

    /// Contextual keywords double as plain identifiers.
    pub fn is_contextual(&self) -> bool {
        matches!(
            self,
            TokenKind::From
                | TokenKind::As
                | TokenKind::Of
                | TokenKind::Async
                | TokenKind::Static
                | TokenKind::Type
                | TokenKind::Declare
        )
    }

    /// True for identifiers and contextual keywords.
    pub fn is_identifier_like(&self) -> bool {
        *self == TokenKind::Identifier || self.is_contextual()
    }

    /// True for any word token, usable as a property name.
    pub fn is_word(&self) -> bool {
        *self == TokenKind::Identifier || self.is_keyword()
    }

    pub fn is_keyword(&self) -> bool {
        (*self as u16) <= (TokenKind::Declare as u16)
    }

    /// Tokens after which a `/` is a division operator rather than the start
    /// of a regular expression.
    pub fn ends_expression(&self) -> bool {
        self.is_identifier_like()
            || matches!(
                self,
                TokenKind::NumberLiteral
                    | TokenKind::StringLiteral
                    | TokenKind::TemplateLiteral
                    | TokenKind::RegexLiteral
                    | TokenKind::BigIntLiteral
                    | TokenKind::PrivateName
                    | TokenKind::RParen
                    | TokenKind::RBracket
                    | TokenKind::RBrace
                    | TokenKind::This
                    | TokenKind::Super
                    | TokenKind::Null
                    | TokenKind::True
                    | TokenKind::False
                    | TokenKind::PlusPlus
                    | TokenKind::MinusMinus
            )
    }

    /// Keywords that can only begin a statement.
    pub fn starts_statement(&self) -> bool {
        matches!(
            self,
            TokenKind::Let
                | TokenKind::Const
                | TokenKind::Var
                | TokenKind::Function
                | TokenKind::Class
                | TokenKind::Import
                | TokenKind::Export
                | TokenKind::If
                | TokenKind::For
                | TokenKind::While
                | TokenKind::Do
                | TokenKind::Return
                | TokenKind::Switch
                | TokenKind::Try
                | TokenKind::Throw
                | TokenKind::Break
                | TokenKind::Continue
        )
    }
}

/// Represents a token with its kind, span, and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Identifier text, cooked string value, raw template body, or error message
    pub value: String,
    /// A line terminator appeared between the previous token and this one
    pub newline_before: bool,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, span: Span, value: String) -> Self {
        Self {
            kind,
            span,
            value,
            newline_before: false,
        }
    }
}
