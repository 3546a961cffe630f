//! Reference code generator
//!
//! Emits JavaScript (or TypeScript for the type checker) by patching the
//! original text token by token, so that line N of the output always comes
//! from line N of the input. The outline AST supplies module structure
//! (imports, exports, top-level bindings); everything inside statement
//! bodies is handled from the token stream with a bracket stack that tells
//! blocks, object literals and class bodies apart.

use nyx_ast::{Decl, ImportDecl, ModuleItem, Node, Span};
use nyx_lexer::{template_quasis, Lexer, Token, TokenKind};
use rustc_hash::FxHashSet;
use serde_json::Value;

use crate::error::GenerateError;
use crate::frontend::{CodeGenerator, GenerateRequest, Generated};
use crate::issue::Issue;
use crate::options::OutputLanguage;
use crate::patch::Patcher;
use crate::resolver::ImportKind;
use crate::symbols::{self, FuncComponents, ROOT_VARIABLE};

/// Opening of the per-file scope in JavaScript output.
pub const FILE_PROLOGUE: &str = "(function(){ \"use strict\";";
/// Closing of the per-file scope in JavaScript output.
pub const FILE_EPILOGUE: &str = "})();";

/// Runtime accessors reachable through the `Nyx` import.
const RUNTIME_MEMBERS: &[(&str, &str)] = &[
    ("dispatchInit", "i"),
    ("noInitSymbol", "x"),
    ("namedInitSymbol", "n"),
    ("postInitSymbol", "p"),
    ("observerSymbol", "o"),
    ("reportUndefined", "r"),
];

/// Words that modify a class member or object property instead of naming it.
const MODIFIERS: &[&str] = &[
    "static", "get", "set", "async", "public", "private", "protected", "readonly", "abstract",
    "override", "declare", "accessor",
];

/// Bundled [`CodeGenerator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptGenerator;

impl CodeGenerator for ScriptGenerator {
    fn generate(&self, request: GenerateRequest<'_>) -> Result<Generated, GenerateError> {
        Emitter::new(request).run()
    }
}

// =============================================================================
// Emitter
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bracket {
    Block,
    Object,
    ClassBody,
    Paren,
    Square,
}

/// What a word token stands for at its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    /// Property after `.` or `?.`
    MemberAccess,
    /// Class member name
    Member,
    /// Object literal key
    Key,
    /// `{ name }`
    Shorthand,
    Modifier,
    Plain,
}

struct Emitter<'a> {
    request: GenerateRequest<'a>,
    text: &'a str,
    patcher: Patcher<'a>,
    warnings: Vec<Issue>,
    /// Start offsets of tokens that bind a top-level name
    bindings: FxHashSet<usize>,
    /// Statements replaced as a whole
    replaced: Vec<Span>,
}

impl<'a> Emitter<'a> {
    fn new(request: GenerateRequest<'a>) -> Self {
        let text: &'a str = &request.source.text;
        Self {
            request,
            text,
            patcher: Patcher::new(text),
            warnings: Vec::new(),
            bindings: FxHashSet::default(),
            replaced: Vec::new(),
        }
    }

    fn is_javascript(&self) -> bool {
        self.request.language != OutputLanguage::TypeScript
    }

    fn run(mut self) -> Result<Generated, GenerateError> {
        let source = self.request.source;

        for item in &source.program.items {
            self.module_item(item)?;
        }

        self.walk(&source.tokens, false)?;

        let is_javascript = self.is_javascript();
        let output = self.patcher.finish();
        let mut lines: Vec<String> = output.split('\n').map(str::to_string).collect();

        if is_javascript {
            if let Some(first) = lines.first_mut() {
                first.insert_str(0, FILE_PROLOGUE);
            }
            if let Some(last) = lines.last_mut() {
                last.push_str(FILE_EPILOGUE);
            }
        }

        Ok(Generated {
            lines,
            warnings: self.warnings,
        })
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> GenerateError {
        let (line, column) = self.request.source.line_index.line_col(offset);
        GenerateError::at(message, line, column)
    }

    fn warn_at(&mut self, offset: usize, message: String) {
        let (line, column) = self.request.source.line_index.line_col(offset);
        self.warnings
            .push(Issue::new(message).at(line, column).in_file(self.request.path));
    }

    // =========================================================================
    // Module items
    // =========================================================================

    fn module_item(&mut self, item: &Node<ModuleItem>) -> Result<(), GenerateError> {
        match &item.value {
            ModuleItem::Import(import) => {
                let replacement = self.import_statement(import)?;
                self.patcher.replace(item.span, replacement);
                self.replaced.push(item.span);
            }
            ModuleItem::Export(export) => {
                self.protect(&export.decl);
                if self.is_javascript() {
                    self.patcher
                        .remove(Span::new(export.keyword.start, export.decl.span.start));
                    let assignments = self.export_assignments(&export.decl, item.span)?;
                    self.patcher.insert(item.span.end, assignments);
                }
            }
            ModuleItem::Decl(decl) => self.protect(decl),
            ModuleItem::Stmt => {}
        }
        Ok(())
    }

    fn protect(&mut self, decl: &Node<Decl>) {
        for name in decl.value.bound_names() {
            self.bindings.insert(name.span.start);
        }
    }

    fn import_statement(&mut self, import: &ImportDecl) -> Result<String, GenerateError> {
        let squeezer = self.request.squeezer;
        let imports = self.request.imports;
        let mut parts = Vec::new();

        for specifier in &import.specifiers {
            let name = &specifier.value.name;
            let offset = specifier.span.start;

            let Some(resolved) = imports.get(name) else {
                self.warn_at(offset, format!("Unknown import: \"{}\"", name));
                continue;
            };

            if resolved.kind == ImportKind::Runtime {
                continue;
            }

            if !self.is_javascript() {
                match resolved.path.as_deref() {
                    Some(path) if path == self.request.path => {}
                    Some(path) => parts.push(format!(
                        "import {{ {} }} from \"{}\";",
                        name,
                        relative_import(self.request.path, path)
                    )),
                    None => self.warn_at(offset, format!("No known path for: \"{}\"", name)),
                }
                continue;
            }

            if resolved.kind == ImportKind::Past {
                parts.push(format!(
                    "{} = {}",
                    name,
                    symbols::import_expression(name, squeezer)?
                ));
            }
        }

        if parts.is_empty() {
            return Ok(String::new());
        }

        Ok(if self.is_javascript() {
            format!("const {};", parts.join(","))
        } else {
            parts.join("")
        })
    }

    fn export_assignments(&self, decl: &Node<Decl>, item: Span) -> Result<String, GenerateError> {
        let mut result = String::new();

        if matches!(decl.value, Decl::Var(_)) && !self.text[..item.end].ends_with(';') {
            result.push(';');
        }

        for name in decl.value.bound_names() {
            let name = &name.value.name;
            result.push_str(&format!(
                " {} = {};",
                symbols::import_expression(name, self.request.squeezer)?,
                name
            ));
        }

        Ok(result)
    }

    // =========================================================================
    // Token walk
    // =========================================================================

    fn is_replaced(&self, offset: usize) -> bool {
        self.replaced.iter().any(|span| span.contains(offset))
    }

    /// Walks one token run. `in_expression` marks the run of a template
    /// substitution, where a leading `{` opens an object.
    fn walk(&mut self, tokens: &[Token], in_expression: bool) -> Result<(), GenerateError> {
        let mut stack: Vec<Bracket> = Vec::new();
        let mut pending_class: Option<usize> = None;
        let mut i = 0;

        while i < tokens.len() {
            let token = &tokens[i];
            if token.kind == TokenKind::Eof {
                break;
            }
            if self.is_replaced(token.span.start) {
                i += 1;
                continue;
            }

            match token.kind {
                TokenKind::LBrace => {
                    let bracket = if pending_class == Some(stack.len()) {
                        pending_class = None;
                        Bracket::ClassBody
                    } else if opens_object(tokens, i, in_expression) {
                        Bracket::Object
                    } else {
                        Bracket::Block
                    };
                    stack.push(bracket);
                }
                TokenKind::LParen => stack.push(Bracket::Paren),
                TokenKind::LBracket => stack.push(Bracket::Square),
                TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket => {
                    stack.pop();
                }
                TokenKind::TemplateLiteral => self.substitutions(token)?,
                TokenKind::Class if starts_class(tokens, i) => {
                    pending_class = Some(stack.len());
                    i = self.word(tokens, i, stack.last().copied())?;
                    continue;
                }
                kind if kind.is_word() => {
                    i = self.word(tokens, i, stack.last().copied())?;
                    continue;
                }
                _ => {}
            }

            i += 1;
        }

        Ok(())
    }

    /// Handles the word at `i`; returns the index of the next unhandled token.
    fn word(&mut self, tokens: &[Token], i: usize, context: Option<Bracket>) -> Result<usize, GenerateError> {
        let token = &tokens[i];

        if token.kind.is_identifier_like() && token.value.starts_with("N$") {
            return Err(self.error_at(token.span.start, "Identifiers may not start with \"N$\""));
        }

        match role(tokens, i, context) {
            Role::MemberAccess | Role::Member | Role::Key => {
                self.squeeze_token(token)?;
                return Ok(i + 1);
            }
            Role::Shorthand => {
                self.shorthand(token)?;
                return Ok(i + 1);
            }
            Role::Modifier => return Ok(i + 1),
            Role::Plain => {}
        }

        if !token.kind.is_identifier_like() || self.bindings.contains(&token.span.start) {
            return Ok(i + 1);
        }

        if self.is_runtime(&token.value) && next_kind(tokens, i) == Some(TokenKind::Dot) {
            return self.runtime_member(tokens, i);
        }

        if next_kind(tokens, i) == Some(TokenKind::TemplateLiteral)
            && self.request.options.interceptors().contains_key(&token.value)
        {
            return self.intercept(tokens, i);
        }

        if declares_binding(tokens, i) {
            return Ok(i + 1);
        }

        if let Some(replacement) = self.reference(tokens, i)? {
            self.patcher.replace(token.span, replacement);
        }

        Ok(i + 1)
    }

    fn squeeze_token(&mut self, token: &Token) -> Result<(), GenerateError> {
        let Some(squeezer) = self.request.squeezer else {
            return Ok(());
        };
        if token.kind == TokenKind::PrivateName || token.value == "constructor" {
            return Ok(());
        }

        let squeezed = squeezer.squeeze(&token.value)?;
        if squeezed != token.value {
            self.patcher.replace(token.span, squeezed);
        }
        Ok(())
    }

    fn shorthand(&mut self, token: &Token) -> Result<(), GenerateError> {
        let name = &token.value;
        let key = match self.request.squeezer {
            Some(squeezer) => squeezer.squeeze(name)?,
            None => name.clone(),
        };
        let value = self
            .rewritten_name(token)?
            .unwrap_or_else(|| name.clone());

        if &key != name || &value != name {
            self.patcher.replace(token.span, format!("{}: {}", key, value));
        }
        Ok(())
    }

    /// Replacement for a plain identifier reference, if any.
    fn reference(&self, tokens: &[Token], i: usize) -> Result<Option<String>, GenerateError> {
        let token = &tokens[i];

        if self.request.options.additional_globals().contains_key(&token.value)
            && next_kind(tokens, i).is_some_and(is_assignment)
        {
            return Err(self.error_at(
                token.span.start,
                format!("Cannot use compiler-inlined \"{}\" here", token.value),
            ));
        }

        self.rewritten_name(token)
    }

    fn rewritten_name(&self, token: &Token) -> Result<Option<String>, GenerateError> {
        let name = &token.value;

        if self.is_javascript() && self.request.imports.kind_of(name) == Some(ImportKind::Future) {
            return Ok(Some(symbols::import_expression(name, self.request.squeezer)?));
        }

        if let Some(value) = self.request.options.additional_globals().get(name) {
            return Ok(Some(inline_literal(value)));
        }

        Ok(None)
    }

    // =========================================================================
    // Runtime
    // =========================================================================

    fn is_runtime(&self, name: &str) -> bool {
        self.request.imports.kind_of(name) == Some(ImportKind::Runtime)
    }

    fn runtime_member(&mut self, tokens: &[Token], i: usize) -> Result<usize, GenerateError> {
        let object = &tokens[i];
        let Some(property) = tokens.get(i + 2).filter(|t| t.kind.is_word()) else {
            return Err(self.error_at(object.span.start, format!("Unknown runtime property: {}.", object.value)));
        };

        if property.value == "getFuncIdentifier" {
            let identifier = self.func_identifier(tokens, i)?;
            self.patcher
                .replace(Span::new(object.span.start, tokens[i + 5].span.end), identifier);
            return Ok(i + 6);
        }

        let Some((_, accessor)) = RUNTIME_MEMBERS.iter().find(|(name, _)| *name == property.value) else {
            return Err(self.error_at(
                property.span.start,
                format!("Unknown runtime property: {}.{}", object.value, property.value),
            ));
        };

        if self.is_javascript() {
            self.patcher.replace(
                Span::new(object.span.start, property.span.end),
                format!("{}.{}", ROOT_VARIABLE, accessor),
            );
        }
        Ok(i + 3)
    }

    /// `Nyx.getFuncIdentifier("name(label:)")` becomes the quoted func
    /// identifier.
    fn func_identifier(&self, tokens: &[Token], i: usize) -> Result<String, GenerateError> {
        let offset = tokens[i].span.start;
        let argument = match (tokens.get(i + 3), tokens.get(i + 4), tokens.get(i + 5)) {
            (Some(open), Some(argument), Some(close))
                if open.kind == TokenKind::LParen
                    && argument.kind == TokenKind::StringLiteral
                    && close.kind == TokenKind::RParen =>
            {
                &argument.value
            }
            _ => return Err(self.error_at(offset, "Invalid use of Nyx.getFuncIdentifier")),
        };

        let components: FuncComponents = symbols::from_func_string(argument)
            .ok_or_else(|| self.error_at(offset, format!("\"{}\" is not a valid func signature.", argument)))?;

        let identifier = symbols::to_func_identifier(&components)
            .ok_or_else(|| self.error_at(offset, format!("\"{}\" has no named arguments.", argument)))?;

        let identifier = match self.request.squeezer {
            Some(squeezer) => squeezer.squeeze(&identifier)?,
            None => identifier,
        };

        Ok(format!("\"{}\"", identifier))
    }

    // =========================================================================
    // Templates
    // =========================================================================

    /// Walks the `${ ... }` substitutions of a template literal.
    fn substitutions(&mut self, template: &Token) -> Result<(), GenerateError> {
        let quasis = template_quasis(self.text, template.span);

        for pair in quasis.windows(2) {
            let start = pair[0].span.end + 2;
            let end = pair[1].span.start.saturating_sub(1);
            if start >= end {
                continue;
            }
            let tokens = lex_at(self.text, Span::new(start, end));
            self.walk(&tokens, true)?;
        }

        Ok(())
    }

    /// Rewrites a template tagged with a configured interceptor.
    fn intercept(&mut self, tokens: &[Token], i: usize) -> Result<usize, GenerateError> {
        let tag = &tokens[i];
        let template = &tokens[i + 1];
        let options = self.request.options;

        if self.is_javascript() {
            let Some(interceptor) = options.interceptors().get(&tag.value) else {
                return Ok(i + 1);
            };

            let quasis = template_quasis(self.text, template.span);
            let inputs: Vec<String> = quasis.iter().map(|quasi| quasi.raw.clone()).collect();

            let outputs = interceptor.call(&inputs).map_err(|message| {
                let (line, column) = self.request.source.line_index.line_col(tag.span.start);
                GenerateError::Invalid {
                    message: message.clone(),
                    line: Some(line),
                    column: Some(column),
                    cause: Some(message),
                }
            })?;

            if outputs.len() != inputs.len() {
                return Err(self.error_at(
                    tag.span.start,
                    format!(
                        "Interceptor '{}' string count mismatch. {} vs. {}",
                        tag.value,
                        outputs.len(),
                        inputs.len()
                    ),
                ));
            }

            match outputs.as_slice() {
                [only] if !only.contains('"') && !only.contains('\n') => {
                    self.patcher.replace(template.span, format!("\"{}\"", only));
                }
                _ => {
                    for (quasi, output) in quasis.iter().zip(outputs) {
                        self.patcher.replace(quasi.span, output);
                    }
                    self.substitutions(template)?;
                }
            }
        } else {
            self.substitutions(template)?;
        }

        self.patcher.remove(Span::new(tag.span.start, template.span.start));
        Ok(i + 2)
    }
}

// =============================================================================
// Token classification
// =============================================================================

fn next_kind(tokens: &[Token], i: usize) -> Option<TokenKind> {
    tokens.get(i + 1).map(|t| t.kind)
}

fn is_assignment(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Eq
            | TokenKind::PlusEq
            | TokenKind::MinusEq
            | TokenKind::StarEq
            | TokenKind::SlashEq
            | TokenKind::PercentEq
            | TokenKind::StarStarEq
            | TokenKind::AmpAmpEq
            | TokenKind::PipePipeEq
            | TokenKind::QuestionQuestionEq
            | TokenKind::LtLtEq
            | TokenKind::GtGtEq
            | TokenKind::GtGtGtEq
            | TokenKind::AmpEq
            | TokenKind::PipeEq
            | TokenKind::CaretEq
            | TokenKind::PlusPlus
            | TokenKind::MinusMinus
    )
}

fn is_operator(kind: TokenKind) -> bool {
    is_assignment(kind)
        || matches!(
            kind,
            TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Percent
                | TokenKind::StarStar
                | TokenKind::EqEq
                | TokenKind::EqEqEq
                | TokenKind::BangEq
                | TokenKind::BangEqEq
                | TokenKind::Lt
                | TokenKind::Gt
                | TokenKind::LtEq
                | TokenKind::GtEq
                | TokenKind::AmpAmp
                | TokenKind::PipePipe
                | TokenKind::QuestionQuestion
                | TokenKind::Bang
                | TokenKind::Amp
                | TokenKind::Pipe
                | TokenKind::Caret
                | TokenKind::Tilde
                | TokenKind::LtLt
                | TokenKind::GtGt
                | TokenKind::GtGtGt
        )
}

/// Whether the `{` at `i` starts an object literal or pattern rather than a
/// block.
fn opens_object(tokens: &[Token], i: usize, in_expression: bool) -> bool {
    let Some(prev) = i.checked_sub(1).map(|p| &tokens[p]) else {
        return in_expression;
    };

    match prev.kind {
        TokenKind::LParen
        | TokenKind::LBracket
        | TokenKind::Comma
        | TokenKind::Colon
        | TokenKind::Question
        | TokenKind::DotDotDot
        | TokenKind::Let
        | TokenKind::Const
        | TokenKind::Var
        | TokenKind::Yield
        | TokenKind::Await
        | TokenKind::Typeof
        | TokenKind::Void
        | TokenKind::Delete
        | TokenKind::In
        | TokenKind::Of
        | TokenKind::Instanceof
        | TokenKind::Throw
        | TokenKind::Case => true,
        TokenKind::Return => !tokens[i].newline_before,
        TokenKind::FatArrow => false,
        kind => is_operator(kind),
    }
}

/// `class` as a keyword, not as a property name.
fn starts_class(tokens: &[Token], i: usize) -> bool {
    let after_dot = i
        .checked_sub(1)
        .is_some_and(|p| matches!(tokens[p].kind, TokenKind::Dot | TokenKind::QuestionDot));
    let names_property = matches!(
        next_kind(tokens, i),
        Some(TokenKind::Colon | TokenKind::LParen | TokenKind::Comma | TokenKind::RBrace | TokenKind::Eq)
    );
    !after_dot && !names_property
}

/// The word at `i` names a local binding (`let x`, `function f`).
fn declares_binding(tokens: &[Token], i: usize) -> bool {
    i.checked_sub(1).is_some_and(|p| {
        matches!(
            tokens[p].kind,
            TokenKind::Let | TokenKind::Const | TokenKind::Var | TokenKind::Function | TokenKind::Class
        )
    })
}

fn is_modifier(tokens: &[Token], i: usize) -> bool {
    let token = &tokens[i];
    if !MODIFIERS.contains(&token.value.as_str()) || !token.kind.is_word() {
        return false;
    }
    match tokens.get(i + 1) {
        Some(next) if !next.newline_before => {
            next.kind.is_word()
                || matches!(
                    next.kind,
                    TokenKind::PrivateName
                        | TokenKind::LBracket
                        | TokenKind::Star
                        | TokenKind::StringLiteral
                        | TokenKind::NumberLiteral
                )
        }
        _ => false,
    }
}

/// Index of the first token of the member or property whose name is at
/// `i`, skipping modifiers and `*`, and whether any were skipped.
fn member_start(tokens: &[Token], i: usize) -> (usize, bool) {
    let mut j = i;
    let mut modified = false;
    while j > 0 && (tokens[j - 1].kind == TokenKind::Star || is_modifier(tokens, j - 1)) {
        j -= 1;
        modified = true;
    }
    (j, modified)
}

fn role(tokens: &[Token], i: usize, context: Option<Bracket>) -> Role {
    let after_dot = i
        .checked_sub(1)
        .is_some_and(|p| matches!(tokens[p].kind, TokenKind::Dot | TokenKind::QuestionDot));
    if after_dot {
        return Role::MemberAccess;
    }

    match context {
        Some(Bracket::ClassBody) => {
            if is_modifier(tokens, i) {
                return Role::Modifier;
            }
            let (start, _) = member_start(tokens, i);
            let at_member_start = start == 0
                || tokens[start].newline_before
                || matches!(
                    tokens[start - 1].kind,
                    TokenKind::LBrace | TokenKind::RBrace | TokenKind::Semicolon
                );
            let names_member = tokens.get(i + 1).is_some_and(|next| {
                next.newline_before
                    || matches!(
                        next.kind,
                        TokenKind::LParen
                            | TokenKind::Eq
                            | TokenKind::Semicolon
                            | TokenKind::RBrace
                            | TokenKind::Question
                            | TokenKind::Bang
                            | TokenKind::Colon
                            | TokenKind::Lt
                    )
            });
            if at_member_start && names_member {
                Role::Member
            } else {
                Role::Plain
            }
        }
        Some(Bracket::Object) => {
            if is_modifier(tokens, i) {
                return Role::Modifier;
            }
            let (start, modified) = member_start(tokens, i);
            let after_separator = start > 0
                && matches!(tokens[start - 1].kind, TokenKind::LBrace | TokenKind::Comma);
            if !after_separator {
                return Role::Plain;
            }
            match next_kind(tokens, i) {
                Some(TokenKind::Colon | TokenKind::LParen) => Role::Key,
                Some(TokenKind::Comma | TokenKind::RBrace | TokenKind::Eq)
                    if !modified && tokens[i].kind.is_identifier_like() =>
                {
                    Role::Shorthand
                }
                _ => Role::Plain,
            }
        }
        _ => Role::Plain,
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Tokenizes `span` of `text`, with spans relative to `text`.
fn lex_at(text: &str, span: Span) -> Vec<Token> {
    let mut tokens = Lexer::new(&text[span.start..span.end]).tokenize();
    for token in &mut tokens {
        token.span = Span::new(token.span.start + span.start, token.span.end + span.start);
    }
    tokens
}

fn inline_literal(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "undefined".to_string())
}

/// Import specifier for `to` as seen from the file `from`.
pub fn relative_import(from: &str, to: &str) -> String {
    let components = |path: &str| -> Vec<String> {
        path.split('/')
            .filter(|part| !part.is_empty() && *part != ".")
            .map(str::to_string)
            .collect()
    };

    let mut from_dir = components(from);
    from_dir.pop();
    let target = components(to);

    let common = from_dir
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = vec!["..".to_string(); from_dir.len() - common];
    parts.extend(target[common..].iter().cloned());

    let joined = parts.join("/");
    if joined.starts_with("..") {
        joined
    } else {
        format!("./{}", joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{DeclarationBuilder, OutlineBuilder};
    use crate::hooks::Interceptor;
    use crate::model::Model;
    use crate::options::{CompilerOptions, RawOptions};
    use crate::resolver::ImportResolver;
    use crate::squeezer::Squeezer;
    use serde_json::json;
    use std::collections::{BTreeMap, BTreeSet};

    struct Fixture {
        options: RawOptions,
        squeeze: bool,
        language: OutputLanguage,
    }

    impl Default for Fixture {
        fn default() -> Self {
            Self {
                options: RawOptions::new(),
                squeeze: false,
                language: OutputLanguage::JavaScript,
            }
        }
    }

    impl Fixture {
        /// Generates the file at `target`, with `files` in final order.
        fn generate(&self, files: &[(&str, &str)], target: usize) -> (Result<Generated, GenerateError>, Option<Squeezer>) {
            let options = CompilerOptions::new(&self.options).unwrap();
            let sources: Vec<_> = files
                .iter()
                .map(|(_, text)| nyx_parser::parse(text).unwrap())
                .collect();

            let mut model = Model::new(1, Vec::new()).unwrap();
            let declarations: Vec<_> = files
                .iter()
                .zip(&sources)
                .map(|((path, _), source)| OutlineBuilder.build(path, source).unwrap())
                .collect();
            for declaration in &declarations {
                declaration.add_to_model(&mut model).unwrap();
            }

            let inputs: Vec<(&str, &[String])> = declarations
                .iter()
                .map(|d| (d.path.as_str(), d.imports.as_slice()))
                .collect();
            let tables = ImportResolver::new(&model).classify(&inputs);

            let squeezer = self
                .squeeze
                .then(|| Squeezer::new(&[], 0, 0, &BTreeSet::new()).unwrap());

            let result = ScriptGenerator.generate(GenerateRequest {
                path: files[target].0,
                source: &sources[target],
                imports: &tables[target],
                model: &model,
                squeezer: squeezer.as_ref(),
                options: &options,
                language: self.language,
            });
            (result, squeezer)
        }

        fn lines(&self, files: &[(&str, &str)], target: usize) -> Vec<String> {
            self.generate(files, target).0.unwrap().lines
        }
    }

    fn body(lines: &[String]) -> String {
        let joined = lines.join("\n");
        joined
            .strip_prefix(FILE_PROLOGUE)
            .and_then(|s| s.strip_suffix(FILE_EPILOGUE))
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_export_and_past_import() {
        let files = [
            ("a.nx", "export class A {}"),
            ("b.nx", "import { A };\nexport class B extends A {}"),
        ];
        let fixture = Fixture::default();

        assert_eq!(body(&fixture.lines(&files, 0)), "class A {} N$$_.$.N$i_A = A;");
        assert_eq!(
            body(&fixture.lines(&files, 1)),
            "const A = N$$_.$.N$i_A;\nclass B extends A {} N$$_.$.N$i_B = B;"
        );
    }

    #[test]
    fn test_future_import_is_deferred() {
        let files = [
            ("b.nx", "import { A };\nfunction make() { return new A(); }"),
            ("a.nx", "export class A {}"),
        ];
        let lines = Fixture::default().lines(&files, 0);
        assert_eq!(
            body(&lines),
            "\nfunction make() { return new N$$_.$.N$i_A(); }"
        );
    }

    #[test]
    fn test_line_count_is_preserved() {
        let files = [("a.nx", "import {\n  Missing\n};\nexport let x = 1\nlet y = x;\n")];
        let (result, _) = Fixture::default().generate(&files, 0);
        let generated = result.unwrap();
        assert_eq!(generated.lines.len(), files[0].1.split('\n').count());
        assert_eq!(generated.lines[3], "let x = 1; N$$_.$.N$i_x = x;");
        assert_eq!(generated.warnings[0].message, "Unknown import: \"Missing\"");
        assert_eq!(generated.warnings[0].line, Some(2));
    }

    #[test]
    fn test_runtime_members() {
        let files = [("a.nx", "import { Nyx };\nlet s = Nyx.noInitSymbol; Nyx.dispatchInit(this);")];
        let lines = Fixture::default().lines(&files, 0);
        assert_eq!(lines[1], "let s = N$$_.x; N$$_.i(this);})();");

        let files = [("a.nx", "import { Nyx };\nNyx.moo();")];
        let (result, _) = Fixture::default().generate(&files, 0);
        assert_eq!(
            result.unwrap_err(),
            GenerateError::at("Unknown runtime property: Nyx.moo", 2, 4)
        );
    }

    #[test]
    fn test_get_func_identifier() {
        let files = [("a.nx", "import { Nyx };\nlet id = Nyx.getFuncIdentifier(\"foo(a:_:)\");")];
        let lines = Fixture::default().lines(&files, 0);
        assert_eq!(lines[1], "let id = \"N$f_foo_a_\";})();");

        let fixture = Fixture::default();
        let files = [("a.nx", "import { Nyx };\nNyx.getFuncIdentifier(\"foo(_:)\");")];
        let err = fixture.generate(&files, 0).0.unwrap_err();
        assert_eq!(err.to_string(), "\"foo(_:)\" has no named arguments.");

        let files = [("a.nx", "import { Nyx };\nNyx.getFuncIdentifier(name);")];
        let err = fixture.generate(&files, 0).0.unwrap_err();
        assert_eq!(err.to_string(), "Invalid use of Nyx.getFuncIdentifier");
    }

    #[test]
    fn test_reserved_prefix() {
        let files = [("a.nx", "let N$x = 1;")];
        let err = Fixture::default().generate(&files, 0).0.unwrap_err();
        assert_eq!(err, GenerateError::at("Identifiers may not start with \"N$\"", 1, 4));
    }

    #[test]
    fn test_squeezes_members_keys_and_exports() {
        let source = "export class A {\n  constructor() { this.count = 0; }\n  increment() { return { count: this.count, step }; }\n}";
        let fixture = Fixture {
            squeeze: true,
            ..Fixture::default()
        };
        let (result, squeezer) = fixture.generate(&[("a.nx", source)], 0);
        let lines = result.unwrap().lines;
        let squeezer = squeezer.unwrap();

        let count = squeezer.lookup("count").unwrap();
        let increment = squeezer.lookup("increment").unwrap();
        let step = squeezer.lookup("step").unwrap();
        let export = squeezer.lookup("N$i_A").unwrap();

        assert!(lines[1].contains("constructor()"));
        assert!(lines[1].contains(&format!("this.{} = 0", count)));
        assert!(lines[2].contains(&format!("{}() {{ return {{ {}: this.{}, {}: step }}", increment, count, count, step)));
        assert!(lines[3].contains(&format!("N$$_.$.{} = A;", export)));
    }

    #[test]
    fn test_block_is_not_an_object() {
        let source = "function f(a) { if (a) { b: while (true) {} } return { a }; }";
        let fixture = Fixture {
            squeeze: true,
            ..Fixture::default()
        };
        let (result, squeezer) = fixture.generate(&[("a.nx", source)], 0);
        result.unwrap();
        let squeezer = squeezer.unwrap();
        assert!(squeezer.lookup("a").is_some());
        assert!(squeezer.lookup("b").is_none());
    }

    #[test]
    fn test_additional_globals() {
        let fixture = Fixture {
            options: RawOptions::new().set("additional-globals", json!({ "DEBUG": false, "NAME": "app" })),
            ..Fixture::default()
        };
        let lines = fixture.lines(&[("a.nx", "if (DEBUG) log(NAME, `${NAME}!`);")], 0);
        assert_eq!(body(&lines), "if (false) log(\"app\", `${\"app\"}!`);");

        let err = fixture.generate(&[("a.nx", "DEBUG = true;")], 0).0.unwrap_err();
        assert_eq!(err.to_string(), "Cannot use compiler-inlined \"DEBUG\" here");
    }

    #[test]
    fn test_interceptors() {
        let mut interceptors = BTreeMap::new();
        interceptors.insert(
            "upper".to_string(),
            Interceptor::new(|strings: &[String]| Ok(strings.iter().map(|s| s.to_uppercase()).collect())),
        );
        interceptors.insert("broken".to_string(), Interceptor::new(|_: &[String]| Ok(Vec::new())));
        interceptors.insert("failing".to_string(), Interceptor::new(|_: &[String]| Err("no".to_string())));

        let fixture = Fixture {
            options: RawOptions::new().set("interceptors", interceptors),
            ..Fixture::default()
        };

        let lines = fixture.lines(&[("a.nx", "let a = upper`abc`, b = upper`x${a}y`;")], 0);
        assert_eq!(body(&lines), "let a = \"ABC\", b = `X${a}Y`;");

        let err = fixture.generate(&[("a.nx", "broken`abc`;")], 0).0.unwrap_err();
        assert_eq!(err.to_string(), "Interceptor 'broken' string count mismatch. 0 vs. 1");

        let err = fixture.generate(&[("a.nx", "failing`abc`;")], 0).0.unwrap_err();
        assert!(matches!(err, GenerateError::Invalid { cause: Some(ref cause), .. } if cause == "no"));
    }

    #[test]
    fn test_typescript_output() {
        let files = [
            ("lib/a.nx", "export class A {}"),
            ("app/b.nx", "import { A, Nyx };\nexport class B extends A {}"),
        ];
        let fixture = Fixture {
            language: OutputLanguage::TypeScript,
            ..Fixture::default()
        };
        let lines = fixture.lines(&files, 1);
        assert_eq!(lines[0], "import { A } from \"../lib/a.nx\";");
        assert_eq!(lines[1], "export class B extends A {}");
    }

    #[test]
    fn test_relative_import() {
        assert_eq!(relative_import("a.nx", "b.nx"), "./b.nx");
        assert_eq!(relative_import("src/a.nx", "src/sub/b.nx"), "./sub/b.nx");
        assert_eq!(relative_import("src/x/a.nx", "lib/b.nx"), "../../lib/b.nx");
    }
}
