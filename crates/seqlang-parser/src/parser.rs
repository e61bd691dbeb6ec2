//! Core parser infrastructure: token cursor, error reporting, helpers.

use seqlang_lexer::token::{Token, TokenKind};
use seqlang_lexer::Lexer;
use seqlang_types::ast::{Ident, Program};
use seqlang_types::{Error, Span};

/// Maximum nesting depth of parenthesized / bracketed expressions.
pub(crate) const MAX_EXPR_DEPTH: u32 = 256;

/// The seqlang parser.
///
/// Consumes a token stream produced by the lexer and builds an AST,
/// collecting syntax errors and recovering where possible.
pub struct Parser<'src> {
    tokens: Vec<Token>,
    pos: usize,
    /// Source text, for the verbatim `text` of tree nodes.
    source: &'src str,
    errors: Vec<Error>,
    /// Current expression nesting depth.
    pub(crate) expr_depth: u32,
}

/// Result of parsing: always a program, plus the syntax errors found.
#[derive(Debug)]
pub struct ParseResult {
    pub program: Program,
    pub errors: Vec<Error>,
}

/// Lex and parse `source` in one go. Lexer errors come first.
pub fn parse(source: &str) -> ParseResult {
    let lexed = Lexer::new(source).lex();
    let mut result = Parser::new(lexed.tokens, source).parse();
    let mut errors = lexed.errors;
    errors.append(&mut result.errors);
    result.errors = errors;
    result
}

impl<'src> Parser<'src> {
    /// Create a new parser from a token stream and its source text.
    pub fn new(mut tokens: Vec<Token>, source: &'src str) -> Self {
        if !matches!(tokens.last(), Some(t) if t.kind == TokenKind::Eof) {
            let end = source.len();
            let at = tokens.last().map(|t| t.span.start).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, Span::point(at, end)));
        }
        Self {
            tokens,
            pos: 0,
            source,
            errors: Vec::new(),
            expr_depth: 0,
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    /// Returns the current token without advancing.
    pub(crate) fn peek(&self) -> &Token {
        let idx = self.pos.min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// Advance the cursor by one and return the consumed token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    /// Span of the previously consumed token.
    pub(crate) fn previous_span(&self) -> Span {
        match self.pos.checked_sub(1) {
            Some(idx) => self.tokens[idx].span,
            None => self.peek().span,
        }
    }

    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Source text between the start of `start` and the end of the last
    /// consumed token.
    pub(crate) fn text_since(&self, start: Span) -> (Span, String) {
        let span = start.merge(self.previous_span());
        (span, self.slice(span).to_string())
    }

    pub(crate) fn slice(&self, span: Span) -> &'src str {
        self.source.get(span.offset..span.end).unwrap_or("")
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    /// Expect a specific token kind; reports `missing '<kind>'` if absent.
    pub(crate) fn expect(&mut self, expected: &TokenKind) -> bool {
        if self.eat(expected) {
            true
        } else {
            self.error_at_current(format!("missing '{expected}' at '{}'", self.peek_kind()));
            false
        }
    }

    /// Take an identifier if one is next, reporting `missing <what>` if not.
    pub(crate) fn expect_identifier(&mut self, what: &str) -> Option<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Some(Ident::new(name, span))
            }
            _ => {
                self.error_at_current(format!("missing {what} at '{}'", self.peek_kind()));
                None
            }
        }
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    /// Report an error at the current token.
    ///
    /// A second error at the same position as the previous one is dropped,
    /// so a single bad token does not cascade into a list of complaints.
    pub(crate) fn error_at_current(&mut self, message: impl Into<String>) {
        let token = self.peek();
        let start = token.span.start;
        if self.errors.last().is_some_and(|e| e.start == start) {
            return;
        }
        let expression = token.kind.to_string();
        self.errors.push(Error::syntax(start, expression, message));
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the token stream into a `Program`.
    pub fn parse(mut self) -> ParseResult {
        let program = self.parse_program();
        ParseResult {
            program,
            errors: self.errors,
        }
    }

    fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();
        while !self.at_end() {
            let before = self.pos;
            if let Some(stmt) = self.parse_statement() {
                statements.push(stmt);
            }
            if self.pos == before {
                self.error_at_current(format!("extraneous input '{}'", self.peek_kind()));
                self.advance();
            }
        }
        Program { statements }
    }
}
