//! Core seqlang lexer: converts source text to a token stream.
//!
//! - Whitespace, newlines included, only separates tokens
//! - Number literals keep their raw text; the evaluator decides whether
//!   they parse as integer or real
//! - String literals keep their quotes and escapes; `print` processes them
//! - Error recovery: unknown characters and unterminated strings are
//!   reported and skipped, lexing continues

use seqlang_types::{Error, Span, TokenPosition};

use crate::token::{Token, TokenKind};

/// The seqlang lexer.
pub struct Lexer<'src> {
    source: &'src str,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current character column (0-based).
    col: u32,
    errors: Vec<Error>,
}

/// Result of lexing: tokens + any errors collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    pub errors: Vec<Error>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            col: 0,
            errors: Vec::new(),
        }
    }

    /// Lex the entire source into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();
        loop {
            let token = self.scan();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn advance_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.advance();
        }
    }

    fn position(&self) -> TokenPosition {
        TokenPosition::new(self.line, self.col)
    }

    fn token_from(&self, kind: TokenKind, start: TokenPosition, offset: usize) -> Token {
        Token::new(kind, Span::token(start, offset, self.pos))
    }

    // ─────────────────────────────────────────────────────────────
    // Scanning
    // ─────────────────────────────────────────────────────────────

    fn scan(&mut self) -> Token {
        loop {
            if let Some(token) = self.scan_one() {
                return token;
            }
        }
    }

    /// Scan one token; `None` means something was skipped with an error.
    fn scan_one(&mut self) -> Option<Token> {
        self.advance_while(char::is_whitespace);

        let start = self.position();
        let offset = self.pos;
        let Some(ch) = self.advance() else {
            return Some(Token::new(TokenKind::Eof, Span::point(start, offset)));
        };

        let kind = match ch {
            '"' => self.scan_string(start, offset)?,
            '0'..='9' => self.scan_number(offset),
            'a'..='z' | 'A'..='Z' | '_' => {
                self.advance_while(|c| c.is_ascii_alphanumeric() || c == '_');
                let word = &self.source[offset..self.pos];
                TokenKind::from_keyword(word)
                    .unwrap_or_else(|| TokenKind::Identifier(word.to_string()))
            }
            '+' => TokenKind::Plus,
            '-' => {
                if self.peek() == Some('>') {
                    self.advance();
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '^' => TokenKind::Caret,
            '=' => TokenKind::Eq,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            other => {
                self.errors.push(Error::syntax(
                    start,
                    other.to_string(),
                    format!("token recognition error at: '{other}'"),
                ));
                return None;
            }
        };
        Some(self.token_from(kind, start, offset))
    }

    /// `digit+ ('.' digit*)? ([eE] [+-]? digit*)?`. The first digit is
    /// already consumed.
    fn scan_number(&mut self, offset: usize) -> TokenKind {
        self.advance_while(|c| c.is_ascii_digit());
        if self.peek() == Some('.') {
            self.advance();
            self.advance_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.advance();
            if matches!(self.peek(), Some('+' | '-'))
                && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())
            {
                self.advance();
            }
            self.advance_while(|c| c.is_ascii_digit());
        }
        TokenKind::Number(self.source[offset..self.pos].to_string())
    }

    /// Scan a string literal; the opening quote is already consumed.
    ///
    /// Returns `None` (after reporting) if the literal is not closed on the
    /// same line.
    fn scan_string(&mut self, start: TokenPosition, offset: usize) -> Option<TokenKind> {
        loop {
            match self.peek() {
                None | Some('\n') => {
                    let text = &self.source[offset..self.pos];
                    self.errors.push(Error::syntax(
                        start,
                        text,
                        format!("token recognition error at: '{text}'"),
                    ));
                    return None;
                }
                Some('\\') => {
                    self.advance();
                    if self.peek().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                }
                Some('"') => {
                    self.advance();
                    return Some(TokenKind::String(self.source[offset..self.pos].to_string()));
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }
}
