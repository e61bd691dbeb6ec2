//! Token types for the seqlang lexer.
//!
//! Defines [`TokenKind`] covering every lexeme of the language and
//! [`Token`], which pairs a kind with a source [`Span`].

use seqlang_types::Span;
use std::fmt;

/// The reserved words. They cannot be used as variable names.
pub const ALL_KEYWORDS: &[&str] = &["var", "out", "print", "map", "reduce"];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────

    /// Numeric literal, raw text kept for the evaluator: `42`, `3.5`, `1e-3`
    Number(String),
    /// String literal including its quotes and escapes: `"a\tb"`
    String(String),
    /// Variable name
    Identifier(String),

    // ── Keywords ─────────────────────────────────────────────

    Var,
    Out,
    Print,
    Map,
    Reduce,

    // ── Operators ────────────────────────────────────────────

    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    /// `=`
    Eq,
    /// `->`
    Arrow,

    // ── Punctuation ──────────────────────────────────────────

    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,

    Eof,
}

impl TokenKind {
    /// Map a word to its keyword token, if it is one.
    pub fn from_keyword(s: &str) -> Option<TokenKind> {
        Some(match s {
            "var" => TokenKind::Var,
            "out" => TokenKind::Out,
            "print" => TokenKind::Print,
            "map" => TokenKind::Map,
            "reduce" => TokenKind::Reduce,
            _ => return None,
        })
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Var | TokenKind::Out | TokenKind::Print | TokenKind::Map | TokenKind::Reduce
        )
    }

    /// Whether a token of this kind can begin an expression.
    pub fn starts_expression(&self) -> bool {
        matches!(
            self,
            TokenKind::Number(_)
                | TokenKind::Identifier(_)
                | TokenKind::LParen
                | TokenKind::LBrace
                | TokenKind::Map
                | TokenKind::Reduce
                | TokenKind::Plus
                | TokenKind::Minus
        )
    }

    /// Whether a token of this kind begins a statement keyword.
    pub fn starts_statement(&self) -> bool {
        matches!(self, TokenKind::Var | TokenKind::Out | TokenKind::Print)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(s) | TokenKind::String(s) | TokenKind::Identifier(s) => {
                f.write_str(s)
            }
            TokenKind::Var => f.write_str("var"),
            TokenKind::Out => f.write_str("out"),
            TokenKind::Print => f.write_str("print"),
            TokenKind::Map => f.write_str("map"),
            TokenKind::Reduce => f.write_str("reduce"),
            TokenKind::Plus => f.write_str("+"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Star => f.write_str("*"),
            TokenKind::Slash => f.write_str("/"),
            TokenKind::Caret => f.write_str("^"),
            TokenKind::Eq => f.write_str("="),
            TokenKind::Arrow => f.write_str("->"),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::LBrace => f.write_str("{"),
            TokenKind::RBrace => f.write_str("}"),
            TokenKind::Comma => f.write_str(","),
            TokenKind::Eof => f.write_str("<EOF>"),
        }
    }
}
