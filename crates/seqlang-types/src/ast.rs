//! AST node types for the seqlang language.
//!
//! Every node carries a [`Span`] and, where errors may point at it, the
//! verbatim source `text` it was parsed from.
//!
//! The parser is error-tolerant: children it could not parse are `None`
//! instead of aborting the whole statement, so the evaluator can report
//! exactly which part is missing.

use crate::Span;

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A complete program: top-level statements in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `var name = expr`
    Var(VarStmt),
    /// `out expr`
    Out(OutStmt),
    /// `print "text"`
    Print(PrintStmt),
    /// A bare expression; always rejected by the evaluator.
    Expr(Expr),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Var(s) => s.span,
            Stmt::Out(s) => s.span,
            Stmt::Print(s) => s.span,
            Stmt::Expr(e) => e.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarStmt {
    pub name: Option<Ident>,
    pub value: Option<Expr>,
    pub span: Span,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutStmt {
    pub expr: Option<Expr>,
    pub span: Span,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrintStmt {
    /// The raw string token, quotes and escapes included.
    pub literal: Option<String>,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub text: String,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span, text: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Raw numeric literal text, e.g. `42`, `3.5`, `1e-3`.
    Number(String),
    Identifier(String),
    Paren(Box<Expr>),
    /// `{start, stop}`
    Sequence {
        start: Option<Box<Expr>>,
        stop: Option<Box<Expr>>,
    },
    /// `map(sequence, param -> body)`
    Map {
        sequence: Option<Box<Expr>>,
        lambda: Option<MapLambda>,
    },
    /// `reduce(sequence, neutral, acc next -> body)`
    Reduce {
        sequence: Option<Box<Expr>>,
        neutral: Option<Box<Expr>>,
        lambda: Option<ReduceLambda>,
    },
    Binary {
        left: Option<Box<Expr>>,
        op: Operator,
        right: Option<Box<Expr>>,
    },
    Unary {
        op: Operator,
        operand: Option<Box<Expr>>,
    },
    /// Placeholder the parser leaves where it skipped something that is
    /// not an expression (e.g. a string literal outside `print`).
    Invalid,
}

/// An operator token as written in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    pub symbol: String,
    pub span: Span,
}

impl Operator {
    pub fn new(symbol: impl Into<String>, span: Span) -> Self {
        Self {
            symbol: symbol.into(),
            span,
        }
    }
}

/// `param -> body`
#[derive(Debug, Clone, PartialEq)]
pub struct MapLambda {
    pub param: Option<Ident>,
    pub body: Option<Box<Expr>>,
    pub span: Span,
    pub text: String,
}

/// `accumulator next -> body`
#[derive(Debug, Clone, PartialEq)]
pub struct ReduceLambda {
    pub accumulator: Option<Ident>,
    pub next: Option<Ident>,
    pub body: Option<Box<Expr>>,
    pub span: Span,
    pub text: String,
}
