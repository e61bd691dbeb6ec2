//! Shared types for the seqlang engine.
//!
//! This crate defines the AST node types, source positions, the unified
//! error taxonomy, and other shared data structures used by the lexer,
//! parser, evaluator and compiler.

mod error;
mod span;
mod stack;
pub mod ast;

pub use error::{merge_errors, Error, ErrorType};
pub use span::{SourceFile, Span, TokenPosition};
pub use stack::ensure_sufficient_stack;

/// Largest allowed `hi - lo` of a `{lo, hi}` sequence literal.
pub const MAX_SEQUENCE_LENGTH: u64 = 200_000_000;
