//! seqlang parser: converts a token stream into an AST.
//!
//! The parser never gives up on a program. Statements it cannot fully
//! parse are kept with their missing parts set to `None`, and every
//! problem is reported as a syntax [`Error`](seqlang_types::Error).

mod parse_expr;
mod parse_stmt;
mod parser;

pub use parser::{parse, ParseResult, Parser};
