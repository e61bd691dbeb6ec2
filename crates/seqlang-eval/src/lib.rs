//! seqlang evaluator.
//!
//! Walks the AST produced by `seqlang-parser` and produces values. `map` and
//! `reduce` over sequences are split into contiguous chunks and run on a
//! rayon pool owned by [`SequenceEngine`].

mod cancel;
mod context;
mod error;
mod evaluator;
pub mod format;
mod parallel;
mod value;

pub use cancel::{Cancelled, CancellationToken};
pub use context::EvalContext;
pub use error::{EvalError, EvalResult};
pub use evaluator::Evaluator;
pub use parallel::SequenceEngine;
pub use value::{ArithOp, Num, Seq, SeqIter, Var};
