//! Evaluation error type.

use crate::cancel::Cancelled;
use seqlang_types::{Error, ErrorType, Span};

/// Why an evaluation did not produce a value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// A semantic error to report to the user; the program keeps running.
    #[error("{0}")]
    Failed(Error),
    /// The caller cancelled the run; aborts the whole compile.
    #[error("evaluation was cancelled")]
    Cancelled,
}

impl EvalError {
    /// A semantic error of `kind` covering `span`.
    pub fn semantic(kind: ErrorType, span: Span, expression: impl Into<String>) -> Self {
        Self::Failed(Error::semantic(kind, span, expression))
    }
}

impl From<Error> for EvalError {
    fn from(error: Error) -> Self {
        Self::Failed(error)
    }
}

impl From<Cancelled> for EvalError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;
