use crate::{Span, TokenPosition};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every kind of error the engine can report.
///
/// `SyntaxError` comes from the lexer/parser and carries the raw parser
/// message. All other kinds are produced by the evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    SyntaxError { message: String },

    // ── Variables & statements ──
    VariableRedeclaration,
    UndeclaredVariable,
    AssignmentMissingName,
    AssignmentMissingExpression,
    OutMissingExpression,
    TopLevelExpressionsUnsupported,

    // ── Arithmetic ──
    MissingOperand,
    MissingLeftOperand,
    MissingRightOperand,
    InvalidArithmeticOperand,
    InvalidArithmeticOperator,
    InvalidNumber,

    // ── Sequences ──
    SequenceStartIsNotInteger,
    SequenceStopIsNotInteger,
    SequenceInvalidBounds,
    SequenceTooLong,
    SequenceMissingStart,
    SequenceMissingStop,
    SequenceExpected,

    // ── map ──
    MapMissingSequence,
    MapMissingLambda,
    MapMissingLambdaId,
    MapMissingLambdaBody,
    MapLambdaReturnsNotNumber,

    // ── reduce ──
    ReduceMissingSequence,
    ReduceMissingNeutral,
    ReduceMissingLambda,
    ReduceMissingLambdaAccumulator,
    ReduceMissingLambdaNext,
    ReduceMissingLambdaBody,
    ReduceNeutralIsNotNumber,
    ReduceLambdaReturnsNotNumber,

    UnsupportedExpression,
}

impl ErrorType {
    /// Human-readable sentence for this kind, embedding the offending snippet.
    pub fn describe(&self, expr: &str) -> String {
        match self {
            Self::SyntaxError { message } => message.clone(),
            Self::VariableRedeclaration => format!("variable is already declared in '{expr}'"),
            Self::UndeclaredVariable => format!("undeclared variable '{expr}'"),
            Self::AssignmentMissingName => format!("missing variable name in '{expr}'"),
            Self::AssignmentMissingExpression => format!("missing assigned expression in '{expr}'"),
            Self::OutMissingExpression => format!("missing expression to output in '{expr}'"),
            Self::TopLevelExpressionsUnsupported => format!(
                "top-level expression '{expr}' is not supported, use 'out' to print its value"
            ),
            Self::MissingOperand => format!("missing operand in '{expr}'"),
            Self::MissingLeftOperand => format!("missing left operand in '{expr}'"),
            Self::MissingRightOperand => format!("missing right operand in '{expr}'"),
            Self::InvalidArithmeticOperand => {
                format!("arithmetic operand '{expr}' is a sequence, expected a number")
            }
            Self::InvalidArithmeticOperator => format!("invalid arithmetic operator '{expr}'"),
            Self::InvalidNumber => format!("invalid number '{expr}'"),
            Self::SequenceStartIsNotInteger => format!("sequence start '{expr}' is not an integer"),
            Self::SequenceStopIsNotInteger => format!("sequence stop '{expr}' is not an integer"),
            Self::SequenceInvalidBounds => {
                format!("sequence '{expr}' has invalid bounds, start is greater than stop")
            }
            Self::SequenceTooLong => format!("sequence '{expr}' has too many elements"),
            Self::SequenceMissingStart => format!("missing start in sequence '{expr}'"),
            Self::SequenceMissingStop => format!("missing stop in sequence '{expr}'"),
            Self::SequenceExpected => format!("expected a sequence, got '{expr}'"),
            Self::MapMissingSequence => format!("missing sequence in '{expr}'"),
            Self::MapMissingLambda => format!("missing lambda in '{expr}'"),
            Self::MapMissingLambdaId => format!("missing lambda parameter in '{expr}'"),
            Self::MapMissingLambdaBody => format!("missing lambda body in '{expr}'"),
            Self::MapLambdaReturnsNotNumber => {
                format!("map lambda '{expr}' must return a number")
            }
            Self::ReduceMissingSequence => format!("missing sequence in '{expr}'"),
            Self::ReduceMissingNeutral => format!("missing neutral element in '{expr}'"),
            Self::ReduceMissingLambda => format!("missing lambda in '{expr}'"),
            Self::ReduceMissingLambdaAccumulator => {
                format!("missing accumulator parameter in '{expr}'")
            }
            Self::ReduceMissingLambdaNext => format!("missing next-element parameter in '{expr}'"),
            Self::ReduceMissingLambdaBody => format!("missing lambda body in '{expr}'"),
            Self::ReduceNeutralIsNotNumber => {
                format!("reduce neutral element '{expr}' is not a number")
            }
            Self::ReduceLambdaReturnsNotNumber => {
                format!("reduce lambda '{expr}' must return a number")
            }
            Self::UnsupportedExpression => format!("unsupported expression '{expr}'"),
        }
    }
}

/// A positioned error from either the syntax or the semantic phase.
///
/// Immutable once created. `stop` is `None` for syntax errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Error {
    pub start: TokenPosition,
    pub stop: Option<TokenPosition>,
    /// The offending source text, verbatim.
    pub expression: String,
    #[serde(rename = "type")]
    pub kind: ErrorType,
}

impl Error {
    /// A syntax error reported by the lexer or parser.
    pub fn syntax(
        start: TokenPosition,
        expression: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            start,
            stop: None,
            expression: expression.into(),
            kind: ErrorType::SyntaxError {
                message: message.into(),
            },
        }
    }

    /// A semantic error covering `span`.
    pub fn semantic(kind: ErrorType, span: Span, expression: impl Into<String>) -> Self {
        Self {
            start: span.start,
            stop: Some(span.stop),
            expression: expression.into(),
            kind,
        }
    }

    /// Whether this error came from the parser.
    pub fn is_syntax(&self) -> bool {
        matches!(self.kind, ErrorType::SyntaxError { .. })
    }

    /// The human-readable sentence, without position prefix.
    pub fn message(&self) -> String {
        self.kind.describe(&self.expression)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}:{}: {}.",
            self.start.line,
            self.start.position_in_line,
            self.message()
        )
    }
}

impl std::error::Error for Error {}

/// Merge syntax and semantic errors into one list ordered by start position.
///
/// The sort is stable: errors at the same position keep their input order,
/// syntax errors first.
pub fn merge_errors(syntax: Vec<Error>, semantic: Vec<Error>) -> Vec<Error> {
    let mut all = syntax;
    all.extend(semantic);
    all.sort_by_key(|e| (e.start.line, e.start.position_in_line));
    all
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(line: u32, col: u32) -> Span {
        let p = TokenPosition::new(line, col);
        Span::token(p, 0, 0)
    }

    #[test]
    fn test_display_format() {
        let err = Error::semantic(ErrorType::UndeclaredVariable, span(3, 4), "x");
        assert_eq!(err.to_string(), "line 3:4: undeclared variable 'x'.");
    }

    #[test]
    fn test_syntax_error_has_no_stop() {
        let err = Error::syntax(TokenPosition::new(1, 0), ")", "extraneous input ')'");
        assert!(err.is_syntax());
        assert_eq!(err.stop, None);
        assert_eq!(err.to_string(), "line 1:0: extraneous input ')'.");
    }

    #[test]
    fn test_every_semantic_message_embeds_snippet() {
        let kinds = [
            ErrorType::VariableRedeclaration,
            ErrorType::UndeclaredVariable,
            ErrorType::AssignmentMissingName,
            ErrorType::AssignmentMissingExpression,
            ErrorType::OutMissingExpression,
            ErrorType::TopLevelExpressionsUnsupported,
            ErrorType::MissingOperand,
            ErrorType::MissingLeftOperand,
            ErrorType::MissingRightOperand,
            ErrorType::InvalidArithmeticOperand,
            ErrorType::InvalidArithmeticOperator,
            ErrorType::InvalidNumber,
            ErrorType::SequenceStartIsNotInteger,
            ErrorType::SequenceStopIsNotInteger,
            ErrorType::SequenceInvalidBounds,
            ErrorType::SequenceTooLong,
            ErrorType::SequenceMissingStart,
            ErrorType::SequenceMissingStop,
            ErrorType::SequenceExpected,
            ErrorType::MapMissingSequence,
            ErrorType::MapMissingLambda,
            ErrorType::MapMissingLambdaId,
            ErrorType::MapMissingLambdaBody,
            ErrorType::MapLambdaReturnsNotNumber,
            ErrorType::ReduceMissingSequence,
            ErrorType::ReduceMissingNeutral,
            ErrorType::ReduceMissingLambda,
            ErrorType::ReduceMissingLambdaAccumulator,
            ErrorType::ReduceMissingLambdaNext,
            ErrorType::ReduceMissingLambdaBody,
            ErrorType::ReduceNeutralIsNotNumber,
            ErrorType::ReduceLambdaReturnsNotNumber,
            ErrorType::UnsupportedExpression,
        ];
        for kind in kinds {
            let msg = kind.describe("{1, 2} + q");
            assert!(msg.contains("{1, 2} + q"), "{kind:?} drops the snippet: {msg}");
        }
    }

    #[test]
    fn test_merge_sorts_by_position() {
        let syntax = vec![
            Error::syntax(TokenPosition::new(3, 1), "a", "bad a"),
            Error::syntax(TokenPosition::new(1, 7), "b", "bad b"),
        ];
        let semantic = vec![
            Error::semantic(ErrorType::UndeclaredVariable, span(2, 0), "c"),
            Error::semantic(ErrorType::InvalidNumber, span(1, 2), "d"),
        ];
        let merged = merge_errors(syntax, semantic);
        let order: Vec<_> = merged.iter().map(|e| e.expression.as_str()).collect();
        assert_eq!(order, ["d", "b", "c", "a"]);
    }

    #[test]
    fn test_merge_is_stable_for_equal_positions() {
        let syntax = vec![Error::syntax(TokenPosition::new(1, 4), "s", "bad")];
        let semantic = vec![
            Error::semantic(ErrorType::MissingRightOperand, span(1, 4), "first"),
            Error::semantic(ErrorType::InvalidNumber, span(1, 4), "second"),
        ];
        let merged = merge_errors(syntax, semantic);
        let order: Vec<_> = merged.iter().map(|e| e.expression.as_str()).collect();
        assert_eq!(order, ["s", "first", "second"]);
    }

    #[test]
    fn test_error_json_serialization() {
        let err = Error::semantic(ErrorType::SequenceInvalidBounds, span(1, 4), "{5,1}");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"type\":\"SequenceInvalidBounds\""));
        assert!(json.contains("\"position_in_line\":4"));
        let back: Error = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_error_determinism_100_iterations() {
        let make = || Error::semantic(ErrorType::SequenceTooLong, span(12, 5), "{0, 1000000000}");
        let first = serde_json::to_string(&make()).unwrap();
        for i in 0..100 {
            let json = serde_json::to_string(&make()).unwrap();
            assert_eq!(first, json, "Determinism failure at iteration {i}");
        }
    }
}
