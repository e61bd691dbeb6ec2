//! Core expression evaluator.

use crate::cancel::CancellationToken;
use crate::context::EvalContext;
use crate::error::{EvalError, EvalResult};
use crate::parallel::SequenceEngine;
use crate::value::{ArithOp, Num, Seq, Var};
use seqlang_types::ast::*;
use seqlang_types::{ensure_sufficient_stack, ErrorType, MAX_SEQUENCE_LENGTH};

/// Walks expression trees and produces values.
///
/// Holds no mutable state: bindings live in the [`EvalContext`] passed to
/// every call, so the same evaluator is shared by all workers of a parallel
/// `map` or `reduce`.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'e> {
    engine: &'e SequenceEngine,
    cancel: &'e CancellationToken,
    /// Largest allowed `stop - start` of a sequence literal.
    max_sequence_length: u64,
}

impl<'e> Evaluator<'e> {
    pub fn new(engine: &'e SequenceEngine, cancel: &'e CancellationToken) -> Self {
        Self {
            engine,
            cancel,
            max_sequence_length: MAX_SEQUENCE_LENGTH,
        }
    }

    pub fn with_max_sequence_length(mut self, limit: u64) -> Self {
        self.max_sequence_length = limit;
        self
    }

    /// Poll for cancellation.
    fn tick(&self) -> EvalResult<()> {
        Ok(self.cancel.check()?)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expression evaluation
    // ══════════════════════════════════════════════════════════════════════

    /// Evaluate an expression to a value.
    ///
    /// Recursion depth follows the tree, so long operator chains grow the
    /// stack on demand.
    pub fn eval_expr(&self, expr: &Expr, ctx: &EvalContext) -> EvalResult<Var> {
        ensure_sufficient_stack(|| self.eval_node(expr, ctx))
    }

    fn eval_node(&self, expr: &Expr, ctx: &EvalContext) -> EvalResult<Var> {
        self.tick()?;
        match &expr.kind {
            ExprKind::Number(raw) => eval_number(raw, expr),
            ExprKind::Identifier(name) => ctx
                .get(name)
                .cloned()
                .ok_or_else(|| error_at(ErrorType::UndeclaredVariable, expr)),
            ExprKind::Paren(inner) => self.eval_expr(inner, ctx),
            ExprKind::Sequence { start, stop } => {
                self.eval_sequence(expr, start.as_deref(), stop.as_deref(), ctx)
            }
            ExprKind::Map { sequence, lambda } => {
                self.eval_map(expr, sequence.as_deref(), lambda.as_ref(), ctx)
            }
            ExprKind::Reduce {
                sequence,
                neutral,
                lambda,
            } => self.eval_reduce(
                expr,
                sequence.as_deref(),
                neutral.as_deref(),
                lambda.as_ref(),
                ctx,
            ),
            ExprKind::Binary { left, op, right } => {
                self.eval_binary(expr, left.as_deref(), op, right.as_deref(), ctx)
            }
            ExprKind::Unary { op, operand } => self.eval_unary(expr, op, operand.as_deref(), ctx),
            ExprKind::Invalid => Err(error_at(ErrorType::UnsupportedExpression, expr)),
        }
    }

    // ── Arithmetic ───────────────────────────────────────────────────────

    fn eval_binary(
        &self,
        expr: &Expr,
        left: Option<&Expr>,
        op: &Operator,
        right: Option<&Expr>,
        ctx: &EvalContext,
    ) -> EvalResult<Var> {
        let left = left.ok_or_else(|| error_at(ErrorType::MissingLeftOperand, expr))?;
        let right = right.ok_or_else(|| error_at(ErrorType::MissingRightOperand, expr))?;
        let lhs = self.eval_operand(left, ctx)?;
        let rhs = self.eval_operand(right, ctx)?;
        let op = ArithOp::from_symbol(&op.symbol).ok_or_else(|| invalid_operator(op))?;
        Ok(Var::Num(lhs.apply(op, rhs)))
    }

    fn eval_unary(
        &self,
        expr: &Expr,
        op: &Operator,
        operand: Option<&Expr>,
        ctx: &EvalContext,
    ) -> EvalResult<Var> {
        let operand = operand.ok_or_else(|| error_at(ErrorType::MissingOperand, expr))?;
        let value = self.eval_operand(operand, ctx)?;
        match op.symbol.as_str() {
            "-" => Ok(Var::Num(value.neg())),
            "+" => Ok(Var::Num(value)),
            _ => Err(invalid_operator(op)),
        }
    }

    /// Evaluate an arithmetic operand, which must be a number.
    fn eval_operand(&self, operand: &Expr, ctx: &EvalContext) -> EvalResult<Num> {
        match self.eval_expr(operand, ctx)? {
            Var::Num(n) => Ok(n),
            Var::Seq(_) => Err(error_at(ErrorType::InvalidArithmeticOperand, operand)),
        }
    }

    // ── Sequences ────────────────────────────────────────────────────────

    fn eval_sequence(
        &self,
        expr: &Expr,
        start: Option<&Expr>,
        stop: Option<&Expr>,
        ctx: &EvalContext,
    ) -> EvalResult<Var> {
        let start = start.ok_or_else(|| error_at(ErrorType::SequenceMissingStart, expr))?;
        let stop = stop.ok_or_else(|| error_at(ErrorType::SequenceMissingStop, expr))?;
        let from = self.eval_bound(start, ErrorType::SequenceStartIsNotInteger, ctx)?;
        let to = self.eval_bound(stop, ErrorType::SequenceStopIsNotInteger, ctx)?;
        if from > to {
            return Err(error_at(ErrorType::SequenceInvalidBounds, expr));
        }
        if i128::from(to) - i128::from(from) > i128::from(self.max_sequence_length) {
            return Err(error_at(ErrorType::SequenceTooLong, expr));
        }
        Ok(Var::Seq(Seq::range(from, to)))
    }

    fn eval_bound(&self, bound: &Expr, kind: ErrorType, ctx: &EvalContext) -> EvalResult<i64> {
        match self.eval_expr(bound, ctx)? {
            Var::Num(Num::Integer(i)) => Ok(i),
            _ => Err(error_at(kind, bound)),
        }
    }

    /// Evaluate the sequence argument of `map` / `reduce`.
    fn eval_sequence_arg(&self, arg: &Expr, ctx: &EvalContext) -> EvalResult<Seq> {
        match self.eval_expr(arg, ctx)? {
            Var::Seq(seq) => Ok(seq),
            Var::Num(_) => Err(error_at(ErrorType::SequenceExpected, arg)),
        }
    }

    // ── map / reduce ─────────────────────────────────────────────────────

    fn eval_map(
        &self,
        expr: &Expr,
        sequence: Option<&Expr>,
        lambda: Option<&MapLambda>,
        ctx: &EvalContext,
    ) -> EvalResult<Var> {
        let sequence = sequence.ok_or_else(|| error_at(ErrorType::MapMissingSequence, expr))?;
        let lambda = lambda.ok_or_else(|| error_at(ErrorType::MapMissingLambda, expr))?;
        let lambda_error = |kind| EvalError::semantic(kind, lambda.span, lambda.text.clone());
        let param = lambda
            .param
            .as_ref()
            .ok_or_else(|| lambda_error(ErrorType::MapMissingLambdaId))?;
        let body = lambda
            .body
            .as_deref()
            .ok_or_else(|| lambda_error(ErrorType::MapMissingLambdaBody))?;

        let seq = self.eval_sequence_arg(sequence, ctx)?;
        check_params(ctx, &[param])?;

        let mapped = self.engine.map(
            &seq,
            |element| {
                let scope = bind(ctx, [(param, element)])?;
                match self.eval_expr(body, &scope)? {
                    Var::Num(n) => Ok(n),
                    Var::Seq(_) => Err(error_at(ErrorType::MapLambdaReturnsNotNumber, body)),
                }
            },
            self.cancel,
        )?;
        Ok(Var::Seq(mapped))
    }

    fn eval_reduce(
        &self,
        expr: &Expr,
        sequence: Option<&Expr>,
        neutral: Option<&Expr>,
        lambda: Option<&ReduceLambda>,
        ctx: &EvalContext,
    ) -> EvalResult<Var> {
        let sequence = sequence.ok_or_else(|| error_at(ErrorType::ReduceMissingSequence, expr))?;
        let neutral = neutral.ok_or_else(|| error_at(ErrorType::ReduceMissingNeutral, expr))?;
        let lambda = lambda.ok_or_else(|| error_at(ErrorType::ReduceMissingLambda, expr))?;
        let lambda_error = |kind| EvalError::semantic(kind, lambda.span, lambda.text.clone());
        let acc = lambda
            .accumulator
            .as_ref()
            .ok_or_else(|| lambda_error(ErrorType::ReduceMissingLambdaAccumulator))?;
        let next = lambda
            .next
            .as_ref()
            .ok_or_else(|| lambda_error(ErrorType::ReduceMissingLambdaNext))?;
        let body = lambda
            .body
            .as_deref()
            .ok_or_else(|| lambda_error(ErrorType::ReduceMissingLambdaBody))?;

        let seq = self.eval_sequence_arg(sequence, ctx)?;
        let start = match self.eval_expr(neutral, ctx)? {
            Var::Num(n) => n,
            Var::Seq(_) => return Err(error_at(ErrorType::ReduceNeutralIsNotNumber, neutral)),
        };
        check_params(ctx, &[acc, next])?;

        let folded = self.engine.reduce(
            &seq,
            start,
            |a, element| {
                let scope = bind(ctx, [(acc, Var::Num(a)), (next, element)])?;
                match self.eval_expr(body, &scope)? {
                    Var::Num(n) => Ok(n),
                    Var::Seq(_) => Err(error_at(ErrorType::ReduceLambdaReturnsNotNumber, body)),
                }
            },
            self.cancel,
        )?;
        Ok(Var::Num(folded))
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════

fn error_at(kind: ErrorType, expr: &Expr) -> EvalError {
    EvalError::semantic(kind, expr.span, expr.text.clone())
}

fn invalid_operator(op: &Operator) -> EvalError {
    EvalError::semantic(ErrorType::InvalidArithmeticOperator, op.span, op.symbol.clone())
}

fn redeclared(param: &Ident) -> EvalError {
    EvalError::semantic(ErrorType::VariableRedeclaration, param.span, param.name.clone())
}

/// Integer if the literal fits an `i64`, otherwise a double.
fn eval_number(raw: &str, expr: &Expr) -> EvalResult<Var> {
    if let Ok(i) = raw.parse::<i64>() {
        return Ok(Var::Num(Num::Integer(i)));
    }
    raw.parse::<f64>()
        .map(|r| Var::Num(Num::Real(r)))
        .map_err(|_| error_at(ErrorType::InvalidNumber, expr))
}

/// Lambda parameters must not shadow a binding or repeat each other.
fn check_params(ctx: &EvalContext, params: &[&Ident]) -> EvalResult<()> {
    for (i, param) in params.iter().enumerate() {
        if ctx.contains(&param.name) || params[..i].iter().any(|p| p.name == param.name) {
            return Err(redeclared(param));
        }
    }
    Ok(())
}

/// Fork `ctx` with the lambda parameters bound.
fn bind<const N: usize>(ctx: &EvalContext, params: [(&Ident, Var); N]) -> EvalResult<EvalContext> {
    let mut scope = ctx.clone();
    for (param, value) in params {
        scope = scope
            .extend([(param.name.clone(), value)])
            .map_err(|_| redeclared(param))?;
    }
    Ok(scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use seqlang_types::TokenPosition;

    /// Evaluate the expression of `out <source>` on a fresh context.
    fn eval_with(source: &str, engine: &SequenceEngine) -> EvalResult<Var> {
        let parsed = seqlang_parser::parse(&format!("out {source}"));
        assert!(parsed.errors.is_empty(), "syntax errors: {:?}", parsed.errors);
        let Some(Stmt::Out(OutStmt { expr: Some(expr), .. })) =
            parsed.program.statements.into_iter().next()
        else {
            panic!("expected an out statement");
        };
        let cancel = CancellationToken::new();
        Evaluator::new(engine, &cancel).eval_expr(&expr, &EvalContext::new())
    }

    fn eval(source: &str) -> EvalResult<Var> {
        eval_with(source, &SequenceEngine::sequential())
    }

    fn show(source: &str) -> String {
        match eval(source) {
            Ok(v) => v.to_string(),
            Err(e) => panic!("evaluation of {source:?} failed: {e}"),
        }
    }

    fn error_kind(source: &str) -> ErrorType {
        match eval(source) {
            Err(EvalError::Failed(e)) => e.kind,
            other => panic!("expected an error from {source:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(show("2 + 3 * 4"), "14");
        assert_eq!(show("(2 + 3) * 4"), "20");
        assert_eq!(show("7 / 2"), "3.5");
        assert_eq!(show("2 ^ 3 ^ 2"), "512");
        assert_eq!(show("-2 ^ 2"), "-4");
        assert_eq!(show("0 ^ 0"), "1");
        assert_eq!(show("0 ^ (-1)"), "Infinity");
        assert_eq!(show("1 / 0"), "Infinity");
        assert_eq!(show("0 / 0"), "NaN");
        assert_eq!(show("+5"), "5");
    }

    #[test]
    fn test_number_literals() {
        assert_eq!(show("2.5"), "2.5");
        assert_eq!(show("1e3"), "1000");
        assert_eq!(eval("1e3"), Ok(Var::Num(Num::Real(1000.0))));
        assert_eq!(eval("99999999999999999999"), Ok(Var::Num(Num::Real(1e20))));
        assert_eq!(error_kind("1e"), ErrorType::InvalidNumber);
    }

    #[test]
    fn test_sequences() {
        assert_eq!(show("{1, 5}"), "{ 1, 2, 3, 4, 5 }");
        assert_eq!(show("{3, 3}"), "{ 3 }");
        assert_eq!(show("map({1, 4}, x -> x * x)"), "{ 1, 4, 9, 16 }");
        assert_eq!(show("reduce({1, 5}, 0, a b -> a + b)"), "15");
        assert_eq!(show("reduce(map({1, 3}, x -> x / 2), 0, a b -> a + b)"), "3");
    }

    #[test]
    fn test_sequence_errors() {
        assert_eq!(error_kind("{5, 1}"), ErrorType::SequenceInvalidBounds);
        assert_eq!(error_kind("{1.5, 3}"), ErrorType::SequenceStartIsNotInteger);
        assert_eq!(error_kind("{1, {1, 2}}"), ErrorType::SequenceStopIsNotInteger);
        assert_eq!(error_kind("{0, 200000001}"), ErrorType::SequenceTooLong);
        assert_eq!(error_kind("map(3, x -> x)"), ErrorType::SequenceExpected);
    }

    #[test]
    fn test_largest_sequence_is_accepted() {
        let result = eval("{0, 200000000}");
        assert!(matches!(result, Ok(Var::Seq(ref s)) if s.size() == 200_000_001));
    }

    #[test]
    fn test_error_positions() {
        let Err(EvalError::Failed(e)) = eval("{1, 2.5}") else {
            panic!("expected failure");
        };
        assert_eq!(e.start, TokenPosition::new(1, 8));
        assert_eq!(e.expression, "2.5");

        let Err(EvalError::Failed(e)) = eval("1 + {1, 2}") else {
            panic!("expected failure");
        };
        assert_eq!(e.kind, ErrorType::InvalidArithmeticOperand);
        assert_eq!(e.start, TokenPosition::new(1, 8));
        assert_eq!(e.expression, "{1, 2}");
    }

    #[test]
    fn test_lambda_errors() {
        assert_eq!(
            error_kind("map({1, 2}, x -> {1, x})"),
            ErrorType::MapLambdaReturnsNotNumber
        );
        assert_eq!(
            error_kind("reduce({1, 2}, {1, 2}, a b -> a)"),
            ErrorType::ReduceNeutralIsNotNumber
        );
        assert_eq!(
            error_kind("reduce({1, 2}, 0, a b -> {a, b})"),
            ErrorType::ReduceLambdaReturnsNotNumber
        );
    }

    #[test]
    fn test_repeated_reduce_parameter_is_reported_at_next() {
        let Err(EvalError::Failed(e)) = eval("reduce({1, 2}, 0, x x -> x)") else {
            panic!("expected failure");
        };
        assert_eq!(e.kind, ErrorType::VariableRedeclaration);
        assert_eq!(e.start, TokenPosition::new(1, 24));
    }

    #[test]
    fn test_parameter_shadowing_outer_binding() {
        let parsed = seqlang_parser::parse("out map({1, 2}, n -> n)");
        let Some(Stmt::Out(OutStmt { expr: Some(expr), .. })) =
            parsed.program.statements.into_iter().next()
        else {
            panic!("expected an out statement");
        };
        let ctx = EvalContext::new()
            .extend([("n".to_string(), Var::Num(Num::Integer(1)))])
            .expect("fresh context");
        let engine = SequenceEngine::sequential();
        let cancel = CancellationToken::new();
        let result = Evaluator::new(&engine, &cancel).eval_expr(&expr, &ctx);
        let Err(EvalError::Failed(e)) = result else {
            panic!("expected failure");
        };
        assert_eq!(e.kind, ErrorType::VariableRedeclaration);
        assert_eq!(e.start, TokenPosition::new(1, 16));
    }

    #[test]
    fn test_undeclared_variable() {
        assert_eq!(error_kind("x + 1"), ErrorType::UndeclaredVariable);
    }

    #[test]
    fn test_cancelled_before_start() {
        let parsed = seqlang_parser::parse("out 1 + 2");
        let Some(Stmt::Out(OutStmt { expr: Some(expr), .. })) =
            parsed.program.statements.into_iter().next()
        else {
            panic!("expected an out statement");
        };
        let engine = SequenceEngine::sequential();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = Evaluator::new(&engine, &cancel).eval_expr(&expr, &EvalContext::new());
        assert_eq!(result, Err(EvalError::Cancelled));
    }

    #[test]
    fn test_max_sequence_length_is_configurable() {
        let parsed = seqlang_parser::parse("out {1, 11}");
        let Some(Stmt::Out(OutStmt { expr: Some(expr), .. })) =
            parsed.program.statements.into_iter().next()
        else {
            panic!("expected an out statement");
        };
        let engine = SequenceEngine::sequential();
        let cancel = CancellationToken::new();
        let evaluator = Evaluator::new(&engine, &cancel).with_max_sequence_length(9);
        let result = evaluator.eval_expr(&expr, &EvalContext::new());
        assert!(matches!(
            result,
            Err(EvalError::Failed(ref e)) if e.kind == ErrorType::SequenceTooLong
        ));
    }

    #[test]
    fn test_nested_parallel_map() {
        let engine = SequenceEngine::new(4);
        let result = eval_with(
            "reduce(map({1, 200}, i -> reduce({1, i}, 0, a b -> a + b)), 0, a b -> a + b)",
            &engine,
        );
        // Sum of triangular numbers T(1)..T(200) = 200 * 201 * 202 / 6.
        assert_eq!(result, Ok(Var::Num(Num::Integer(1_353_400))));
    }
}
