//! Expression parsing with operator precedence.
//!
//! Precedence (lowest → highest):
//! 4. `+`, `-`
//! 3. `*`, `/`
//! 2. unary `+`, `-`
//! 1. `^` (right-associative)
//!
//! An operator with nothing parseable on one side still produces a
//! `Binary`/`Unary` node with that side set to `None`.

use seqlang_lexer::token::TokenKind;
use seqlang_types::ast::*;
use seqlang_types::ensure_sufficient_stack;

use crate::parser::{Parser, MAX_EXPR_DEPTH};

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Points
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse an expression.
    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        self.nested(Self::parse_additive)
    }

    /// Run `parse` one nesting level deeper. Past [`MAX_EXPR_DEPTH`] the
    /// rest of the statement is skipped with an error instead.
    fn nested(&mut self, parse: fn(&mut Self) -> Option<Expr>) -> Option<Expr> {
        if self.expr_depth >= MAX_EXPR_DEPTH {
            self.error_at_current(format!(
                "expression nesting is deeper than {MAX_EXPR_DEPTH} levels"
            ));
            self.skip_to_statement();
            return None;
        }
        self.expr_depth += 1;
        let result = ensure_sufficient_stack(|| parse(self));
        self.expr_depth -= 1;
        result
    }

    /// Parse an expression that the grammar requires at this point,
    /// reporting `missing expression` if none can start here.
    pub(crate) fn parse_required_expression(&mut self) -> Option<Box<Expr>> {
        if self.can_start_operand() {
            self.parse_expression().map(Box::new)
        } else {
            self.error_at_current(format!("missing expression at '{}'", self.peek_kind()));
            None
        }
    }

    /// Whether the current token can begin an operand. Binary-only
    /// operators count: they begin a node whose left side is missing.
    pub(crate) fn can_start_operand(&self) -> bool {
        let kind = self.peek_kind();
        kind.starts_expression()
            || matches!(
                kind,
                TokenKind::Star | TokenKind::Slash | TokenKind::Caret | TokenKind::String(_)
            )
    }

    /// Skip to the next statement keyword after giving up on an expression.
    fn skip_to_statement(&mut self) {
        while !self.at_end() && !self.peek_kind().starts_statement() {
            self.advance();
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// `Additive = Multiplicative { ("+" | "-") Multiplicative }`
    fn parse_additive(&mut self) -> Option<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            if !matches!(self.peek_kind(), TokenKind::Plus | TokenKind::Minus) {
                break;
            }
            let op = self.parse_operator();
            let right = self.parse_right_operand(Self::parse_multiplicative);
            left = self.binary(Some(left), op, right);
        }
        Some(left)
    }

    /// `Multiplicative = Unary { ("*" | "/") Unary }`
    fn parse_multiplicative(&mut self) -> Option<Expr> {
        let mut left = if self.at_multiplicative_op() {
            self.error_at_current(format!("missing expression at '{}'", self.peek_kind()));
            None
        } else {
            Some(self.parse_unary()?)
        };
        while self.at_multiplicative_op() {
            let op = self.parse_operator();
            let right = self.parse_right_operand(Self::parse_unary);
            left = Some(self.binary(left, op, right));
        }
        left
    }

    fn at_multiplicative_op(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Star | TokenKind::Slash)
    }

    /// `Unary = ("+" | "-") Unary | Power`
    fn parse_unary(&mut self) -> Option<Expr> {
        if !matches!(self.peek_kind(), TokenKind::Plus | TokenKind::Minus) {
            return self.parse_power();
        }
        let op = self.parse_operator();
        let operand = self.parse_right_operand(Self::parse_nested_unary);
        let span = match &operand {
            Some(e) => op.span.merge(e.span),
            None => op.span,
        };
        let text = self.slice(span).to_string();
        Some(Expr::new(
            ExprKind::Unary {
                op,
                operand: operand.map(Box::new),
            },
            span,
            text,
        ))
    }

    /// `Power = Primary [ "^" Unary ]`, right-associative.
    fn parse_power(&mut self) -> Option<Expr> {
        let base = if self.check(&TokenKind::Caret) {
            self.error_at_current("missing expression at '^'");
            None
        } else {
            Some(self.parse_primary()?)
        };
        if !self.check(&TokenKind::Caret) {
            return base;
        }
        let op = self.parse_operator();
        let exponent = self.parse_right_operand(Self::parse_nested_unary);
        Some(self.binary(base, op, exponent))
    }

    /// Operand of a unary operator or exponent of `^`; both chains nest.
    fn parse_nested_unary(&mut self) -> Option<Expr> {
        self.nested(Self::parse_unary)
    }

    fn parse_operator(&mut self) -> Operator {
        let token = self.advance();
        Operator::new(token.kind.to_string(), token.span)
    }

    /// Parse the operand after an operator with `parse`, reporting a
    /// missing expression if nothing can start there.
    fn parse_right_operand(&mut self, parse: fn(&mut Self) -> Option<Expr>) -> Option<Expr> {
        if self.can_start_operand() {
            parse(self)
        } else {
            self.error_at_current(format!("missing expression at '{}'", self.peek_kind()));
            None
        }
    }

    fn binary(&self, left: Option<Expr>, op: Operator, right: Option<Expr>) -> Expr {
        let mut span = op.span;
        if let Some(l) = &left {
            span = l.span.merge(span);
        }
        if let Some(r) = &right {
            span = span.merge(r.span);
        }
        Expr::new(
            ExprKind::Binary {
                left: left.map(Box::new),
                op,
                right: right.map(Box::new),
            },
            span,
            self.slice(span),
        )
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary Expressions
    // ══════════════════════════════════════════════════════════════════════════

    /// `Primary = NUMBER | NAME | "(" Expr ")" | "{" Expr "," Expr "}" | Map | Reduce`
    fn parse_primary(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let kind = match self.peek_kind().clone() {
            TokenKind::Number(raw) => {
                self.advance();
                ExprKind::Number(raw)
            }
            TokenKind::Identifier(name) => {
                self.advance();
                ExprKind::Identifier(name)
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_required_expression();
                self.expect(&TokenKind::RParen);
                match inner {
                    Some(inner) => ExprKind::Paren(inner),
                    None => ExprKind::Invalid,
                }
            }
            TokenKind::LBrace => self.parse_sequence(),
            TokenKind::Map => self.parse_map(),
            TokenKind::Reduce => self.parse_reduce(),
            TokenKind::String(_) => {
                self.error_at_current(format!(
                    "string literal '{}' is only allowed after 'print'",
                    self.peek_kind()
                ));
                self.advance();
                ExprKind::Invalid
            }
            _ => return None,
        };
        let (span, text) = self.text_since(start);
        Some(Expr::new(kind, span, text))
    }

    /// `"{" Expr "," Expr "}"`
    fn parse_sequence(&mut self) -> ExprKind {
        self.advance(); // eat `{`
        let start = self.parse_required_expression();
        self.expect(&TokenKind::Comma);
        let stop = self.parse_required_expression();
        self.expect(&TokenKind::RBrace);
        ExprKind::Sequence { start, stop }
    }

    /// `"map" "(" Expr "," NAME "->" Expr ")"`
    fn parse_map(&mut self) -> ExprKind {
        self.advance(); // eat `map`
        self.expect(&TokenKind::LParen);
        let sequence = self.parse_required_expression();
        self.expect(&TokenKind::Comma);
        let lambda = if self.at_lambda_start() {
            let start = self.current_span();
            let param = self.expect_identifier("NAME");
            self.expect(&TokenKind::Arrow);
            let body = self.parse_required_expression();
            let (span, text) = self.text_since(start);
            Some(MapLambda {
                param,
                body,
                span,
                text,
            })
        } else {
            self.error_at_current(format!("missing lambda at '{}'", self.peek_kind()));
            None
        };
        self.expect(&TokenKind::RParen);
        ExprKind::Map { sequence, lambda }
    }

    /// `"reduce" "(" Expr "," Expr "," NAME NAME "->" Expr ")"`
    fn parse_reduce(&mut self) -> ExprKind {
        self.advance(); // eat `reduce`
        self.expect(&TokenKind::LParen);
        let sequence = self.parse_required_expression();
        self.expect(&TokenKind::Comma);
        let neutral = self.parse_required_expression();
        self.expect(&TokenKind::Comma);
        let lambda = if self.at_lambda_start() {
            let start = self.current_span();
            let accumulator = self.expect_identifier("NAME");
            let next = self.expect_identifier("NAME");
            self.expect(&TokenKind::Arrow);
            let body = self.parse_required_expression();
            let (span, text) = self.text_since(start);
            Some(ReduceLambda {
                accumulator,
                next,
                body,
                span,
                text,
            })
        } else {
            self.error_at_current(format!("missing lambda at '{}'", self.peek_kind()));
            None
        };
        self.expect(&TokenKind::RParen);
        ExprKind::Reduce {
            sequence,
            neutral,
            lambda,
        }
    }

    fn at_lambda_start(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Identifier(_) | TokenKind::Arrow
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::parse;
    use seqlang_types::ast::*;

    fn out_expr(source: &str) -> Expr {
        let result = parse(source);
        match result.program.statements.into_iter().next() {
            Some(Stmt::Out(out)) => out.expr.expect("out without expression"),
            other => panic!("expected out statement, got {other:?}"),
        }
    }

    fn shape(expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Number(n) => n.clone(),
            ExprKind::Identifier(n) => n.clone(),
            ExprKind::Paren(e) => shape(e),
            ExprKind::Binary { left, op, right } => format!(
                "({} {} {})",
                left.as_deref().map_or("_".into(), shape),
                op.symbol,
                right.as_deref().map_or("_".into(), shape)
            ),
            ExprKind::Unary { op, operand } => format!(
                "({}{})",
                op.symbol,
                operand.as_deref().map_or("_".into(), shape)
            ),
            other => format!("{other:?}"),
        }
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        assert_eq!(shape(&out_expr("out 2 + 3 * 4")), "(2 + (3 * 4))");
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        assert_eq!(shape(&out_expr("out 10 - 4 - 3")), "((10 - 4) - 3)");
        assert_eq!(shape(&out_expr("out 8 / 4 / 2")), "((8 / 4) / 2)");
    }

    #[test]
    fn test_power_is_right_associative() {
        assert_eq!(shape(&out_expr("out 2 ^ 3 ^ 2")), "(2 ^ (3 ^ 2))");
    }

    #[test]
    fn test_unary_minus_binds_looser_than_power() {
        assert_eq!(shape(&out_expr("out -2 ^ 2")), "(-(2 ^ 2))");
        assert_eq!(shape(&out_expr("out -1 + 2")), "((-1) + 2)");
        assert_eq!(shape(&out_expr("out 2 ^ -1")), "(2 ^ (-1))");
    }

    #[test]
    fn test_missing_operands_keep_the_node() {
        assert_eq!(shape(&out_expr("out 1 +")), "(1 + _)");
        assert_eq!(shape(&out_expr("out * 3")), "(_ * 3)");
        assert_eq!(shape(&out_expr("out -")), "(-_)");
    }

    #[test]
    fn test_node_text_is_verbatim_source() {
        let expr = out_expr("out  (1 +  2) * x");
        assert_eq!(expr.text, "(1 +  2) * x");
    }
}
