//! Statement parsing.

use crate::parser::Parser;
use seqlang_lexer::token::TokenKind;
use seqlang_types::ast::*;

impl<'src> Parser<'src> {
    /// Parse a single top-level statement.
    ///
    /// Returns `None` without consuming anything if the current token can
    /// start neither a statement nor an expression.
    pub(crate) fn parse_statement(&mut self) -> Option<Stmt> {
        match self.peek_kind() {
            TokenKind::Var => Some(self.parse_var_stmt()),
            TokenKind::Out => Some(self.parse_out_stmt()),
            TokenKind::Print => Some(self.parse_print_stmt()),
            _ if self.can_start_operand() => self.parse_expression().map(Stmt::Expr),
            _ => None,
        }
    }

    /// `var NAME = expression`
    fn parse_var_stmt(&mut self) -> Stmt {
        let start = self.advance().span; // eat `var`
        let name = self.expect_identifier("NAME");
        self.expect(&TokenKind::Eq);
        let value = self.parse_required_expression();
        let (span, text) = self.text_since(start);
        Stmt::Var(VarStmt {
            name,
            value: value.map(|e| *e),
            span,
            text,
        })
    }

    /// `out expression`
    fn parse_out_stmt(&mut self) -> Stmt {
        let start = self.advance().span; // eat `out`
        let expr = self.parse_required_expression();
        let (span, text) = self.text_since(start);
        Stmt::Out(OutStmt {
            expr: expr.map(|e| *e),
            span,
            text,
        })
    }

    /// `print STRING`
    fn parse_print_stmt(&mut self) -> Stmt {
        let start = self.advance().span; // eat `print`
        let literal = match self.peek_kind().clone() {
            TokenKind::String(raw) => {
                self.advance();
                Some(raw)
            }
            _ => {
                self.error_at_current(format!("missing STRING at '{}'", self.peek_kind()));
                None
            }
        };
        let (span, _) = self.text_since(start);
        Stmt::Print(PrintStmt { literal, span })
    }
}
