//! seqlang compiler: runs a program from source text to output and errors.
//!
//! ```text
//! source → Lexer → Parser → statements in order → output + sorted errors
//! ```
//!
//! Statements run one after another on the calling thread; only `map` and
//! `reduce` fan out to the evaluator's thread pool. A failing statement is
//! reported and skipped, the rest of the program still runs.

mod options;

pub use options::{CompileOptions, OptionsError, PARALLELISM_ENV};
pub use seqlang_eval::{CancellationToken, Cancelled};

use seqlang_eval::format::unescape_string;
use seqlang_eval::{EvalContext, EvalError, Evaluator, SequenceEngine, Var};
use seqlang_types::ast::{Expr, OutStmt, PrintStmt, Program, Stmt, VarStmt};
use seqlang_types::{merge_errors, Error, ErrorType, SourceFile};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Everything a run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Concatenated text of every `out` and `print`, in program order.
    pub output: String,
    /// Syntax and semantic errors, sorted by position.
    pub errors: Vec<Error>,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Each error rendered as `line L:P: message.`
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Every error followed by its source line and a caret under the
    /// start column.
    pub fn render_errors(&self, source: &str) -> String {
        let file = SourceFile::new(source);
        let mut out = String::new();
        for error in &self.errors {
            out.push_str(&error.to_string());
            out.push('\n');
            if let Some(line) = file.line(error.start.line) {
                let indent = " ".repeat(error.start.position_in_line as usize);
                out.push_str(&format!("  {line}\n  {indent}^\n"));
            }
        }
        out
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Entry points
// ══════════════════════════════════════════════════════════════════════════════

/// Compiler behind [`compile`], created on first use so its worker pool is
/// shared by every call.
static DEFAULT_COMPILER: OnceLock<Compiler> = OnceLock::new();

/// Run `source` with default options.
pub fn compile(source: &str) -> ExecutionResult {
    DEFAULT_COMPILER
        .get_or_init(|| Compiler::new(CompileOptions::default()))
        .run(source, &CancellationToken::new())
        // A token nobody else holds is never cancelled.
        .unwrap_or_default()
}

/// Run `source` with `options`, stopping early if `cancel` is triggered.
///
/// Builds a fresh worker pool; hold a [`Compiler`] to reuse one across runs.
pub fn compile_with(
    source: &str,
    options: &CompileOptions,
    cancel: &CancellationToken,
) -> Result<ExecutionResult, Cancelled> {
    Compiler::new(options.clone()).run(source, cancel)
}

/// A reusable compiler holding its own worker pool.
#[derive(Debug)]
pub struct Compiler {
    options: CompileOptions,
    engine: SequenceEngine,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        let engine = SequenceEngine::new(options.effective_parallelism());
        Self { options, engine }
    }

    /// Parse and run `source`.
    pub fn run(
        &self,
        source: &str,
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult, Cancelled> {
        let parsed = seqlang_parser::parse(source);
        tracing::debug!(
            statements = parsed.program.statements.len(),
            syntax_errors = parsed.errors.len(),
            parallelism = self.engine.parallelism(),
            "running program"
        );

        let evaluator = Evaluator::new(&self.engine, cancel)
            .with_max_sequence_length(self.options.max_sequence_length);
        let mut run = Run {
            evaluator,
            ctx: EvalContext::new(),
            output: String::new(),
            errors: Vec::new(),
        };
        run.program(&parsed.program)?;

        tracing::debug!(
            output_len = run.output.len(),
            semantic_errors = run.errors.len(),
            "program finished"
        );
        Ok(ExecutionResult {
            output: run.output,
            errors: merge_errors(parsed.errors, run.errors),
        })
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Statement execution
// ══════════════════════════════════════════════════════════════════════════════

/// State threaded through the statements of one run.
struct Run<'e> {
    evaluator: Evaluator<'e>,
    ctx: EvalContext,
    output: String,
    errors: Vec<Error>,
}

impl Run<'_> {
    fn program(&mut self, program: &Program) -> Result<(), Cancelled> {
        for stmt in &program.statements {
            match stmt {
                Stmt::Var(var) => self.var_stmt(var)?,
                Stmt::Out(out) => self.out_stmt(out)?,
                Stmt::Print(print) => self.print_stmt(print),
                Stmt::Expr(expr) => self.errors.push(Error::semantic(
                    ErrorType::TopLevelExpressionsUnsupported,
                    expr.span,
                    expr.text.clone(),
                )),
            }
        }
        Ok(())
    }

    /// `var name = value`: binds `name` unless it is already declared.
    fn var_stmt(&mut self, var: &VarStmt) -> Result<(), Cancelled> {
        let Some(name) = &var.name else {
            self.report(ErrorType::AssignmentMissingName, var);
            return Ok(());
        };
        let Some(value) = &var.value else {
            self.report(ErrorType::AssignmentMissingExpression, var);
            return Ok(());
        };
        let Some(value) = self.eval(value)? else {
            return Ok(());
        };
        match self.ctx.extend([(name.name.clone(), value)]) {
            Ok(ctx) => self.ctx = ctx,
            Err(_) => self.report(ErrorType::VariableRedeclaration, var),
        }
        Ok(())
    }

    /// `out expr`: appends the formatted value.
    fn out_stmt(&mut self, out: &OutStmt) -> Result<(), Cancelled> {
        let Some(expr) = &out.expr else {
            self.errors.push(Error::semantic(
                ErrorType::OutMissingExpression,
                out.span,
                out.text.clone(),
            ));
            return Ok(());
        };
        if let Some(value) = self.eval(expr)? {
            self.output.push_str(&value.to_string());
        }
        Ok(())
    }

    /// `print "text"`: appends the unescaped literal.
    fn print_stmt(&mut self, print: &PrintStmt) {
        if let Some(literal) = &print.literal {
            self.output.push_str(&unescape_string(literal));
        }
    }

    /// Evaluate `expr`, recording a reported error. `Ok(None)` means the
    /// statement failed and is skipped.
    fn eval(&mut self, expr: &Expr) -> Result<Option<Var>, Cancelled> {
        match self.evaluator.eval_expr(expr, &self.ctx) {
            Ok(value) => Ok(Some(value)),
            Err(EvalError::Failed(error)) => {
                self.errors.push(error);
                Ok(None)
            }
            Err(EvalError::Cancelled) => Err(Cancelled),
        }
    }

    fn report(&mut self, kind: ErrorType, var: &VarStmt) {
        self.errors.push(Error::semantic(kind, var.span, var.text.clone()));
    }
}
