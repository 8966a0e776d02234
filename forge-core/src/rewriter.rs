//! Suspendable-input rewriter
//!
//! Turns a script whose input primitive blocks into one whose input calls
//! are suspension points:
//!
//! ```text
//! let name = input("Your name: ");        async fn __forge_main__() {
//! print("Hello,", name);           ==>        let name = await input("Your name: ");
//!                                             print("Hello,", name);
//!                                         }
//!                                         await __forge_main__();
//! ```
//!
//! Only calls whose callee is the bare primitive name are rewritten. A call
//! through an alias or any other callee expression is left as is.

use serde::{Deserialize, Serialize};

use crate::ast::*;
use crate::codegen::{print_program, quote};
use crate::error::Error;
use crate::printer::FormatConfig;

/// Prefix of the single chunk a fallback unit prints
pub const REWRITE_ERROR_TAG: &str = "REWRITE_ERROR:";

/// Names the rewriter works with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Name of the input-reading primitive whose calls become suspension points
    pub primitive: String,

    /// Name of the generated top-level async function
    pub entry: String,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            primitive: "input".to_string(),
            entry: "__forge_main__".to_string(),
        }
    }
}

/// Source ready to hand to the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenUnit {
    pub source: String,

    /// Number of call sites turned into suspension points
    pub suspension_points: usize,
}

/// Outcome of a rewrite; never an `Err` that escapes the rewriter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteResult {
    Ok(RewrittenUnit),
    Failed(String),
}

impl RewriteResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, RewriteResult::Ok(_))
    }

    /// The source to execute: the rewritten unit, or a fallback unit that
    /// prints the diagnostic and does nothing else
    pub fn into_unit(self) -> String {
        match self {
            RewriteResult::Ok(unit) => unit.source,
            RewriteResult::Failed(diagnostic) => fallback_unit(&diagnostic),
        }
    }
}

/// A unit whose only effect is printing `REWRITE_ERROR: <diagnostic>`
pub fn fallback_unit(diagnostic: &str) -> String {
    format!("print({}, {});\n", quote(REWRITE_ERROR_TAG), quote(diagnostic))
}

/// Parse `source` and produce its suspendable form
pub fn rewrite(source: &str, config: &RewriteConfig) -> RewriteResult {
    let program = match crate::parse(source) {
        Ok(program) => program,
        Err(e) => return RewriteResult::Failed(e.to_string()),
    };

    let mut rewriter = Rewriter::new(config.clone());
    match rewriter.rewrite_program(program) {
        Ok(wrapped) => RewriteResult::Ok(RewrittenUnit {
            source: print_program(&wrapped, &FormatConfig::default()),
            suspension_points: rewriter.suspension_points(),
        }),
        Err(e) => RewriteResult::Failed(e.to_string()),
    }
}

/// AST transformer that awaits primitive calls and wraps the script
pub struct Rewriter {
    config: RewriteConfig,
    suspension_points: usize,
}

impl Rewriter {
    pub fn new(config: RewriteConfig) -> Self {
        Self { config, suspension_points: 0 }
    }

    pub fn suspension_points(&self) -> usize {
        self.suspension_points
    }

    /// Transform every statement, then wrap the result in the entry function
    /// followed by a single awaited call to it
    pub fn rewrite_program(&mut self, program: Program) -> Result<Program, Error> {
        if let Some(span) = find_ident(&program.stmts, &self.config.entry) {
            return Err(Error::RewriteError {
                message: format!(
                    "'{}' is reserved for the generated entry point (used at {}:{})",
                    self.config.entry, span.line, span.col
                ),
            });
        }

        let body = self.rewrite_block(program.stmts);
        let entry = Stmt::Fn(FnDecl {
            name: self.config.entry.clone(),
            params: Vec::new(),
            body,
            is_async: true,
            span: Default::default(),
        });
        let call = Expr::dummy(ExprKind::Call {
            callee: Box::new(Expr::dummy(ExprKind::Ident(self.config.entry.clone()))),
            args: Vec::new(),
        });
        let run = Stmt::Expr(Expr::dummy(ExprKind::Await { expr: Box::new(call) }));

        Ok(Program { stmts: vec![entry, run] })
    }

    fn rewrite_block(&mut self, stmts: Vec<Stmt>) -> Vec<Stmt> {
        stmts.into_iter().map(|stmt| self.rewrite_stmt(stmt)).collect()
    }

    fn rewrite_stmt(&mut self, stmt: Stmt) -> Stmt {
        match stmt {
            Stmt::Let { name, value, span } => Stmt::Let { name, value: self.rewrite_expr(value), span },
            Stmt::Assign { name, value, span } => {
                Stmt::Assign { name, value: self.rewrite_expr(value), span }
            }
            Stmt::SetIndex { target, index, value, span } => Stmt::SetIndex {
                target: self.rewrite_expr(target),
                index: self.rewrite_expr(index),
                value: self.rewrite_expr(value),
                span,
            },
            Stmt::Expr(expr) => Stmt::Expr(self.rewrite_expr(expr)),
            Stmt::Return(value, span) => Stmt::Return(value.map(|v| self.rewrite_expr(v)), span),
            Stmt::Fn(decl) => Stmt::Fn(FnDecl { body: self.rewrite_block(decl.body), ..decl }),
            Stmt::If { condition, then_body, else_body, span } => Stmt::If {
                condition: self.rewrite_expr(condition),
                then_body: self.rewrite_block(then_body),
                else_body: else_body.map(|body| self.rewrite_block(body)),
                span,
            },
            Stmt::While { condition, body, span } => Stmt::While {
                condition: self.rewrite_expr(condition),
                body: self.rewrite_block(body),
                span,
            },
            Stmt::Loop { body, span } => Stmt::Loop { body: self.rewrite_block(body), span },
            Stmt::Break(span) => Stmt::Break(span),
            Stmt::Continue(span) => Stmt::Continue(span),
        }
    }

    fn is_primitive_call(&self, expr: &Expr) -> bool {
        matches!(&expr.kind, ExprKind::Call { callee, .. }
            if callee.as_ident() == Some(self.config.primitive.as_str()))
    }

    fn rewrite_expr(&mut self, expr: Expr) -> Expr {
        let Expr { kind, span } = expr;
        let kind = match kind {
            ExprKind::Literal(_) | ExprKind::Ident(_) => kind,
            ExprKind::List { elements } => ExprKind::List { elements: self.rewrite_exprs(elements) },
            ExprKind::Binary { left, op, right } => ExprKind::Binary {
                left: Box::new(self.rewrite_expr(*left)),
                op,
                right: Box::new(self.rewrite_expr(*right)),
            },
            ExprKind::Unary { op, expr } => {
                ExprKind::Unary { op, expr: Box::new(self.rewrite_expr(*expr)) }
            }
            ExprKind::Index { expr, index } => ExprKind::Index {
                expr: Box::new(self.rewrite_expr(*expr)),
                index: Box::new(self.rewrite_expr(*index)),
            },
            ExprKind::Await { expr } if self.is_primitive_call(&expr) => {
                // Already a suspension point: rewrite its arguments only
                ExprKind::Await { expr: Box::new(self.rewrite_call_args(*expr)) }
            }
            ExprKind::Await { expr } => ExprKind::Await { expr: Box::new(self.rewrite_expr(*expr)) },
            ExprKind::Call { callee, args } => {
                let call = Expr::new(
                    ExprKind::Call {
                        callee: Box::new(self.rewrite_expr(*callee)),
                        args: self.rewrite_exprs(args),
                    },
                    span,
                );
                if !self.is_primitive_call(&call) {
                    return call;
                }
                self.suspension_points += 1;
                ExprKind::Await { expr: Box::new(call) }
            }
        };
        Expr::new(kind, span)
    }

    fn rewrite_call_args(&mut self, call: Expr) -> Expr {
        match call.kind {
            ExprKind::Call { callee, args } => Expr::new(
                ExprKind::Call { callee, args: self.rewrite_exprs(args) },
                call.span,
            ),
            kind => Expr::new(kind, call.span),
        }
    }

    fn rewrite_exprs(&mut self, exprs: Vec<Expr>) -> Vec<Expr> {
        exprs.into_iter().map(|e| self.rewrite_expr(e)).collect()
    }
}

/// First place `name` is bound or referenced
fn find_ident(stmts: &[Stmt], name: &str) -> Option<crate::lexer::Span> {
    stmts.iter().find_map(|stmt| match stmt {
        Stmt::Let { name: bound, value, span } | Stmt::Assign { name: bound, value, span } => {
            if bound == name {
                Some(*span)
            } else {
                find_ident_expr(value, name)
            }
        }
        Stmt::SetIndex { target, index, value, .. } => find_ident_expr(target, name)
            .or_else(|| find_ident_expr(index, name))
            .or_else(|| find_ident_expr(value, name)),
        Stmt::Expr(expr) => find_ident_expr(expr, name),
        Stmt::Return(value, _) => value.as_ref().and_then(|v| find_ident_expr(v, name)),
        Stmt::Fn(decl) => {
            if decl.name == name || decl.params.iter().any(|p| p == name) {
                Some(decl.span)
            } else {
                find_ident(&decl.body, name)
            }
        }
        Stmt::If { condition, then_body, else_body, .. } => find_ident_expr(condition, name)
            .or_else(|| find_ident(then_body, name))
            .or_else(|| else_body.as_deref().and_then(|body| find_ident(body, name))),
        Stmt::While { condition, body, .. } => {
            find_ident_expr(condition, name).or_else(|| find_ident(body, name))
        }
        Stmt::Loop { body, .. } => find_ident(body, name),
        Stmt::Break(_) | Stmt::Continue(_) => None,
    })
}

fn find_ident_expr(expr: &Expr, name: &str) -> Option<crate::lexer::Span> {
    match &expr.kind {
        ExprKind::Ident(id) if id == name => Some(expr.span),
        ExprKind::Literal(_) | ExprKind::Ident(_) => None,
        ExprKind::List { elements } => elements.iter().find_map(|e| find_ident_expr(e, name)),
        ExprKind::Binary { left, right, .. } => {
            find_ident_expr(left, name).or_else(|| find_ident_expr(right, name))
        }
        ExprKind::Unary { expr, .. } | ExprKind::Await { expr } => find_ident_expr(expr, name),
        ExprKind::Index { expr, index } => {
            find_ident_expr(expr, name).or_else(|| find_ident_expr(index, name))
        }
        ExprKind::Call { callee, args } => find_ident_expr(callee, name)
            .or_else(|| args.iter().find_map(|a| find_ident_expr(a, name))),
    }
}
