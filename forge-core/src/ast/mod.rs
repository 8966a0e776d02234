//! Abstract Syntax Tree definitions for Forge script
//!
//! A script is a flat sequence of statements executed top to bottom.
//! Function definitions are statements too, so they bind at the point
//! where they appear.

use std::fmt;
use crate::lexer::Span;

/// A complete script
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

/// Function definition: `fn name(params) { body }` or `async fn ...`
#[derive(Debug, Clone, PartialEq)]
pub struct FnDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub is_async: bool,
    pub span: Span,
}

/// Statement
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Let binding: `let name = expr;`
    Let { name: String, value: Expr, span: Span },

    /// Assignment: `name = expr;`
    Assign { name: String, value: Expr, span: Span },

    /// Indexed assignment: `target[index] = expr;`
    SetIndex { target: Expr, index: Expr, value: Expr, span: Span },

    /// Expression statement: `expr;`
    Expr(Expr),

    /// Return statement: `return expr;`
    Return(Option<Expr>, Span),

    /// Function definition
    Fn(FnDecl),

    /// If statement: `if cond { then_body } else { else_body }`
    ///
    /// `else if` chains are stored as a nested `If` inside `else_body`.
    If {
        condition: Expr,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
        span: Span,
    },

    /// While loop: `while cond { body }`
    While { condition: Expr, body: Vec<Stmt>, span: Span },

    /// Loop: `loop { body }`
    Loop { body: Vec<Stmt>, span: Span },

    /// Break from loop
    Break(Span),

    /// Continue loop
    Continue(Span),
}

/// Expression with source span
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Create expression with dummy span (synthesized code)
    pub fn dummy(kind: ExprKind) -> Self {
        Self { kind, span: Span::dummy() }
    }

    /// `Some(name)` when this expression is a bare identifier
    pub fn as_ident(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(name) => Some(name),
            _ => None,
        }
    }
}

/// Expression kinds
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Literal value
    Literal(Literal),

    /// Variable reference
    Ident(String),

    /// List construction: `[a, b, c]`
    List { elements: Vec<Expr> },

    /// Binary operation: `left op right`
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },

    /// Unary operation: `op expr`
    Unary { op: UnOp, expr: Box<Expr> },

    /// Call: `callee(args)`
    Call { callee: Box<Expr>, args: Vec<Expr> },

    /// Indexing: `expr[index]`
    Index { expr: Box<Expr>, index: Box<Expr> },

    /// Suspension: `await expr`
    Await { expr: Box<Expr> },
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Integer: `42`
    Int(i64),

    /// Float: `3.14`
    Float(f64),

    /// Boolean: `true` or `false`
    Bool(bool),

    /// String: `"hello"`
    String(String),

    /// `none`
    None,
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,      // +
    Sub,      // -
    Mul,      // *
    Div,      // /
    Rem,      // %

    // Comparison
    Eq,       // ==
    Ne,       // !=
    Lt,       // <
    Le,       // <=
    Gt,       // >
    Ge,       // >=

    // Logical
    And,      // &&
    Or,       // ||
}

impl BinOp {
    /// Binding strength, higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Eq | BinOp::Ne => 3,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => 4,
            BinOp::Add | BinOp::Sub => 5,
            BinOp::Mul | BinOp::Div | BinOp::Rem => 6,
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,      // -
    Not,      // !
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinOp::Add => write!(f, "+"),
            BinOp::Sub => write!(f, "-"),
            BinOp::Mul => write!(f, "*"),
            BinOp::Div => write!(f, "/"),
            BinOp::Rem => write!(f, "%"),
            BinOp::Eq => write!(f, "=="),
            BinOp::Ne => write!(f, "!="),
            BinOp::Lt => write!(f, "<"),
            BinOp::Le => write!(f, "<="),
            BinOp::Gt => write!(f, ">"),
            BinOp::Ge => write!(f, ">="),
            BinOp::And => write!(f, "&&"),
            BinOp::Or => write!(f, "||"),
        }
    }
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnOp::Neg => write!(f, "-"),
            UnOp::Not => write!(f, "!"),
        }
    }
}

/// Structural equality that ignores spans.
///
/// Printing and re-parsing a tree moves every span, so round-trip checks
/// compare with this instead of `==`.
pub trait SameShape {
    fn same_shape(&self, other: &Self) -> bool;
}

impl<T: SameShape> SameShape for [T] {
    fn same_shape(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.same_shape(b))
    }
}

impl<T: SameShape> SameShape for Vec<T> {
    fn same_shape(&self, other: &Self) -> bool {
        self.as_slice().same_shape(other.as_slice())
    }
}

impl SameShape for Program {
    fn same_shape(&self, other: &Self) -> bool {
        self.stmts.same_shape(&other.stmts)
    }
}

impl SameShape for Stmt {
    fn same_shape(&self, other: &Self) -> bool {
        match (self, other) {
            (Stmt::Let { name: a, value: x, .. }, Stmt::Let { name: b, value: y, .. })
            | (Stmt::Assign { name: a, value: x, .. }, Stmt::Assign { name: b, value: y, .. }) => {
                a == b && x.same_shape(y)
            }
            (
                Stmt::SetIndex { target: t1, index: i1, value: v1, .. },
                Stmt::SetIndex { target: t2, index: i2, value: v2, .. },
            ) => t1.same_shape(t2) && i1.same_shape(i2) && v1.same_shape(v2),
            (Stmt::Expr(a), Stmt::Expr(b)) => a.same_shape(b),
            (Stmt::Return(a, _), Stmt::Return(b, _)) => match (a, b) {
                (Some(a), Some(b)) => a.same_shape(b),
                (None, None) => true,
                _ => false,
            },
            (Stmt::Fn(a), Stmt::Fn(b)) => {
                a.name == b.name
                    && a.params == b.params
                    && a.is_async == b.is_async
                    && a.body.same_shape(&b.body)
            }
            (
                Stmt::If { condition: c1, then_body: t1, else_body: e1, .. },
                Stmt::If { condition: c2, then_body: t2, else_body: e2, .. },
            ) => {
                c1.same_shape(c2)
                    && t1.same_shape(t2)
                    && match (e1, e2) {
                        (Some(a), Some(b)) => a.same_shape(b),
                        (None, None) => true,
                        _ => false,
                    }
            }
            (Stmt::While { condition: c1, body: b1, .. }, Stmt::While { condition: c2, body: b2, .. }) => {
                c1.same_shape(c2) && b1.same_shape(b2)
            }
            (Stmt::Loop { body: a, .. }, Stmt::Loop { body: b, .. }) => a.same_shape(b),
            (Stmt::Break(_), Stmt::Break(_)) | (Stmt::Continue(_), Stmt::Continue(_)) => true,
            _ => false,
        }
    }
}

impl SameShape for Expr {
    fn same_shape(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (ExprKind::Literal(a), ExprKind::Literal(b)) => a == b,
            (ExprKind::Ident(a), ExprKind::Ident(b)) => a == b,
            (ExprKind::List { elements: a }, ExprKind::List { elements: b }) => a.same_shape(b),
            (
                ExprKind::Binary { left: l1, op: o1, right: r1 },
                ExprKind::Binary { left: l2, op: o2, right: r2 },
            ) => o1 == o2 && l1.same_shape(l2) && r1.same_shape(r2),
            (ExprKind::Unary { op: o1, expr: e1 }, ExprKind::Unary { op: o2, expr: e2 }) => {
                o1 == o2 && e1.same_shape(e2)
            }
            (ExprKind::Call { callee: c1, args: a1 }, ExprKind::Call { callee: c2, args: a2 }) => {
                c1.same_shape(c2) && a1.same_shape(a2)
            }
            (ExprKind::Index { expr: e1, index: i1 }, ExprKind::Index { expr: e2, index: i2 }) => {
                e1.same_shape(e2) && i1.same_shape(i2)
            }
            (ExprKind::Await { expr: a }, ExprKind::Await { expr: b }) => a.same_shape(b),
            _ => false,
        }
    }
}
