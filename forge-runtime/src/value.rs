//! Runtime values

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use forge_core::ast::Stmt;
use forge_core::codegen::quote;
use tokio::sync::oneshot;

use crate::error::RuntimeResult;
use crate::output::NativeContext;
use crate::scope::Env;

/// Lists nested deeper than this display as `[...]`
const MAX_DISPLAY_DEPTH: usize = 32;
const MAX_COMPARE_DEPTH: usize = 64;

/// Lock a mutex, recovering the data if a holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub type NativeFn = dyn Fn(&NativeContext, Vec<Value>) -> RuntimeResult<Value> + Send + Sync;

#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Arc<Mutex<Vec<Value>>>),
    Function(Arc<Function>),
    Native(Arc<NativeFunction>),
    Coroutine(Arc<Coroutine>),
    Pending(Arc<Pending>),
}

/// A script-defined function and the scope it closes over
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Arc<Vec<Stmt>>,
    pub is_async: bool,
    pub closure: Env,
}

/// A function implemented in Rust
pub struct NativeFunction {
    pub name: String,
    func: Box<NativeFn>,
}

impl NativeFunction {
    pub fn call(&self, ctx: &NativeContext, args: Vec<Value>) -> RuntimeResult<Value> {
        (self.func)(ctx, args)
    }
}

/// The not-yet-run body of an `async fn` call
///
/// Awaiting takes the call out, so a coroutine runs at most once.
pub struct Coroutine {
    call: Mutex<Option<(Arc<Function>, Vec<Value>)>>,
}

impl Coroutine {
    pub(crate) fn take(&self) -> Option<(Arc<Function>, Vec<Value>)> {
        lock(&self.call).take()
    }
}

/// The receiving end of a resumption handle
pub struct Pending {
    receiver: Mutex<Option<oneshot::Receiver<String>>>,
}

impl Pending {
    pub(crate) fn take(&self) -> Option<oneshot::Receiver<String>> {
        lock(&self.receiver).take()
    }
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn list(values: Vec<Value>) -> Self {
        Value::List(Arc::new(Mutex::new(values)))
    }

    pub fn native<F>(name: &str, func: F) -> Self
    where
        F: Fn(&NativeContext, Vec<Value>) -> RuntimeResult<Value> + Send + Sync + 'static,
    {
        Value::Native(Arc::new(NativeFunction { name: name.to_string(), func: Box::new(func) }))
    }

    pub fn coroutine(function: Arc<Function>, args: Vec<Value>) -> Self {
        Value::Coroutine(Arc::new(Coroutine { call: Mutex::new(Some((function, args))) }))
    }

    /// A value that resolves once the matching sender delivers a line
    pub fn pending(receiver: oneshot::Receiver<String>) -> Self {
        Value::Pending(Arc::new(Pending { receiver: Mutex::new(Some(receiver)) }))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Function(_) => "function",
            Value::Native(_) => "builtin",
            Value::Coroutine(_) => "coroutine",
            Value::Pending(_) => "pending",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !lock(items).is_empty(),
            _ => true,
        }
    }

    /// Snapshot of a list's elements, taken without holding the lock afterwards
    pub fn list_items(&self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) => Some(lock(items).clone()),
            _ => None,
        }
    }

    /// Source-like form: strings are quoted
    pub fn repr(&self) -> String {
        let mut out = String::new();
        self.write_repr(&mut out, 0);
        out
    }

    fn write_repr(&self, out: &mut String, depth: usize) {
        match self {
            Value::Str(s) => out.push_str(&quote(s)),
            Value::List(_) if depth >= MAX_DISPLAY_DEPTH => out.push_str("[...]"),
            Value::List(_) => {
                out.push('[');
                for (i, item) in self.list_items().unwrap_or_default().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_repr(out, depth + 1);
                }
                out.push(']');
            }
            other => out.push_str(&other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "none"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(_) => write!(f, "{}", self.repr()),
            Value::Function(func) => write!(f, "<function {}>", func.name),
            Value::Native(native) => write!(f, "<builtin {}>", native.name),
            Value::Coroutine(_) => write!(f, "<coroutine>"),
            Value::Pending(_) => write!(f, "<pending input>"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repr())
    }
}

impl Value {
    /// Structural equality; lists nested deeper than [`MAX_COMPARE_DEPTH`]
    /// compare unequal
    fn equals(&self, other: &Self, depth: usize) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) if Arc::ptr_eq(a, b) => true,
            (Value::List(_), Value::List(_)) if depth >= MAX_COMPARE_DEPTH => false,
            (Value::List(_), Value::List(_)) => {
                let left = self.list_items().unwrap_or_default();
                let right = other.list_items().unwrap_or_default();
                left.len() == right.len()
                    && left.iter().zip(&right).all(|(a, b)| a.equals(b, depth + 1))
            }
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Arc::ptr_eq(a, b),
            (Value::Coroutine(a), Value::Coroutine(b)) => Arc::ptr_eq(a, b),
            (Value::Pending(a), Value::Pending(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other, 0)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}
