//! Async tree-walking interpreter
//!
//! Every evaluation step is a future, so an `await` anywhere in a script
//! parks the whole run until the awaited value resolves.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use forge_core::ast::*;
use futures::future::{BoxFuture, FutureExt};

use crate::error::{RuntimeError, RuntimeResult};
use crate::host::RuntimeConfig;
use crate::ops;
use crate::output::{NativeContext, OutputSink};
use crate::scope::Env;
use crate::value::{Function, Value};

/// Loop iterations between cooperative yields to the executor
const YIELD_EVERY: usize = 1024;

/// How a statement finished
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

pub struct Interpreter {
    config: RuntimeConfig,
    context: NativeContext,
    depth: AtomicUsize,
}

/// Decrements the call depth when a call frame ends, however it ends
struct Frame<'a>(&'a AtomicUsize);

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

impl Interpreter {
    pub fn new(config: RuntimeConfig, output: OutputSink) -> Self {
        Self { config, context: NativeContext::new(output), depth: AtomicUsize::new(0) }
    }

    /// Run a program in a fresh module scope on top of `globals`
    pub async fn run(&self, program: &Program, globals: &Env) -> RuntimeResult<()> {
        let module = Env::child(globals);
        match self.exec_stmts(&program.stmts, &module).await? {
            Flow::Normal | Flow::Return(_) => Ok(()),
            Flow::Break | Flow::Continue => Err(stray_loop_control()),
        }
    }

    fn exec_stmts<'a>(&'a self, stmts: &'a [Stmt], env: &'a Env) -> BoxFuture<'a, RuntimeResult<Flow>> {
        async move {
            for stmt in stmts {
                match self.exec_stmt(stmt, env).await? {
                    Flow::Normal => {}
                    flow => return Ok(flow),
                }
            }
            Ok(Flow::Normal)
        }
        .boxed()
    }

    async fn exec_block(&self, stmts: &[Stmt], env: &Env) -> RuntimeResult<Flow> {
        let scope = Env::child(env);
        self.exec_stmts(stmts, &scope).await
    }

    async fn exec_stmt(&self, stmt: &Stmt, env: &Env) -> RuntimeResult<Flow> {
        match stmt {
            Stmt::Let { name, value, .. } => {
                let value = self.eval_expr(value, env).await?;
                env.define(name, value);
            }
            Stmt::Assign { name, value, .. } => {
                let value = self.eval_expr(value, env).await?;
                env.assign(name, value)?;
            }
            Stmt::SetIndex { target, index, value, .. } => {
                let target = self.eval_expr(target, env).await?;
                let index = self.eval_expr(index, env).await?;
                let value = self.eval_expr(value, env).await?;
                ops::set_index(&target, &index, value)?;
            }
            Stmt::Expr(expr) => {
                self.eval_expr(expr, env).await?;
            }
            Stmt::Return(value, _) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr, env).await?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            Stmt::Fn(decl) => {
                let function = Function {
                    name: decl.name.clone(),
                    params: decl.params.clone(),
                    body: Arc::new(decl.body.clone()),
                    is_async: decl.is_async,
                    closure: env.clone(),
                };
                env.define(&decl.name, Value::Function(Arc::new(function)));
            }
            Stmt::If { condition, then_body, else_body, .. } => {
                if self.eval_expr(condition, env).await?.is_truthy() {
                    return self.exec_block(then_body, env).await;
                }
                if let Some(body) = else_body {
                    return self.exec_block(body, env).await;
                }
            }
            Stmt::While { condition, body, .. } => {
                let mut iterations = 0usize;
                while self.eval_expr(condition, env).await?.is_truthy() {
                    match self.exec_block(body, env).await? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    iterations += 1;
                    if iterations % YIELD_EVERY == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            }
            Stmt::Loop { body, .. } => {
                let mut iterations = 0usize;
                loop {
                    match self.exec_block(body, env).await? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    iterations += 1;
                    if iterations % YIELD_EVERY == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            }
            Stmt::Break(_) => return Ok(Flow::Break),
            Stmt::Continue(_) => return Ok(Flow::Continue),
        }
        Ok(Flow::Normal)
    }

    fn eval_expr<'a>(&'a self, expr: &'a Expr, env: &'a Env) -> BoxFuture<'a, RuntimeResult<Value>> {
        async move {
            match &expr.kind {
                ExprKind::Literal(literal) => Ok(literal_value(literal)),
                ExprKind::Ident(name) => env.lookup(name),
                ExprKind::List { elements } => Ok(Value::list(self.eval_all(elements, env).await?)),
                ExprKind::Binary { left, op: BinOp::And, right } => {
                    let left = self.eval_expr(left, env).await?;
                    if !left.is_truthy() {
                        return Ok(left);
                    }
                    self.eval_expr(right, env).await
                }
                ExprKind::Binary { left, op: BinOp::Or, right } => {
                    let left = self.eval_expr(left, env).await?;
                    if left.is_truthy() {
                        return Ok(left);
                    }
                    self.eval_expr(right, env).await
                }
                ExprKind::Binary { left, op, right } => {
                    let left = self.eval_expr(left, env).await?;
                    let right = self.eval_expr(right, env).await?;
                    ops::binary(*op, &left, &right)
                }
                ExprKind::Unary { op, expr } => {
                    let value = self.eval_expr(expr, env).await?;
                    ops::unary(*op, &value)
                }
                ExprKind::Call { callee, args } => {
                    let callee = self.eval_expr(callee, env).await?;
                    let args = self.eval_all(args, env).await?;
                    self.call_value(callee, args).await
                }
                ExprKind::Index { expr, index } => {
                    let target = self.eval_expr(expr, env).await?;
                    let index = self.eval_expr(index, env).await?;
                    ops::index(&target, &index)
                }
                ExprKind::Await { expr } => {
                    let value = self.eval_expr(expr, env).await?;
                    self.await_value(value).await
                }
            }
        }
        .boxed()
    }

    async fn eval_all(&self, exprs: &[Expr], env: &Env) -> RuntimeResult<Vec<Value>> {
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            values.push(self.eval_expr(expr, env).await?);
        }
        Ok(values)
    }

    /// Call any callable value
    ///
    /// An `async fn` does not run here: the call yields a coroutine that
    /// runs when awaited.
    pub async fn call_value(&self, callee: Value, args: Vec<Value>) -> RuntimeResult<Value> {
        match callee {
            Value::Function(function) if function.is_async => {
                check_arity(&function, args.len())?;
                Ok(Value::coroutine(function, args))
            }
            Value::Function(function) => self.call_function(&function, args).await,
            Value::Native(native) => native.call(&self.context, args),
            other => Err(RuntimeError::TypeError(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    async fn call_function(&self, function: &Function, args: Vec<Value>) -> RuntimeResult<Value> {
        check_arity(function, args.len())?;

        let depth = self.depth.fetch_add(1, Ordering::Relaxed) + 1;
        let _frame = Frame(&self.depth);
        if depth > self.config.max_call_depth {
            return Err(RuntimeError::RecursionError(self.config.max_call_depth));
        }

        let scope = Env::child(&function.closure);
        for (param, arg) in function.params.iter().zip(args) {
            scope.define(param, arg);
        }

        match self.exec_stmts(&function.body, &scope).await? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::None),
            Flow::Break | Flow::Continue => Err(stray_loop_control()),
        }
    }

    async fn await_value(&self, value: Value) -> RuntimeResult<Value> {
        match value {
            Value::Coroutine(coroutine) => {
                let (function, args) = coroutine.take().ok_or_else(|| {
                    RuntimeError::TypeError("cannot await an already awaited coroutine".to_string())
                })?;
                self.call_function(&function, args).await
            }
            Value::Pending(pending) => {
                let receiver = pending.take().ok_or_else(|| {
                    RuntimeError::TypeError("cannot await an input request twice".to_string())
                })?;
                receiver.await.map(Value::Str).map_err(|_| RuntimeError::InputCancelled)
            }
            other => Err(RuntimeError::TypeError(format!(
                "object of type '{}' can't be used in 'await' expression",
                other.type_name()
            ))),
        }
    }
}

fn check_arity(function: &Function, given: usize) -> RuntimeResult<()> {
    if function.params.len() == given {
        return Ok(());
    }
    Err(RuntimeError::TypeError(format!(
        "{}() takes {} argument(s) but {} were given",
        function.name,
        function.params.len(),
        given
    )))
}

fn stray_loop_control() -> RuntimeError {
    RuntimeError::SyntaxError("'break' or 'continue' outside loop".to_string())
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(x) => Value::Float(*x),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::String(s) => Value::Str(s.clone()),
        Literal::None => Value::None,
    }
}
