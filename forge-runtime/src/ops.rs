//! Operator semantics

use std::cmp::Ordering;

use forge_core::ast::{BinOp, UnOp};

use crate::error::{RuntimeError, RuntimeResult};
use crate::value::{lock, Value};

/// Largest string (in bytes) or list (in items) a repetition may build
pub const MAX_REPEAT_LEN: usize = 1 << 26;

/// Apply a non-short-circuiting binary operator
pub fn binary(op: BinOp, left: &Value, right: &Value) -> RuntimeResult<Value> {
    match op {
        BinOp::Add => add(left, right),
        BinOp::Sub => arithmetic(op, left, right, i64::checked_sub, |a, b| a - b),
        BinOp::Mul => multiply(left, right),
        BinOp::Div => divide(left, right),
        BinOp::Rem => remainder(left, right),
        BinOp::Eq => Ok(Value::Bool(left == right)),
        BinOp::Ne => Ok(Value::Bool(left != right)),
        BinOp::Lt => compare(op, left, right, |o| o == Ordering::Less),
        BinOp::Le => compare(op, left, right, |o| o != Ordering::Greater),
        BinOp::Gt => compare(op, left, right, |o| o == Ordering::Greater),
        BinOp::Ge => compare(op, left, right, |o| o != Ordering::Less),
        // Short-circuited by the interpreter; reaching here means both sides are evaluated
        BinOp::And => Ok(if left.is_truthy() { right.clone() } else { left.clone() }),
        BinOp::Or => Ok(if left.is_truthy() { left.clone() } else { right.clone() }),
    }
}

pub fn unary(op: UnOp, value: &Value) -> RuntimeResult<Value> {
    match (op, value) {
        (UnOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
        (UnOp::Neg, Value::Int(n)) => n.checked_neg().map(Value::Int).ok_or_else(overflow),
        (UnOp::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (UnOp::Neg, other) => Err(RuntimeError::TypeError(format!(
            "bad operand type for unary -: '{}'",
            other.type_name()
        ))),
    }
}

/// `target[index]`
pub fn index(target: &Value, index: &Value) -> RuntimeResult<Value> {
    match target {
        Value::List(items) => {
            let items = lock(items);
            let i = resolve_index(index, items.len(), "list")?;
            Ok(items[i].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = resolve_index(index, chars.len(), "string")?;
            Ok(Value::Str(chars[i].to_string()))
        }
        other => Err(RuntimeError::TypeError(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

/// `target[index] = value`
pub fn set_index(target: &Value, index: &Value, value: Value) -> RuntimeResult<()> {
    match target {
        Value::List(items) => {
            let mut items = lock(items);
            let i = resolve_index(index, items.len(), "list assignment")?;
            items[i] = value;
            Ok(())
        }
        other => Err(RuntimeError::TypeError(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}

/// Turn a possibly negative index into an in-bounds position
fn resolve_index(index: &Value, len: usize, what: &str) -> RuntimeResult<usize> {
    let Value::Int(i) = index else {
        return Err(RuntimeError::TypeError(format!(
            "{} indices must be integers, not '{}'",
            what,
            index.type_name()
        )));
    };
    let len = len as i64;
    let resolved = if *i < 0 { i + len } else { *i };
    if (0..len).contains(&resolved) {
        Ok(resolved as usize)
    } else {
        Err(RuntimeError::IndexError(format!("{} index out of range", what)))
    }
}

fn overflow() -> RuntimeError {
    RuntimeError::ValueError("integer overflow".to_string())
}

fn unsupported(op: BinOp, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::TypeError(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op,
        left.type_name(),
        right.type_name()
    ))
}

/// Numeric operands as floats, when at least one side is a float
fn as_floats(left: &Value, right: &Value) -> Option<(f64, f64)> {
    match (left, right) {
        (Value::Float(a), Value::Float(b)) => Some((*a, *b)),
        (Value::Int(a), Value::Float(b)) => Some((*a as f64, *b)),
        (Value::Float(a), Value::Int(b)) => Some((*a, *b as f64)),
        _ => None,
    }
}

fn arithmetic(
    op: BinOp,
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> RuntimeResult<Value> {
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        return int_op(*a, *b).map(Value::Int).ok_or_else(overflow);
    }
    match as_floats(left, right) {
        Some((a, b)) => Ok(Value::Float(float_op(a, b))),
        None => Err(unsupported(op, left, right)),
    }
}

fn add(left: &Value, right: &Value) -> RuntimeResult<Value> {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (Value::List(_), Value::List(_)) => {
            let mut items = left.list_items().unwrap_or_default();
            items.extend(right.list_items().unwrap_or_default());
            Ok(Value::list(items))
        }
        _ => arithmetic(BinOp::Add, left, right, i64::checked_add, |a, b| a + b),
    }
}

fn multiply(left: &Value, right: &Value) -> RuntimeResult<Value> {
    match (left, right) {
        (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
            let count = repeat_count(s.len(), *n)?;
            Ok(Value::Str(s.repeat(count)))
        }
        (Value::List(_), Value::Int(n)) | (Value::Int(n), Value::List(_)) => {
            let list = if matches!(left, Value::List(_)) { left } else { right };
            let items = list.list_items().unwrap_or_default();
            let count = repeat_count(items.len(), *n)?;
            let mut repeated = Vec::with_capacity(items.len() * count);
            for _ in 0..count {
                repeated.extend(items.iter().cloned());
            }
            Ok(Value::list(repeated))
        }
        _ => arithmetic(BinOp::Mul, left, right, i64::checked_mul, |a, b| a * b),
    }
}

/// Number of copies for `len`-sized sequence times `n`; negative counts give none
fn repeat_count(len: usize, n: i64) -> RuntimeResult<usize> {
    if len == 0 {
        return Ok(0);
    }
    let count = usize::try_from(n.max(0)).unwrap_or(usize::MAX);
    match len.checked_mul(count) {
        Some(total) if total <= MAX_REPEAT_LEN => Ok(count),
        _ => Err(RuntimeError::MemoryError(format!(
            "repeated sequence would exceed {} elements",
            MAX_REPEAT_LEN
        ))),
    }
}

/// Integer division floors; any float operand gives true division
fn divide(left: &Value, right: &Value) -> RuntimeResult<Value> {
    match (left, right) {
        (Value::Int(_), Value::Int(0)) => Err(zero_division("integer division by zero")),
        (Value::Int(a), Value::Int(b)) => {
            let quotient = a.checked_div(*b).ok_or_else(overflow)?;
            let floored = if a % b != 0 && ((*a < 0) != (*b < 0)) { quotient - 1 } else { quotient };
            Ok(Value::Int(floored))
        }
        _ => match as_floats(left, right) {
            Some((_, b)) if b == 0.0 => Err(zero_division("float division by zero")),
            Some((a, b)) => Ok(Value::Float(a / b)),
            None => Err(unsupported(BinOp::Div, left, right)),
        },
    }
}

/// The result takes the sign of the divisor
fn remainder(left: &Value, right: &Value) -> RuntimeResult<Value> {
    match (left, right) {
        (Value::Int(_), Value::Int(0)) => Err(zero_division("integer modulo by zero")),
        (Value::Int(a), Value::Int(b)) => {
            let r = a.checked_rem(*b).ok_or_else(overflow)?;
            Ok(Value::Int(if r != 0 && ((r < 0) != (*b < 0)) { r + b } else { r }))
        }
        _ => match as_floats(left, right) {
            Some((_, b)) if b == 0.0 => Err(zero_division("float modulo by zero")),
            Some((a, b)) => {
                let r = a % b;
                Ok(Value::Float(if r != 0.0 && ((r < 0.0) != (b < 0.0)) { r + b } else { r }))
            }
            None => Err(unsupported(BinOp::Rem, left, right)),
        },
    }
}

fn zero_division(message: &str) -> RuntimeError {
    RuntimeError::ZeroDivisionError(message.to_string())
}

/// Ordering comparison; any comparison involving NaN is false
fn compare(
    op: BinOp,
    left: &Value,
    right: &Value,
    holds: fn(Ordering) -> bool,
) -> RuntimeResult<Value> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        _ => match as_floats(left, right) {
            Some((a, b)) => return Ok(Value::Bool(a.partial_cmp(&b).is_some_and(holds))),
            None => {
                return Err(RuntimeError::TypeError(format!(
                    "'{}' not supported between '{}' and '{}'",
                    op,
                    left.type_name(),
                    right.type_name()
                )));
            }
        },
    };
    Ok(Value::Bool(holds(ordering)))
}
