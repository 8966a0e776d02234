//! Built-in functions available to every script

use crate::error::{RuntimeError, RuntimeResult};
use crate::output::{NativeContext, OutputStream};
use crate::value::{lock, Value};

/// Name of the built-in input primitive a host may replace
pub const INPUT: &str = "input";

/// All builtins, by name
pub fn builtins() -> Vec<(&'static str, Value)> {
    vec![
        ("print", Value::native("print", |ctx, args| write_joined(ctx, OutputStream::Stdout, &args))),
        ("eprint", Value::native("eprint", |ctx, args| write_joined(ctx, OutputStream::Stderr, &args))),
        (INPUT, Value::native(INPUT, default_input)),
        ("str", Value::native("str", |_, args| {
            let [value] = expect_args::<1>("str", args)?;
            Ok(Value::Str(value.to_string()))
        })),
        ("int", Value::native("int", |_, args| {
            let [value] = expect_args::<1>("int", args)?;
            to_int(&value).map(Value::Int)
        })),
        ("float", Value::native("float", |_, args| {
            let [value] = expect_args::<1>("float", args)?;
            to_float(&value).map(Value::Float)
        })),
        ("len", Value::native("len", |_, args| {
            let [value] = expect_args::<1>("len", args)?;
            let len = match &value {
                Value::Str(s) => s.chars().count(),
                Value::List(items) => lock(items).len(),
                other => {
                    return Err(RuntimeError::TypeError(format!(
                        "object of type '{}' has no len()",
                        other.type_name()
                    )));
                }
            };
            Ok(Value::Int(len as i64))
        })),
        ("range", Value::native("range", range)),
        ("push", Value::native("push", |_, args| {
            let [list, value] = expect_args::<2>("push", args)?;
            match &list {
                Value::List(items) => {
                    lock(items).push(value);
                    Ok(Value::None)
                }
                other => Err(RuntimeError::TypeError(format!(
                    "push() expects a list, not '{}'",
                    other.type_name()
                ))),
            }
        })),
        ("type", Value::native("type", |_, args| {
            let [value] = expect_args::<1>("type", args)?;
            Ok(Value::str(value.type_name()))
        })),
    ]
}

/// `print`/`eprint`: arguments joined by one space, written as one chunk
fn write_joined(ctx: &NativeContext, stream: OutputStream, args: &[Value]) -> RuntimeResult<Value> {
    let text = args.iter().map(Value::to_string).collect::<Vec<_>>().join(" ");
    ctx.write(stream, &text);
    Ok(Value::None)
}

/// Input before any terminal is attached
fn default_input(_: &NativeContext, _: Vec<Value>) -> RuntimeResult<Value> {
    Err(RuntimeError::InputUnavailable("input() has no terminal attached".to_string()))
}

fn range(_: &NativeContext, args: Vec<Value>) -> RuntimeResult<Value> {
    let bounds = args
        .iter()
        .map(|arg| match arg {
            Value::Int(n) => Ok(*n),
            other => Err(RuntimeError::TypeError(format!(
                "range() expects integers, not '{}'",
                other.type_name()
            ))),
        })
        .collect::<RuntimeResult<Vec<i64>>>()?;

    let (start, stop, step) = match bounds.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => {
            return Err(RuntimeError::TypeError(format!(
                "range() takes 1 to 3 arguments but {} were given",
                bounds.len()
            )));
        }
    };
    if step == 0 {
        return Err(RuntimeError::ValueError("range() step must not be zero".to_string()));
    }

    let mut values = Vec::new();
    let mut current = start;
    while (step > 0 && current < stop) || (step < 0 && current > stop) {
        values.push(Value::Int(current));
        current = match current.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(Value::list(values))
}

fn to_int(value: &Value) -> RuntimeResult<i64> {
    match value {
        Value::Int(n) => Ok(*n),
        Value::Bool(b) => Ok(*b as i64),
        Value::Float(x) if x.is_finite() => Ok(x.trunc() as i64),
        Value::Float(x) => Err(RuntimeError::ValueError(format!("cannot convert {:?} to int", x))),
        Value::Str(s) => s.trim().parse().map_err(|_| {
            RuntimeError::ValueError(format!("invalid literal for int(): {}", value.repr()))
        }),
        other => Err(RuntimeError::TypeError(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn to_float(value: &Value) -> RuntimeResult<f64> {
    match value {
        Value::Int(n) => Ok(*n as f64),
        Value::Float(x) => Ok(*x),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Str(s) => s.trim().parse().map_err(|_| {
            RuntimeError::ValueError(format!("could not convert string to float: {}", value.repr()))
        }),
        other => Err(RuntimeError::TypeError(format!(
            "float() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

/// Exactly `N` arguments, destructurable by the caller
fn expect_args<const N: usize>(name: &str, args: Vec<Value>) -> RuntimeResult<[Value; N]> {
    let given = args.len();
    args.try_into().map_err(|_| {
        RuntimeError::TypeError(format!("{}() takes {} argument(s) but {} were given", name, N, given))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn call(name: &str, args: Vec<Value>) -> RuntimeResult<Value> {
        let ctx = NativeContext::new(crate::output::discard());
        let (_, value) = builtins().into_iter().find(|(n, _)| *n == name).unwrap();
        match value {
            Value::Native(native) => native.call(&ctx, args),
            other => panic!("{name} is not native: {other:?}"),
        }
    }

    #[test]
    fn test_print_writes_one_chunk() {
        let chunks = Arc::new(Mutex::new(Vec::new()));
        let sink = chunks.clone();
        let ctx = NativeContext::new(Arc::new(move |stream: OutputStream, chunk: &str| {
            sink.lock().unwrap().push((stream, chunk.to_string()));
        }));
        write_joined(&ctx, OutputStream::Stdout, &[Value::str("a"), Value::Int(1), Value::Float(2.0)])
            .unwrap();
        assert_eq!(*chunks.lock().unwrap(), vec![(OutputStream::Stdout, "a 1 2.0".to_string())]);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(call("int", vec![Value::str(" 42 ")]).unwrap(), Value::Int(42));
        assert_eq!(call("int", vec![Value::Float(-2.7)]).unwrap(), Value::Int(-2));
        assert_eq!(call("float", vec![Value::str("1.5")]).unwrap(), Value::Float(1.5));
        assert_eq!(call("str", vec![Value::Float(3.0)]).unwrap(), Value::str("3.0"));
        let err = call("int", vec![Value::str("abc")]).unwrap_err();
        assert_eq!(err.to_string(), "ValueError: invalid literal for int(): \"abc\"");
    }

    #[test]
    fn test_range() {
        assert_eq!(call("range", vec![Value::Int(3)]).unwrap().to_string(), "[0, 1, 2]");
        assert_eq!(
            call("range", vec![Value::Int(5), Value::Int(0), Value::Int(-2)]).unwrap().to_string(),
            "[5, 3, 1]"
        );
        assert!(call("range", vec![Value::Int(1), Value::Int(2), Value::Int(0)]).is_err());
    }

    #[test]
    fn test_len_and_push() {
        let list = Value::list(vec![]);
        call("push", vec![list.clone(), Value::Int(7)]).unwrap();
        assert_eq!(call("len", vec![list]).unwrap(), Value::Int(1));
        assert_eq!(call("len", vec![Value::str("héllo")]).unwrap(), Value::Int(5));
        assert!(call("len", vec![Value::Int(1)]).is_err());
    }

    #[test]
    fn test_arity_is_checked() {
        let err = call("str", vec![]).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: str() takes 1 argument(s) but 0 were given");
    }

    #[test]
    fn test_default_input_raises() {
        assert!(matches!(call("input", vec![]), Err(RuntimeError::InputUnavailable(_))));
    }
}
