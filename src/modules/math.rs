//! A supplemental `math` module, demonstrating that the module registry
//! hosts more than just `io`. Every native here is a free function over
//! `Value` arguments rather than a tuple/struct destructure, since the
//! calling convention has no structural pattern matching to express
//! "this native takes exactly two arguments" otherwise.

use crate::{common::value::Value, modules::register_native, vm::error::RuntimeError};

pub fn init(globals: &mut crate::common::table::StringTable<Value>) {
    register_native(globals, "math.abs", |args| {
        let n = expect_one(args, "math.abs")?;
        match n {
            Value::Int(n) => Ok(Value::Int(n.wrapping_abs())),
            Value::Float(n) => Ok(Value::Float(n.abs())),
            other => Err(type_error("math.abs", other)),
        }
    });
    register_native(globals, "math.sqrt", |args| {
        let n = expect_one(args, "math.sqrt")?;
        match n.as_float() {
            Some(n) => Ok(Value::Float(n.sqrt())),
            None => Err(type_error("math.sqrt", n)),
        }
    });
    register_native(globals, "math.pow", |args| {
        let (base, exponent) = expect_two(args, "math.pow")?;
        match (base.as_float(), exponent.as_float()) {
            (Some(base), Some(exponent)) => Ok(Value::Float(base.powf(exponent))),
            _ => Err(type_error("math.pow", base)),
        }
    });
    register_native(globals, "math.min", |args| {
        let (a, b) = expect_two(args, "math.min")?;
        pairwise_numeric(a, b, "math.min", i64::min, f64::min)
    });
    register_native(globals, "math.max", |args| {
        let (a, b) = expect_two(args, "math.max")?;
        pairwise_numeric(a, b, "math.max", i64::max, f64::max)
    });
}

fn expect_one<'a>(args: &'a [Value], name: &str) -> Result<&'a Value, RuntimeError> {
    match args {
        [a] => Ok(a),
        _ => Err(RuntimeError::new(format!("'{}' takes exactly one argument", name))),
    }
}

fn expect_two<'a>(args: &'a [Value], name: &str) -> Result<(&'a Value, &'a Value), RuntimeError> {
    match args {
        [a, b] => Ok((a, b)),
        _ => Err(RuntimeError::new(format!("'{}' takes exactly two arguments", name))),
    }
}

fn type_error(name: &str, value: &Value) -> RuntimeError {
    RuntimeError::new(format!("'{}' expects a numeric argument, got {}", name, value.type_name()))
}

/// Integer-preserving when both operands are integers, otherwise
/// promotes to float — mirroring the VM's own `ADD`/`SUB`/`MUL`
/// coercion rule rather than always widening to float.
fn pairwise_numeric(
    a: &Value,
    b: &Value,
    name: &str,
    int_op: fn(i64, i64) -> i64,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(int_op(*a, *b))),
        _ => match (a.as_float(), b.as_float()) {
            (Some(a), Some(b)) => Ok(Value::Float(float_op(a, b))),
            _ => Err(type_error(name, a)),
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn abs_preserves_int() {
        let mut globals = crate::common::table::StringTable::new();
        init(&mut globals);
        let abs = match globals.get("math.abs") {
            Some(Value::Native(f)) => f.clone(),
            _ => panic!("math.abs was not registered"),
        };
        assert_eq!(abs.call(&[Value::Int(-5)]).unwrap(), Value::Int(5));
    }

    #[test]
    fn min_of_two_ints_is_int() {
        assert_eq!(pairwise_numeric(&Value::Int(3), &Value::Int(7), "math.min", i64::min, f64::min).unwrap(), Value::Int(3));
    }

    #[test]
    fn min_of_mixed_numeric_promotes_to_float() {
        assert_eq!(
            pairwise_numeric(&Value::Int(3), &Value::Float(7.5), "math.min", i64::min, f64::min).unwrap(),
            Value::Float(3.0)
        );
    }

    #[test]
    fn wrong_arity_is_a_runtime_error() {
        assert!(expect_two(&[Value::Int(1)], "math.min").is_err());
    }
}
