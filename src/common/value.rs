use std::{fmt, rc::Rc};

use crate::vm::error::RuntimeError;

/// A native function's Rust-side implementation. Receives the argument
/// slice from the calling convention and returns a single value or a
/// fatal error.
pub type NativeImpl = dyn Fn(&[Value]) -> Result<Value, RuntimeError>;

/// A value bound to a qualified name in the globals table, wrapping a
/// host-language function.
#[derive(Clone)]
pub struct NativeFn {
    pub name: &'static str,
    implementation: Rc<NativeImpl>,
}

impl NativeFn {
    pub fn new(name: &'static str, implementation: impl Fn(&[Value]) -> Result<Value, RuntimeError> + 'static) -> NativeFn {
        NativeFn { name, implementation: Rc::new(implementation) }
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, RuntimeError> {
        (self.implementation)(args)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFn({})", self.name)
    }
}

impl PartialEq for NativeFn {
    fn eq(&self, other: &NativeFn) -> bool {
        Rc::ptr_eq(&self.implementation, &other.implementation)
    }
}

/// Satori's tagged value union. Strings are owned, process-lifetime
/// allocations — the VM does not reclaim heap strings ahead of its own
/// teardown, so `String` here is an ordinary `String`; Rust's drop glue
/// frees it when the owning `Value` (e.g. a constant-pool slot) is
/// dropped, which in practice is "never, until the VM itself is torn
/// down".
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// `Rc`-wrapped so that cloning a `Value` (e.g. pushing a constant
    /// pool entry onto the stack) never allocates, while two distinct
    /// string literals remain distinct allocations — the pointer
    /// identity `PartialEq` below depends on this.
    String(Rc<String>),
    Native(NativeFn),
    /// Reserved for future heap-object extension; unused for now.
    Object,
}

impl Value {
    pub fn string(s: impl Into<String>) -> Value {
        Value::String(Rc::new(s.into()))
    }

    /// `nil` and boolean `false` are falsy; every other value (including
    /// `0`, `0.0`, and the empty string) is truthy.
    pub fn truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Coerces a numeric value to `f64`. Used by the comparison opcodes
    /// and by mixed-type arithmetic.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Native(_) => "native function",
            Value::Object => "object",
        }
    }
}

/// Structural equality for `OP_EQUAL`/`OP_NOT_EQ`: nil equals only nil;
/// booleans and integers compare by value; floats compare by IEEE-754
/// equality (`NaN` is never equal to anything, even itself); strings
/// compare by identity of the stored payload, since there is no
/// VM-wide string intern table to compare by content against;
/// cross-type comparisons are `false`.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Native(n) => write!(f, "<native {}>", n.name),
            Value::Object => write!(f, "<object>"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Nil.truthy());
        assert!(!Value::Bool(false).truthy());
        assert!(Value::Bool(true).truthy());
        assert!(Value::Int(0).truthy());
        assert!(Value::Float(0.0).truthy());
        assert!(Value::string("").truthy());
    }

    #[test]
    fn nan_not_equal_to_itself() {
        let nan = Value::Float(f64::NAN);
        assert_ne!(nan, nan);
    }

    #[test]
    fn cross_type_equality_is_false() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Nil, Value::Bool(false));
    }

    #[test]
    fn string_equality_is_by_identity_not_content() {
        let a = Value::string("hi");
        let b = Value::string("hi");
        assert_ne!(a, b, "distinct string literals must compare unequal");
        assert_eq!(a, a.clone());
    }
}
