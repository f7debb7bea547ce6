//! Runtime values

use std::fmt;
use std::sync::Arc;

use crate::vm::function::FunctionRef;
use crate::vm::object::ObjectRef;

/// A runtime value
///
/// Primitives are stored inline; objects and functions are shared references
/// compared by identity.
#[derive(Clone)]
pub enum Value {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// Boolean primitive
    Bool(bool),
    /// Signed 32-bit integer (`int`)
    Int(i32),
    /// Unsigned 32-bit integer (`uint`)
    UInt(u32),
    /// Double (`Number`)
    Number(f64),
    /// String primitive
    String(Arc<str>),
    /// Object reference
    Object(ObjectRef),
    /// Function reference
    Function(FunctionRef),
}

impl Value {
    /// Create a string value
    pub fn string(s: &str) -> Self {
        Value::String(Arc::from(s))
    }

    /// Check if the value is `undefined`
    #[inline]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Check if the value is `null`
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if the value is `null` or `undefined`
    #[inline]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Null | Value::Undefined)
    }

    /// Check if the value is any numeric primitive
    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::UInt(_) | Value::Number(_))
    }

    /// Numeric payload of a numeric primitive
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::UInt(u) => Some(*u as f64),
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Object payload
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Function payload
    pub fn as_function(&self) -> Option<&FunctionRef> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "Boolean",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::Object(_) => "Object",
            Value::Function(_) => "Function",
        }
    }
}

impl PartialEq for Value {
    /// Strict equality: numbers compare by value across representations,
    /// objects and functions by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}i", i),
            Value::UInt(u) => write!(f, "{}u", u),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Object(o) => write!(f, "Object [#{}]", o.id()),
            Value::Function(func) => write!(f, "Function {} [#{}]", func.name(), func.id()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<u32> for Value {
    fn from(u: u32) -> Self {
        Value::UInt(u)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

impl From<FunctionRef> for Value {
    fn from(f: FunctionRef) -> Self {
        Value::Function(f)
    }
}
