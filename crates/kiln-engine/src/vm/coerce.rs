//! Value coercions
//!
//! Conversions performed when a value-type class is called as a function and
//! when a typed slot receives a value.

use std::sync::Arc;

use crate::vm::value::Value;
use crate::vm::{VmError, VmResult};

const TWO_32: f64 = 4_294_967_296.0;
const TWO_31: f64 = 2_147_483_648.0;

/// Coercion applied by a class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// No conversion (`*`)
    Any,
    /// Generic object coercion: null stays null, undefined is rejected
    Object,
    /// Signed 32-bit integer
    Int,
    /// Unsigned 32-bit integer
    UInt,
    /// Double
    Number,
    /// Boolean
    Boolean,
    /// String (null and undefined become null)
    String,
    /// Instance check against the coercing class
    Instance,
}

impl Coercion {
    /// Apply a coercion that does not depend on a class.
    ///
    /// `Instance` needs the class and is handled by `Class::coerce`; here it
    /// behaves like `Any`.
    pub fn apply(self, value: &Value) -> VmResult<Value> {
        Ok(match self {
            Coercion::Any | Coercion::Instance => value.clone(),
            Coercion::Object => coerce_object(value)?,
            Coercion::Int => Value::Int(coerce_int(value)),
            Coercion::UInt => Value::UInt(coerce_uint(value)),
            Coercion::Number => Value::Number(to_number(value)),
            Coercion::Boolean => Value::Bool(to_boolean(value)),
            Coercion::String => {
                if value.is_nullish() {
                    Value::Null
                } else {
                    Value::String(Arc::from(to_string(value)))
                }
            }
        })
    }
}

/// Generic object coercion
pub fn coerce_object(value: &Value) -> VmResult<Value> {
    match value {
        Value::Undefined => Err(VmError::TypeError(
            "cannot coerce undefined to Object".to_string(),
        )),
        other => Ok(other.clone()),
    }
}

/// Coerce to `int` (two's-complement wraparound)
pub fn coerce_int(value: &Value) -> i32 {
    match value {
        Value::Int(i) => *i,
        Value::UInt(u) => *u as i32,
        other => to_int32(to_number(other)),
    }
}

/// Coerce to `uint` (modulo 2^32)
pub fn coerce_uint(value: &Value) -> u32 {
    match value {
        Value::UInt(u) => *u,
        Value::Int(i) => *i as u32,
        other => to_uint32(to_number(other)),
    }
}

/// ToInt32 on a double
pub fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    let m = n.trunc().rem_euclid(TWO_32);
    if m >= TWO_31 {
        (m - TWO_32) as i32
    } else {
        m as i32
    }
}

/// ToUint32 on a double
pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(TWO_32) as u32
}

/// ToNumber
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Undefined => f64::NAN,
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Int(i) => *i as f64,
        Value::UInt(u) => *u as f64,
        Value::Number(n) => *n,
        Value::String(s) => string_to_number(s),
        Value::Object(_) | Value::Function(_) => f64::NAN,
    }
}

fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |v| v as f64);
    }
    // Rust accepts "inf" and "nan" spellings that ActionScript does not.
    if s.bytes().any(|b| b.is_ascii_alphabetic() && b != b'e' && b != b'E') {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

/// ToBoolean
pub fn to_boolean(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::UInt(u) => *u != 0,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::String(s) => !s.is_empty(),
        Value::Object(_) | Value::Function(_) => true,
    }
}

/// ToString
pub fn to_string(value: &Value) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::UInt(u) => u.to_string(),
        Value::Number(n) => number_to_string(*n),
        Value::String(s) => s.to_string(),
        Value::Object(_) => "[object Object]".to_string(),
        Value::Function(_) => "function Function() {}".to_string(),
    }
}

/// Format a double the way ActionScript prints numbers
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
