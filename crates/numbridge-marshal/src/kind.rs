//! Numeric kinds and their native element representations.

use num_complex::Complex64;
use numbridge_value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Native integer representation (`ptrdiff_t`-sized on 64-bit targets).
pub type NativeInt = i64;

/// Element type expected by, or produced from, a native slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericKind {
    Boolean,
    Integer,
    Real,
    Complex,
}

impl NumericKind {
    pub const ALL: [NumericKind; 4] = [
        NumericKind::Boolean,
        NumericKind::Integer,
        NumericKind::Real,
        NumericKind::Complex,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NumericKind::Boolean => "boolean",
            NumericKind::Integer => "integer",
            NumericKind::Real => "real",
            NumericKind::Complex => "complex",
        }
    }

    /// Parse a kind from its name or a common alias.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "bool" | "boolean" => Some(NumericKind::Boolean),
            "int" | "integer" | "i64" => Some(NumericKind::Integer),
            "real" | "f64" | "double" => Some(NumericKind::Real),
            "complex" | "c64" => Some(NumericKind::Complex),
            _ => None,
        }
    }

    /// Datatype code carried in raw buffer descriptors.
    pub fn tag(self) -> i64 {
        match self {
            NumericKind::Boolean => 1,
            NumericKind::Integer => 2,
            NumericKind::Real => 3,
            NumericKind::Complex => 4,
        }
    }

    pub fn from_tag(tag: i64) -> Option<Self> {
        NumericKind::ALL.into_iter().find(|k| k.tag() == tag)
    }
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shape class of a marshaled value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueShape {
    Scalar,
    Vector,
    Matrix,
}

impl fmt::Display for ValueShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueShape::Scalar => "scalar",
            ValueShape::Vector => "vector",
            ValueShape::Matrix => "matrix",
        })
    }
}

/// Complex element as laid out for the native side: two adjacent reals.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NativeComplex {
    pub re: f64,
    pub im: f64,
}

impl NativeComplex {
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}

impl From<Complex64> for NativeComplex {
    fn from(c: Complex64) -> Self {
        Self { re: c.re, im: c.im }
    }
}

impl From<NativeComplex> for Complex64 {
    fn from(c: NativeComplex) -> Self {
        Complex64::new(c.re, c.im)
    }
}

/// A scalar type that can live in a native buffer.
///
/// `coerce` is a trial conversion: it reports `None` instead of failing and
/// only accepts conversions that lose no information.
pub trait NativeScalar: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    const KIND: NumericKind;

    fn coerce(value: &Value) -> Option<Self>;

    fn into_value(self) -> Value;
}

impl NativeScalar for bool {
    const KIND: NumericKind = NumericKind::Boolean;

    fn coerce(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Int(0) => Some(false),
            Value::Int(1) => Some(true),
            Value::Num(n) if *n == 0.0 => Some(false),
            Value::Num(n) if *n == 1.0 => Some(true),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl NativeScalar for NativeInt {
    const KIND: NumericKind = NumericKind::Integer;

    fn coerce(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(NativeInt::from(*b)),
            Value::Int(i) => Some(*i),
            // 2^63 is exactly representable and is the first value out of range
            Value::Num(n)
                if n.is_finite()
                    && n.fract() == 0.0
                    && *n >= NativeInt::MIN as f64
                    && *n < NativeInt::MAX as f64 =>
            {
                Some(*n as NativeInt)
            }
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl NativeScalar for f64 {
    const KIND: NumericKind = NumericKind::Real;

    fn coerce(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Some(*i as f64),
            Value::Num(n) => Some(*n),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Num(self)
    }
}

impl NativeScalar for NativeComplex {
    const KIND: NumericKind = NumericKind::Complex;

    fn coerce(value: &Value) -> Option<Self> {
        match value {
            Value::Complex(re, im) => Some(NativeComplex::new(*re, *im)),
            other => f64::coerce(other).map(|re| NativeComplex::new(re, 0.0)),
        }
    }

    fn into_value(self) -> Value {
        Value::Complex(self.re, self.im)
    }
}
