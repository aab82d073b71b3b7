//! Dynamic host values crossing the numbridge boundary.
//!
//! A [`Value`] is what callers hand to the marshaling layer: a scalar, or a
//! `List` of values. Vectors are lists of scalars and matrices are lists of
//! lists; nothing in this crate enforces that shape, which is the job of
//! `numbridge-marshal`.

use num_complex::Complex64;
use std::convert::TryFrom;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Num(f64),
    // Complex scalar stored as (re, im)
    Complex(f64, f64),
    String(String),
    // Ordered sequence; nested lists form matrices
    List(Vec<Value>),
}

impl Value {
    /// Build a list value from anything convertible into values.
    pub fn list<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// Build a list-of-lists value from nested rows.
    pub fn matrix<T, R>(rows: impl IntoIterator<Item = R>) -> Self
    where
        T: Into<Value>,
        R: IntoIterator<Item = T>,
    {
        Value::List(rows.into_iter().map(|row| Value::list(row)).collect())
    }

    /// The canonical single-row empty matrix, `[[]]`.
    pub fn empty_matrix() -> Self {
        Value::List(vec![Value::List(Vec::new())])
    }

    pub fn complex(re: f64, im: f64) -> Self {
        Value::Complex(re, im)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Int(_) | Value::Num(_) | Value::Complex(_, _)
        )
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Num(_) => "real",
            Value::Complex(_, _) => "complex",
            Value::String(_) => "string",
            Value::List(_) => "list",
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
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Num(f)
    }
}

impl From<Complex64> for Value {
    fn from(c: Complex64) -> Self {
        Value::Complex(c.re, c.im)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::list(items)
    }
}

// Host-level extraction. Deliberately looser than the marshaling coercions:
// these mirror what a dynamic language does on an explicit cast.
impl TryFrom<&Value> for bool {
    type Error = String;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            Value::Num(n) => Ok(*n != 0.0),
            _ => Err(format!("cannot convert {} to bool", v.type_name())),
        }
    }
}

impl TryFrom<&Value> for i64 {
    type Error = String;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Int(i) => Ok(*i),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::Num(n) if n.is_finite() => Ok(*n as i64),
            _ => Err(format!("cannot convert {} to int", v.type_name())),
        }
    }
}

impl TryFrom<&Value> for f64 {
    type Error = String;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Num(n) => Ok(*n),
            Value::Int(i) => Ok(*i as f64),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            _ => Err(format!("cannot convert {} to real", v.type_name())),
        }
    }
}

impl TryFrom<&Value> for Complex64 {
    type Error = String;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::Complex(re, im) => Ok(Complex64::new(*re, *im)),
            other => f64::try_from(other)
                .map(|re| Complex64::new(re, 0.0))
                .map_err(|_| format!("cannot convert {} to complex", v.type_name())),
        }
    }
}

impl TryFrom<&Value> for String {
    type Error = String;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        match v {
            Value::String(s) => Ok(s.clone()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Num(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            _ => Err(format!("cannot convert {} to string", v.type_name())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Num(n) => write!(f, "{}", format_number_short_g(*n)),
            Value::Complex(re, im) => {
                let sign = if im.is_sign_negative() { '-' } else { '+' };
                write!(
                    f,
                    "{}{}{}i",
                    format_number_short_g(*re),
                    sign,
                    format_number_short_g(im.abs())
                )
            }
            Value::String(s) => write!(f, "'{s}'"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

fn format_number_short_g(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value.is_sign_negative() { "-Inf" } else { "Inf" }.to_string();
    }
    let abs = value.abs();
    if abs == 0.0 {
        return "0".to_string();
    }

    if !(1e-4..1e6).contains(&abs) {
        let s = format!("{value:.5e}");
        if let Some(idx) = s.find('e') {
            let (mantissa, exp) = s.split_at(idx);
            let mantissa = trim_fraction(mantissa);
            return format!("{mantissa}{exp}");
        }
        return s;
    }

    // Up to 12 significant digits in fixed notation
    let exp10 = abs.log10().floor() as i32;
    let decimals = (11 - exp10).clamp(0, 12) as usize;
    let s = format!("{value:.decimals$}");
    let s = trim_fraction(&s);
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if !s.contains('.') {
        return s;
    }
    s.trim_end_matches('0').trim_end_matches('.')
}
