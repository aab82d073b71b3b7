//! Call signatures for native entry points.

use numbridge_marshal::{
    to_native_scalar, validate_matrix_shape, validate_vector_shape, NativeInt, NumericKind,
    ValueShape,
};
use numbridge_value::Value;
use std::fmt;

use crate::error::{CallError, Result};

/// Kind and shape of a parameter or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamType {
    pub kind: NumericKind,
    pub shape: ValueShape,
}

impl ParamType {
    pub fn scalar(kind: NumericKind) -> Self {
        Self { kind, shape: ValueShape::Scalar }
    }

    pub fn vector(kind: NumericKind) -> Self {
        Self { kind, shape: ValueShape::Vector }
    }

    pub fn matrix(kind: NumericKind) -> Self {
        Self { kind, shape: ValueShape::Matrix }
    }

    /// Number of size expressions a declaration of this type carries.
    pub fn rank(&self) -> usize {
        match self.shape {
            ValueShape::Scalar => 0,
            ValueShape::Vector => 1,
            ValueShape::Matrix => 2,
        }
    }

    /// Parse `real`, `vec<real>`, `mat<complex>`, ...
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let inner = |prefix: &str| {
            s.strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix('>'))
                .and_then(NumericKind::parse)
        };
        if let Some(kind) = inner("vec<") {
            return Some(Self::vector(kind));
        }
        if let Some(kind) = inner("mat<") {
            return Some(Self::matrix(kind));
        }
        NumericKind::parse(s).map(Self::scalar)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shape {
            ValueShape::Scalar => write!(f, "{}", short_kind(self.kind)),
            ValueShape::Vector => write!(f, "vec<{}>", short_kind(self.kind)),
            ValueShape::Matrix => write!(f, "mat<{}>", short_kind(self.kind)),
        }
    }
}

fn short_kind(kind: NumericKind) -> &'static str {
    match kind {
        NumericKind::Boolean => "bool",
        NumericKind::Integer => "int",
        NumericKind::Real => "real",
        NumericKind::Complex => "complex",
    }
}

/// A size computed from the arguments of a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeExpr {
    /// Length of a vector parameter
    Len(String),
    /// Row count of a matrix parameter
    Rows(String),
    /// Column count of a matrix parameter
    Cols(String),
    /// Value of an integer scalar parameter
    Param(String),
    Const(usize),
}

impl SizeExpr {
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(n) = s.parse::<usize>() {
            return Some(SizeExpr::Const(n));
        }
        if let Some(open) = s.find('(') {
            let func = s[..open].trim();
            let arg = s[open + 1..].strip_suffix(')')?.trim();
            if !is_ident(arg) {
                return None;
            }
            return match func {
                "len" => Some(SizeExpr::Len(arg.to_string())),
                "rows" => Some(SizeExpr::Rows(arg.to_string())),
                "cols" => Some(SizeExpr::Cols(arg.to_string())),
                _ => None,
            };
        }
        is_ident(s).then(|| SizeExpr::Param(s.to_string()))
    }

    /// Parameter this expression reads, if any.
    pub fn referenced(&self) -> Option<&str> {
        match self {
            SizeExpr::Len(p) | SizeExpr::Rows(p) | SizeExpr::Cols(p) | SizeExpr::Param(p) => {
                Some(p)
            }
            SizeExpr::Const(_) => None,
        }
    }

    /// Shape the referenced parameter must have for this expression to make sense.
    pub fn required_type(&self) -> Option<ParamType> {
        match self {
            SizeExpr::Len(_) => Some(ParamType { kind: NumericKind::Real, shape: ValueShape::Vector }),
            SizeExpr::Rows(_) | SizeExpr::Cols(_) => {
                Some(ParamType { kind: NumericKind::Real, shape: ValueShape::Matrix })
            }
            SizeExpr::Param(_) => Some(ParamType::scalar(NumericKind::Integer)),
            SizeExpr::Const(_) => None,
        }
    }

    /// Evaluate against the value bound to the referenced parameter.
    pub fn eval(&self, bound: Option<&Value>) -> Result<i64> {
        if let SizeExpr::Const(n) = self {
            return Ok(*n as i64);
        }
        let value =
            bound.ok_or_else(|| CallError::Signature(format!("size expression '{self}' is unbound")))?;
        Ok(match self {
            SizeExpr::Len(_) => validate_vector_shape(value)? as i64,
            SizeExpr::Rows(_) => validate_matrix_shape(value)?.0 as i64,
            SizeExpr::Cols(_) => validate_matrix_shape(value)?.1 as i64,
            SizeExpr::Param(name) => to_native_scalar::<NativeInt>(value, name)?,
            SizeExpr::Const(n) => *n as i64,
        })
    }
}

impl fmt::Display for SizeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeExpr::Len(p) => write!(f, "len({p})"),
            SizeExpr::Rows(p) => write!(f, "rows({p})"),
            SizeExpr::Cols(p) => write!(f, "cols({p})"),
            SizeExpr::Param(p) => write!(f, "{p}"),
            SizeExpr::Const(n) => write!(f, "{n}"),
        }
    }
}

pub(crate) fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A declared input parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: ParamType,
    /// Sizes the argument must have when the call uses the short form.
    pub dims: Vec<SizeExpr>,
    /// Present for size parameters the short form computes instead of taking.
    pub derived: Option<SizeExpr>,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self { name: name.into(), ty, dims: Vec::new(), derived: None }
    }

    pub fn with_dims(mut self, dims: Vec<SizeExpr>) -> Self {
        self.dims = dims;
        self
    }

    pub fn derived_from(mut self, expr: SizeExpr) -> Self {
        self.derived = Some(expr);
        self
    }
}

/// A declared output; its buffer is allocated by the host from `dims`.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub ty: ParamType,
    pub dims: Vec<SizeExpr>,
}

impl Output {
    pub fn new(ty: ParamType, dims: Vec<SizeExpr>) -> Self {
        Self { ty, dims }
    }
}

/// A function signature for FFI calls.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSignature {
    /// Function name in the native library
    pub name: String,
    pub params: Vec<Param>,
    pub outputs: Vec<Output>,
}

impl CallSignature {
    pub fn new(name: impl Into<String>, params: Vec<Param>, outputs: Vec<Output>) -> Self {
        Self { name: name.into(), params, outputs }
    }

    /// Argument count when every parameter is supplied.
    pub fn full_arity(&self) -> usize {
        self.params.len()
    }

    /// Argument count when derived size parameters are omitted.
    pub fn short_arity(&self) -> Option<usize> {
        let derived = self.params.iter().filter(|p| p.derived.is_some()).count();
        (derived > 0).then(|| self.params.len() - derived)
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    /// Check that every size expression refers to a parameter of a suitable shape.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (i, param) in self.params.iter().enumerate() {
            if self.params[..i].iter().any(|p| p.name == param.name) {
                return Err(format!("duplicate parameter '{}'", param.name));
            }
            // Parameter sizes are optional; outputs always need them.
            if !param.dims.is_empty() && param.dims.len() != param.ty.rank() {
                return Err(format!(
                    "parameter '{}' of type {} takes {} size(s), got {}",
                    param.name,
                    param.ty,
                    param.ty.rank(),
                    param.dims.len()
                ));
            }
            if let Some(expr) = &param.derived {
                if param.ty != ParamType::scalar(NumericKind::Integer) {
                    return Err(format!("derived parameter '{}' must be int", param.name));
                }
                if let Some(target) = expr.referenced().and_then(|r| self.param_index(r)) {
                    if self.params[target].derived.is_some() {
                        return Err(format!(
                            "derived parameter '{}' depends on derived parameter '{}'",
                            param.name, self.params[target].name
                        ));
                    }
                }
            }
            for expr in param.dims.iter().chain(param.derived.iter()) {
                self.check_reference(expr)?;
            }
        }
        for output in &self.outputs {
            if output.dims.len() != output.ty.rank() {
                return Err(format!(
                    "output {} takes {} size(s), got {}",
                    output.ty,
                    output.ty.rank(),
                    output.dims.len()
                ));
            }
            for expr in &output.dims {
                self.check_reference(expr)?;
            }
        }
        Ok(())
    }

    fn check_reference(&self, expr: &SizeExpr) -> std::result::Result<(), String> {
        let (Some(name), Some(required)) = (expr.referenced(), expr.required_type()) else {
            return Ok(());
        };
        let param = self
            .params
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| format!("'{expr}' refers to unknown parameter '{name}'"))?;
        let fits = match required.shape {
            ValueShape::Scalar => param.ty == required,
            shape => param.ty.shape == shape,
        };
        if !fits {
            return Err(format!("'{expr}' cannot be applied to {} '{name}'", param.ty));
        }
        Ok(())
    }
}

impl fmt::Display for CallSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: (", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", p.ty, p.name)?;
            write_dims(f, &p.dims)?;
            if let Some(expr) = &p.derived {
                write!(f, " = {expr}")?;
            }
        }
        write!(f, ") -> ")?;
        match self.outputs.as_slice() {
            [] => write!(f, "void"),
            [single] => write_output(f, single),
            many => {
                write!(f, "(")?;
                for (i, o) in many.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_output(f, o)?;
                }
                write!(f, ")")
            }
        }
    }
}

fn write_output(f: &mut fmt::Formatter<'_>, output: &Output) -> fmt::Result {
    write!(f, "{}", output.ty)?;
    write_dims(f, &output.dims)
}

fn write_dims(f: &mut fmt::Formatter<'_>, dims: &[SizeExpr]) -> fmt::Result {
    if dims.is_empty() {
        return Ok(());
    }
    write!(f, "[")?;
    for (i, d) in dims.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{d}")?;
    }
    write!(f, "]")
}
