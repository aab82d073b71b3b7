//! Kind-erased buffers for callers that only know the numeric kind at runtime.

use numbridge_value::Value;

use crate::buffer::{DimensionPolicy, NativeMatrix, NativeVector, RawMatrix, RawVector};
use crate::error::Result;
use crate::kind::{NativeComplex, NativeInt, NumericKind};
use crate::marshal::{
    copy_into_dynamic, copy_into_dynamic_matrix, copy_into_native, copy_into_native_matrix,
    from_native_matrix, from_native_vector, to_native_matrix, to_native_vector,
};

#[derive(Debug, Clone, PartialEq)]
pub enum VectorBuffer {
    Boolean(NativeVector<bool>),
    Integer(NativeVector<NativeInt>),
    Real(NativeVector<f64>),
    Complex(NativeVector<NativeComplex>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatrixBuffer {
    Boolean(NativeMatrix<bool>),
    Integer(NativeMatrix<NativeInt>),
    Real(NativeMatrix<f64>),
    Complex(NativeMatrix<NativeComplex>),
}

macro_rules! each_vector {
    ($buf:expr, $v:ident => $body:expr) => {
        match $buf {
            VectorBuffer::Boolean($v) => $body,
            VectorBuffer::Integer($v) => $body,
            VectorBuffer::Real($v) => $body,
            VectorBuffer::Complex($v) => $body,
        }
    };
}

macro_rules! each_matrix {
    ($buf:expr, $m:ident => $body:expr) => {
        match $buf {
            MatrixBuffer::Boolean($m) => $body,
            MatrixBuffer::Integer($m) => $body,
            MatrixBuffer::Real($m) => $body,
            MatrixBuffer::Complex($m) => $body,
        }
    };
}

impl VectorBuffer {
    /// Zero-filled buffer of `count` elements under `policy`.
    pub fn allocate(kind: NumericKind, count: i64, policy: DimensionPolicy) -> Result<Self> {
        Ok(match kind {
            NumericKind::Boolean => VectorBuffer::Boolean(policy.allocate_vector(count)?),
            NumericKind::Integer => VectorBuffer::Integer(policy.allocate_vector(count)?),
            NumericKind::Real => VectorBuffer::Real(policy.allocate_vector(count)?),
            NumericKind::Complex => VectorBuffer::Complex(policy.allocate_vector(count)?),
        })
    }

    /// Validate `value` and marshal it in as `kind`.
    pub fn marshal_in(value: &Value, kind: NumericKind, label: &str) -> Result<Self> {
        Ok(match kind {
            NumericKind::Boolean => VectorBuffer::Boolean(to_native_vector(value, label)?),
            NumericKind::Integer => VectorBuffer::Integer(to_native_vector(value, label)?),
            NumericKind::Real => VectorBuffer::Real(to_native_vector(value, label)?),
            NumericKind::Complex => VectorBuffer::Complex(to_native_vector(value, label)?),
        })
    }

    pub fn marshal_out(&self) -> Value {
        each_vector!(self, v => from_native_vector(v))
    }

    /// In-place marshal-in; see [`copy_into_native`].
    pub fn copy_from(&mut self, value: &Value) -> Result<()> {
        each_vector!(self, v => copy_into_native(value, v))
    }

    /// In-place marshal-out; see [`copy_into_dynamic`].
    pub fn copy_to(&self, dst: &mut Value) -> Result<()> {
        each_vector!(self, v => copy_into_dynamic(v, dst))
    }

    pub fn kind(&self) -> NumericKind {
        each_vector!(self, v => v.kind())
    }

    pub fn len(&self) -> usize {
        each_vector!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn raw(&mut self) -> RawVector {
        each_vector!(self, v => v.raw())
    }
}

impl MatrixBuffer {
    pub fn allocate(
        kind: NumericKind,
        rows: i64,
        cols: i64,
        policy: DimensionPolicy,
    ) -> Result<Self> {
        Ok(match kind {
            NumericKind::Boolean => MatrixBuffer::Boolean(policy.allocate_matrix(rows, cols)?),
            NumericKind::Integer => MatrixBuffer::Integer(policy.allocate_matrix(rows, cols)?),
            NumericKind::Real => MatrixBuffer::Real(policy.allocate_matrix(rows, cols)?),
            NumericKind::Complex => MatrixBuffer::Complex(policy.allocate_matrix(rows, cols)?),
        })
    }

    pub fn marshal_in(value: &Value, kind: NumericKind, label: &str) -> Result<Self> {
        Ok(match kind {
            NumericKind::Boolean => MatrixBuffer::Boolean(to_native_matrix(value, label)?),
            NumericKind::Integer => MatrixBuffer::Integer(to_native_matrix(value, label)?),
            NumericKind::Real => MatrixBuffer::Real(to_native_matrix(value, label)?),
            NumericKind::Complex => MatrixBuffer::Complex(to_native_matrix(value, label)?),
        })
    }

    pub fn marshal_out(&self) -> Value {
        each_matrix!(self, m => from_native_matrix(m))
    }

    pub fn copy_from(&mut self, value: &Value) -> Result<()> {
        each_matrix!(self, m => copy_into_native_matrix(value, m))
    }

    pub fn copy_to(&self, dst: &mut Value) -> Result<()> {
        each_matrix!(self, m => copy_into_dynamic_matrix(m, dst))
    }

    pub fn kind(&self) -> NumericKind {
        each_matrix!(self, m => m.kind())
    }

    pub fn shape(&self) -> (usize, usize) {
        each_matrix!(self, m => m.shape())
    }

    pub fn is_empty(&self) -> bool {
        each_matrix!(self, m => m.is_empty())
    }

    pub fn raw(&mut self) -> RawMatrix {
        each_matrix!(self, m => m.raw())
    }
}
