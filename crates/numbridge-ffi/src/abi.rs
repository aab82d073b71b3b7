//! The C calling convention shared with native entry points.
//!
//! Every entry point receives an array of [`NativeSlot`]s, inputs first and
//! outputs after, and returns a status code where `0` means success:
//!
//! ```c
//! typedef struct { int64_t cnt, datatype; void *ptr; } nb_vector;
//! typedef struct { int64_t rows, cols, stride, datatype; void *ptr; } nb_matrix;
//! typedef struct {
//!     int64_t datatype;        /* 1 bool, 2 int, 3 real, 4 complex */
//!     int32_t shape;           /* 0 scalar, 1 vector, 2 matrix */
//!     int32_t is_output;
//!     union { bool b; int64_t i; double r; struct { double re, im; } c; } scalar;
//!     nb_vector vector;
//!     nb_matrix matrix;
//! } nb_slot;
//!
//! int32_t entry(nb_slot *slots, size_t count);
//! ```
//!
//! Buffers are owned by the host and sized before the call. Scalar outputs are
//! written to the slot's scalar cell; array outputs are written through the
//! descriptor pointers.

use numbridge_marshal::{
    NativeComplex, NativeInt, NumericKind, RawMatrix, RawVector, ValueShape,
};
use numbridge_value::Value;

pub type EntryPoint = unsafe extern "C" fn(slots: *mut NativeSlot, count: usize) -> i32;

pub const SHAPE_SCALAR: i32 = 0;
pub const SHAPE_VECTOR: i32 = 1;
pub const SHAPE_MATRIX: i32 = 2;

pub fn shape_tag(shape: ValueShape) -> i32 {
    match shape {
        ValueShape::Scalar => SHAPE_SCALAR,
        ValueShape::Vector => SHAPE_VECTOR,
        ValueShape::Matrix => SHAPE_MATRIX,
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union ScalarCell {
    pub boolean: bool,
    pub integer: NativeInt,
    pub real: f64,
    pub complex: NativeComplex,
}

impl ScalarCell {
    /// A cell with all bytes initialized to zero. Cells handed to native code
    /// start from here so any field can be read back.
    pub fn zeroed() -> Self {
        ScalarCell {
            complex: NativeComplex::new(0.0, 0.0),
        }
    }

    pub fn boolean(b: bool) -> Self {
        let mut cell = Self::zeroed();
        cell.boolean = b;
        cell
    }

    pub fn integer(i: NativeInt) -> Self {
        let mut cell = Self::zeroed();
        cell.integer = i;
        cell
    }

    pub fn real(r: f64) -> Self {
        let mut cell = Self::zeroed();
        cell.real = r;
        cell
    }

    pub fn complex(c: NativeComplex) -> Self {
        ScalarCell { complex: c }
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct NativeSlot {
    pub datatype: i64,
    pub shape: i32,
    pub is_output: i32,
    pub scalar: ScalarCell,
    pub vector: RawVector,
    pub matrix: RawMatrix,
}

impl NativeSlot {
    fn blank(kind: NumericKind, shape: ValueShape, is_output: bool) -> Self {
        Self {
            datatype: kind.tag(),
            shape: shape_tag(shape),
            is_output: i32::from(is_output),
            scalar: ScalarCell::zeroed(),
            vector: RawVector::null(),
            matrix: RawMatrix::null(),
        }
    }

    pub fn scalar(kind: NumericKind, cell: ScalarCell, is_output: bool) -> Self {
        Self {
            scalar: cell,
            ..Self::blank(kind, ValueShape::Scalar, is_output)
        }
    }

    pub fn vector(kind: NumericKind, raw: RawVector, is_output: bool) -> Self {
        Self {
            vector: raw,
            ..Self::blank(kind, ValueShape::Vector, is_output)
        }
    }

    pub fn matrix(kind: NumericKind, raw: RawMatrix, is_output: bool) -> Self {
        Self {
            matrix: raw,
            ..Self::blank(kind, ValueShape::Matrix, is_output)
        }
    }

    pub fn kind(&self) -> Option<NumericKind> {
        NumericKind::from_tag(self.datatype)
    }

    /// Read the scalar cell as a dynamic value of the slot's kind.
    pub fn scalar_value(&self) -> Option<Value> {
        let kind = self.kind()?;
        // SAFETY: cells are built from `ScalarCell::zeroed`, so all bytes are
        // initialized. Booleans are read as a byte since native code may store
        // any non-zero value.
        unsafe {
            Some(match kind {
                NumericKind::Boolean => {
                    let byte = *std::ptr::addr_of!(self.scalar).cast::<u8>();
                    Value::Bool(byte != 0)
                }
                NumericKind::Integer => Value::Int(self.scalar.integer),
                NumericKind::Real => Value::Num(self.scalar.real),
                NumericKind::Complex => {
                    let c = self.scalar.complex;
                    Value::Complex(c.re, c.im)
                }
            })
        }
    }
}

impl std::fmt::Debug for NativeSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeSlot")
            .field("datatype", &self.datatype)
            .field("shape", &self.shape)
            .field("is_output", &self.is_output)
            .field("vector", &self.vector)
            .field("matrix", &self.matrix)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_cells_read_back_by_kind() {
        let slot = NativeSlot::scalar(NumericKind::Integer, ScalarCell::integer(-7), false);
        assert_eq!(slot.scalar_value(), Some(Value::Int(-7)));

        let mut slot = NativeSlot::scalar(NumericKind::Boolean, ScalarCell::zeroed(), true);
        assert_eq!(slot.scalar_value(), Some(Value::Bool(false)));
        slot.scalar.boolean = true;
        assert_eq!(slot.scalar_value(), Some(Value::Bool(true)));

        let slot = NativeSlot::scalar(
            NumericKind::Complex,
            ScalarCell::complex(NativeComplex::new(1.0, -2.0)),
            false,
        );
        assert_eq!(slot.scalar_value(), Some(Value::Complex(1.0, -2.0)));
    }

    #[test]
    fn unknown_datatype_has_no_scalar() {
        let mut slot = NativeSlot::scalar(NumericKind::Real, ScalarCell::zeroed(), false);
        slot.datatype = 42;
        assert_eq!(slot.scalar_value(), None);
    }
}
