//! Conversion between dynamic [`Value`]s and fixed-layout native buffers.
//!
//! The layer has four parts:
//!
//! - **shape** validates that a value is a vector or a rectangular matrix.
//! - **coerce** answers, without erroring, whether values fit a [`NumericKind`].
//! - **buffer** allocates zero-filled [`NativeVector`] / [`NativeMatrix`] storage.
//! - **marshal** moves data in both directions, plus in-place copies for
//!   reverse-communication loops.
//!
//! # Trust boundary
//!
//! Marshal-in is validated: a malformed value never reaches a native buffer.
//! Marshal-out and the in-place copies are not: they assume the buffer and its
//! counterpart already agree in size and report [`MarshalError::Index`] when
//! they do not. Callers own that invariant.
//!
//! ```
//! use numbridge_marshal::{from_native_vector, to_native_vector};
//! use numbridge_value::Value;
//!
//! let v = Value::list(vec![1.5, 2.5, -3.0]);
//! let native = to_native_vector::<f64>(&v, "v").unwrap();
//! assert_eq!(native.as_slice(), &[1.5, 2.5, -3.0]);
//! assert_eq!(from_native_vector(&native), v);
//! ```

pub mod buffer;
pub mod coerce;
pub mod erased;
pub mod error;
pub mod kind;
pub mod marshal;
pub mod shape;

pub use buffer::{
    allocate_matrix, allocate_vector, DimensionPolicy, NativeMatrix, NativeVector, RawMatrix,
    RawVector,
};
pub use coerce::{
    infer_kind, is_bool_matrix, is_bool_vector, is_coercible, is_coercible_bool,
    is_coercible_complex, is_coercible_int, is_coercible_kind, is_coercible_real,
    is_complex_matrix, is_complex_vector, is_int_matrix, is_int_vector, is_kind_matrix,
    is_kind_vector, is_matrix_of, is_real_matrix, is_real_vector, is_vector_of,
};
pub use erased::{MatrixBuffer, VectorBuffer};
pub use error::{MarshalError, Result};
pub use kind::{NativeComplex, NativeInt, NativeScalar, NumericKind, ValueShape};
pub use marshal::{
    copy_into_dynamic, copy_into_dynamic_matrix, copy_into_native, copy_into_native_matrix,
    from_native_matrix, from_native_vector, to_native_matrix, to_native_scalar, to_native_vector,
};
pub use numbridge_value::Value;
pub use shape::{validate_matrix_shape, validate_vector_shape};
