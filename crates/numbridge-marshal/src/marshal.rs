//! Bidirectional conversion between dynamic values and native buffers.
//!
//! Marshal-in (`to_native_*`) validates shape and element kinds up front and
//! fails before any buffer is allocated. Marshal-out (`from_native_*`) and
//! the in-place copies (`copy_into_*`) do NOT validate sizes: they run after a
//! native call whose output shape is authoritative, or inside a
//! reverse-communication loop whose buffers were sized once by the caller. A
//! size disagreement there surfaces as `MarshalError::Index` at the first
//! offending position, after earlier elements have already been written.

use log::trace;
use numbridge_value::Value;

use crate::buffer::{allocate_matrix, allocate_vector, NativeMatrix, NativeVector};
use crate::coerce::{is_matrix_of, is_vector_of};
use crate::error::{MarshalError, Result};
use crate::kind::{NativeScalar, ValueShape};
use crate::shape::{validate_matrix_shape, validate_vector_shape};

/// Convert a dynamic vector into a fresh native vector of `T`.
///
/// `label` names the parameter in the error; pass `""` for a generic message.
pub fn to_native_vector<T: NativeScalar>(value: &Value, label: &str) -> Result<NativeVector<T>> {
    if !is_vector_of::<T>(value) {
        return Err(MarshalError::mismatch(label, T::KIND, ValueShape::Vector));
    }
    let len = validate_vector_shape(value)?;
    trace!("marshal-in {} vector '{label}' len={len}", T::KIND);
    let mut buffer = allocate_vector::<T>(len as i64);
    fill_vector(value, &mut buffer, label)?;
    Ok(buffer)
}

/// Convert a dynamic matrix into a fresh row-major native matrix of `T`.
pub fn to_native_matrix<T: NativeScalar>(value: &Value, label: &str) -> Result<NativeMatrix<T>> {
    if !is_matrix_of::<T>(value) {
        return Err(MarshalError::mismatch(label, T::KIND, ValueShape::Matrix));
    }
    let (rows, cols) = validate_matrix_shape(value)?;
    trace!("marshal-in {} matrix '{label}' {rows}x{cols}", T::KIND);
    let mut buffer = allocate_matrix::<T>(rows as i64, cols as i64);
    if rows > 0 {
        fill_matrix(value, &mut buffer, label)?;
    }
    Ok(buffer)
}

/// Convert a single dynamic scalar into `T`.
pub fn to_native_scalar<T: NativeScalar>(value: &Value, label: &str) -> Result<T> {
    T::coerce(value).ok_or_else(|| MarshalError::mismatch(label, T::KIND, ValueShape::Scalar))
}

/// Fresh dynamic list holding every element of `buffer`.
pub fn from_native_vector<T: NativeScalar>(buffer: &NativeVector<T>) -> Value {
    trace!("marshal-out {} vector len={}", T::KIND, buffer.len());
    if buffer.is_empty() {
        return Value::List(Vec::new());
    }
    Value::List(buffer.iter().map(|x| x.into_value()).collect())
}

/// Fresh dynamic list-of-lists; an empty buffer becomes `[[]]`.
pub fn from_native_matrix<T: NativeScalar>(buffer: &NativeMatrix<T>) -> Value {
    let (rows, cols) = buffer.shape();
    trace!("marshal-out {} matrix {rows}x{cols}", T::KIND);
    if rows == 0 || cols == 0 {
        return Value::empty_matrix();
    }
    Value::List(
        buffer
            .as_slice()
            .chunks(cols)
            .map(|row| Value::List(row.iter().map(|x| x.into_value()).collect()))
            .collect(),
    )
}

/// Copy a dynamic vector into an existing native buffer.
///
/// The buffer must already be at least as long as `value`.
pub fn copy_into_native<T: NativeScalar>(value: &Value, buffer: &mut NativeVector<T>) -> Result<()> {
    fill_vector(value, buffer, "")
}

/// Copy a dynamic matrix into an existing native matrix of matching shape.
pub fn copy_into_native_matrix<T: NativeScalar>(
    value: &Value,
    buffer: &mut NativeMatrix<T>,
) -> Result<()> {
    fill_matrix(value, buffer, "")
}

/// Copy a native buffer into an existing dynamic list, element by element.
///
/// `dst` must be a list at least as long as `buffer`.
pub fn copy_into_dynamic<T: NativeScalar>(buffer: &NativeVector<T>, dst: &mut Value) -> Result<()> {
    let what = dst.type_name();
    let items = dst
        .as_list_mut()
        .ok_or_else(|| MarshalError::Index(format!("{what} is not indexable")))?;
    let len = items.len();
    for (i, x) in buffer.iter().enumerate() {
        let slot = items
            .get_mut(i)
            .ok_or_else(|| MarshalError::out_of_range("list", i, len))?;
        *slot = x.into_value();
    }
    Ok(())
}

/// Copy a native matrix into an existing dynamic list-of-lists.
pub fn copy_into_dynamic_matrix<T: NativeScalar>(
    buffer: &NativeMatrix<T>,
    dst: &mut Value,
) -> Result<()> {
    let (rows, cols) = buffer.shape();
    if cols == 0 {
        return Ok(());
    }
    let what = dst.type_name();
    let dst_rows = dst
        .as_list_mut()
        .ok_or_else(|| MarshalError::Index(format!("{what} is not indexable")))?;
    let row_count = dst_rows.len();
    for r in 0..rows {
        let row = dst_rows
            .get_mut(r)
            .ok_or_else(|| MarshalError::out_of_range("row", r, row_count))?;
        let what = row.type_name();
        let items = row
            .as_list_mut()
            .ok_or_else(|| MarshalError::Index(format!("row {r} ({what}) is not indexable")))?;
        let len = items.len();
        for c in 0..cols {
            let slot = items
                .get_mut(c)
                .ok_or_else(|| MarshalError::out_of_range("column", c, len))?;
            if let Some(x) = buffer.get(r, c) {
                *slot = x.into_value();
            }
        }
    }
    Ok(())
}

fn fill_vector<T: NativeScalar>(value: &Value, buffer: &mut NativeVector<T>, label: &str) -> Result<()> {
    let items = value
        .as_list()
        .ok_or_else(|| MarshalError::Index(format!("{} is not indexable", value.type_name())))?;
    let len = buffer.len();
    for (i, item) in items.iter().enumerate() {
        let slot = buffer
            .get_mut(i)
            .ok_or_else(|| MarshalError::out_of_range("buffer", i, len))?;
        *slot = convert(item, label)?;
    }
    Ok(())
}

fn fill_matrix<T: NativeScalar>(value: &Value, buffer: &mut NativeMatrix<T>, label: &str) -> Result<()> {
    let rows = value
        .as_list()
        .ok_or_else(|| MarshalError::Index(format!("{} is not indexable", value.type_name())))?;
    let (buf_rows, buf_cols) = buffer.shape();
    for (r, row) in rows.iter().enumerate() {
        let items = row
            .as_list()
            .ok_or_else(|| MarshalError::Index(format!("row {r} ({}) is not indexable", row.type_name())))?;
        for (c, item) in items.iter().enumerate() {
            let slot = buffer.get_mut(r, c).ok_or_else(|| {
                MarshalError::Index(format!(
                    "element ({r}, {c}) out of range for {buf_rows}x{buf_cols} buffer"
                ))
            })?;
            *slot = convert(item, label)?;
        }
    }
    Ok(())
}

fn convert<T: NativeScalar>(item: &Value, label: &str) -> Result<T> {
    T::coerce(item).ok_or_else(|| MarshalError::mismatch(label, T::KIND, ValueShape::Scalar))
}
