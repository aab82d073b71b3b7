//! Native-compatible numeric buffers and their allocators.
//!
//! Vectors are contiguous, matrices are row-major with `stride == cols`.
//! `RawVector` / `RawMatrix` are the `#[repr(C)]` descriptors handed to the
//! native side; they borrow the buffer's storage and must not outlive it.

use serde::{Deserialize, Serialize};
use std::ffi::c_void;

use crate::error::{MarshalError, Result};
use crate::kind::{NativeScalar, NumericKind};

#[derive(Debug, Clone, PartialEq)]
pub struct NativeVector<T> {
    data: Vec<T>,
}

impl<T: NativeScalar> NativeVector<T> {
    pub fn zeros(len: usize) -> Self {
        Self {
            data: vec![T::default(); len],
        }
    }

    pub fn empty() -> Self {
        Self { data: Vec::new() }
    }

    pub fn from_vec(data: Vec<T>) -> Self {
        Self { data }
    }

    pub fn kind(&self) -> NumericKind {
        T::KIND
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.data.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.data.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn as_ptr(&self) -> *const T {
        self.data.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.data.as_mut_ptr()
    }

    /// Descriptor for passing this buffer to native code.
    pub fn raw(&mut self) -> RawVector {
        RawVector {
            cnt: self.data.len() as i64,
            datatype: T::KIND.tag(),
            ptr: self.data.as_mut_ptr().cast(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeMatrix<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T: NativeScalar> NativeMatrix<T> {
    /// Zero-filled `rows x cols` matrix. Fails when the element count does
    /// not fit in addressable memory.
    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Ok(Self::empty());
        }
        let len = element_count::<T>(&[rows, cols]).ok_or_else(|| too_large(&[rows, cols]))?;
        Ok(Self {
            data: vec![T::default(); len],
            rows,
            cols,
        })
    }

    /// The degenerate 1x0 matrix every empty shape collapses to.
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            rows: 1,
            cols: 0,
        }
    }

    pub fn from_row_major(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(MarshalError::Shape(format!(
                "data length {} doesn't match dimensions {rows}x{cols}",
                data.len()
            )));
        }
        if data.is_empty() {
            return Ok(Self::empty());
        }
        Ok(Self { data, rows, cols })
    }

    pub fn kind(&self) -> NumericKind {
        T::KIND
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn stride(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.data.get(row * self.cols + col)
    }

    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut T> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.data.get_mut(row * self.cols + col)
    }

    pub fn row(&self, row: usize) -> Option<&[T]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.cols;
        self.data.get(start..start + self.cols)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn as_ptr(&self) -> *const T {
        self.data.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.data.as_mut_ptr()
    }

    pub fn raw(&mut self) -> RawMatrix {
        RawMatrix {
            rows: self.rows as i64,
            cols: self.cols as i64,
            stride: self.cols as i64,
            datatype: T::KIND.tag(),
            ptr: self.data.as_mut_ptr().cast(),
        }
    }
}

/// C view of a vector buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawVector {
    pub cnt: i64,
    pub datatype: i64,
    pub ptr: *mut c_void,
}

/// C view of a row-major matrix buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawMatrix {
    pub rows: i64,
    pub cols: i64,
    pub stride: i64,
    pub datatype: i64,
    pub ptr: *mut c_void,
}

impl RawVector {
    pub fn null() -> Self {
        Self {
            cnt: 0,
            datatype: 0,
            ptr: std::ptr::null_mut(),
        }
    }

    /// View the described elements as `T`.
    ///
    /// Returns `None` when the datatype tag does not match `T`.
    ///
    /// # Safety
    ///
    /// `ptr` must point to `cnt` initialized elements that stay alive and
    /// unaliased for the returned lifetime.
    pub unsafe fn as_mut_slice<'a, T: NativeScalar>(&self) -> Option<&'a mut [T]> {
        if self.datatype != T::KIND.tag() {
            return None;
        }
        if self.cnt <= 0 || self.ptr.is_null() {
            return Some(&mut []);
        }
        Some(std::slice::from_raw_parts_mut(
            self.ptr.cast::<T>(),
            self.cnt as usize,
        ))
    }
}

impl RawMatrix {
    pub fn null() -> Self {
        Self {
            rows: 0,
            cols: 0,
            stride: 0,
            datatype: 0,
            ptr: std::ptr::null_mut(),
        }
    }

    /// View the described storage (`rows * stride` elements) as `T`.
    ///
    /// # Safety
    ///
    /// Same contract as [`RawVector::as_mut_slice`].
    pub unsafe fn as_mut_slice<'a, T: NativeScalar>(&self) -> Option<&'a mut [T]> {
        if self.datatype != T::KIND.tag() {
            return None;
        }
        if self.rows <= 0 || self.cols <= 0 || self.ptr.is_null() {
            return Some(&mut []);
        }
        Some(std::slice::from_raw_parts_mut(
            self.ptr.cast::<T>(),
            (self.rows * self.stride) as usize,
        ))
    }
}

/// Number of elements for `dims`, if a buffer of `T` that size is addressable.
fn element_count<T>(dims: &[usize]) -> Option<usize> {
    let count = dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))?;
    let bytes = count.checked_mul(std::mem::size_of::<T>())?;
    (bytes <= isize::MAX as usize).then_some(count)
}

fn too_large(dims: &[usize]) -> MarshalError {
    let dims: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
    MarshalError::Shape(format!(
        "dimensions {} exceed addressable memory",
        dims.join("x")
    ))
}

/// Positive dimensions as `usize`; `None` if any is zero or negative.
fn positive(dims: &[i64]) -> Option<Vec<usize>> {
    dims.iter()
        .map(|&d| usize::try_from(d).ok().filter(|&d| d > 0))
        .collect()
}

/// Zero-filled vector of `count` elements; non-positive counts give an empty vector.
///
/// Never fails: a count too large to allocate also gives an empty vector.
pub fn allocate_vector<T: NativeScalar>(count: i64) -> NativeVector<T> {
    match positive(&[count]).and_then(|dims| element_count::<T>(&dims)) {
        Some(len) => NativeVector::zeros(len),
        None => NativeVector::empty(),
    }
}

/// Zero-filled `rows x cols` matrix; any non-positive dimension gives the 1x0 empty matrix.
///
/// Never fails: dimensions too large to allocate also give the empty matrix.
pub fn allocate_matrix<T: NativeScalar>(rows: i64, cols: i64) -> NativeMatrix<T> {
    match positive(&[rows, cols]) {
        Some(dims) => {
            NativeMatrix::zeros(dims[0], dims[1]).unwrap_or_else(|_| NativeMatrix::empty())
        }
        None => NativeMatrix::empty(),
    }
}

/// How allocation treats negative dimensions. Under either policy,
/// dimensions too large to allocate are a shape error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionPolicy {
    /// Negative sizes silently produce empty buffers.
    #[default]
    Permissive,
    /// Negative sizes are a shape error; zero still produces an empty buffer.
    Strict,
}

impl DimensionPolicy {
    pub fn allocate_vector<T: NativeScalar>(self, count: i64) -> Result<NativeVector<T>> {
        self.check(&[count])?;
        check_capacity::<T>(&[count])?;
        Ok(allocate_vector(count))
    }

    pub fn allocate_matrix<T: NativeScalar>(self, rows: i64, cols: i64) -> Result<NativeMatrix<T>> {
        self.check(&[rows, cols])?;
        check_capacity::<T>(&[rows, cols])?;
        Ok(allocate_matrix(rows, cols))
    }

    /// Reject dimensions the policy does not allow.
    pub fn check(self, dims: &[i64]) -> Result<()> {
        if self == DimensionPolicy::Strict {
            if let Some(bad) = dims.iter().find(|&&d| d < 0) {
                return Err(MarshalError::Shape(format!(
                    "negative dimension {bad} requested"
                )));
            }
        }
        Ok(())
    }
}

fn check_capacity<T>(dims: &[i64]) -> Result<()> {
    match positive(dims) {
        Some(dims) => element_count::<T>(&dims).map(|_| ()).ok_or_else(|| too_large(&dims)),
        None => Ok(()),
    }
}
