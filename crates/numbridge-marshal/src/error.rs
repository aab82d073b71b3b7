use crate::kind::{NumericKind, ValueShape};
use thiserror::Error;

/// Errors raised while moving values across the native boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarshalError {
    /// The value is not a list, or not a rectangular list of lists.
    #[error("shape error: {0}")]
    Shape(String),

    /// The value cannot be read as the kind and shape required by a native slot.
    #[error("{}", mismatch_message(.label, .kind, .shape))]
    TypeMismatch {
        label: Option<String>,
        kind: NumericKind,
        shape: ValueShape,
    },

    /// An in-place copy ran past the end of its buffer or destination.
    #[error("index error: {0}")]
    Index(String),
}

pub type Result<T> = std::result::Result<T, MarshalError>;

impl MarshalError {
    pub(crate) fn mismatch(label: &str, kind: NumericKind, shape: ValueShape) -> Self {
        let label = if label.is_empty() {
            None
        } else {
            Some(label.to_string())
        };
        MarshalError::TypeMismatch { label, kind, shape }
    }

    pub(crate) fn out_of_range(what: &str, index: impl std::fmt::Display, len: usize) -> Self {
        MarshalError::Index(format!("{what} index {index} out of range for length {len}"))
    }

    pub fn is_shape(&self) -> bool {
        matches!(self, MarshalError::Shape(_))
    }

    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, MarshalError::TypeMismatch { .. })
    }

    pub fn is_index(&self) -> bool {
        matches!(self, MarshalError::Index(_))
    }
}

fn mismatch_message(label: &Option<String>, kind: &NumericKind, shape: &ValueShape) -> String {
    match label {
        Some(label) => format!("'{label}' parameter can't be cast to {kind} {shape}"),
        None => format!("argument can't be cast to {kind} {shape}"),
    }
}
