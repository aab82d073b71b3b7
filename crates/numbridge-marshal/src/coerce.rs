//! Coercibility predicates.
//!
//! Everything here answers a yes/no question and never errors: callers use
//! these to pick a kind, or to check a value before committing to a call.
//! Once a kind is fixed, use the validating `to_native_*` functions instead.

use numbridge_value::Value;

use crate::kind::{NativeComplex, NativeInt, NativeScalar, NumericKind};
use crate::shape::{validate_matrix_shape, validate_vector_shape};

pub fn is_coercible<T: NativeScalar>(value: &Value) -> bool {
    T::coerce(value).is_some()
}

pub fn is_coercible_bool(value: &Value) -> bool {
    is_coercible::<bool>(value)
}

pub fn is_coercible_int(value: &Value) -> bool {
    is_coercible::<NativeInt>(value)
}

pub fn is_coercible_real(value: &Value) -> bool {
    is_coercible::<f64>(value)
}

pub fn is_coercible_complex(value: &Value) -> bool {
    is_coercible::<NativeComplex>(value)
}

pub fn is_coercible_kind(value: &Value, kind: NumericKind) -> bool {
    match kind {
        NumericKind::Boolean => is_coercible_bool(value),
        NumericKind::Integer => is_coercible_int(value),
        NumericKind::Real => is_coercible_real(value),
        NumericKind::Complex => is_coercible_complex(value),
    }
}

/// True when `value` is a list whose every element coerces to `T`.
pub fn is_vector_of<T: NativeScalar>(value: &Value) -> bool {
    if validate_vector_shape(value).is_err() {
        return false;
    }
    value
        .as_list()
        .is_some_and(|items| items.iter().all(is_coercible::<T>))
}

/// True when `value` is a rectangular matrix whose every element coerces to `T`.
pub fn is_matrix_of<T: NativeScalar>(value: &Value) -> bool {
    if validate_matrix_shape(value).is_err() {
        return false;
    }
    value.as_list().is_some_and(|rows| {
        rows.iter()
            .filter_map(Value::as_list)
            .all(|row| row.iter().all(is_coercible::<T>))
    })
}

pub fn is_bool_vector(value: &Value) -> bool {
    is_vector_of::<bool>(value)
}

pub fn is_int_vector(value: &Value) -> bool {
    is_vector_of::<NativeInt>(value)
}

pub fn is_real_vector(value: &Value) -> bool {
    is_vector_of::<f64>(value)
}

pub fn is_complex_vector(value: &Value) -> bool {
    is_vector_of::<NativeComplex>(value)
}

pub fn is_bool_matrix(value: &Value) -> bool {
    is_matrix_of::<bool>(value)
}

pub fn is_int_matrix(value: &Value) -> bool {
    is_matrix_of::<NativeInt>(value)
}

pub fn is_real_matrix(value: &Value) -> bool {
    is_matrix_of::<f64>(value)
}

pub fn is_complex_matrix(value: &Value) -> bool {
    is_matrix_of::<NativeComplex>(value)
}

pub fn is_kind_vector(value: &Value, kind: NumericKind) -> bool {
    match kind {
        NumericKind::Boolean => is_bool_vector(value),
        NumericKind::Integer => is_int_vector(value),
        NumericKind::Real => is_real_vector(value),
        NumericKind::Complex => is_complex_vector(value),
    }
}

pub fn is_kind_matrix(value: &Value, kind: NumericKind) -> bool {
    match kind {
        NumericKind::Boolean => is_bool_matrix(value),
        NumericKind::Integer => is_int_matrix(value),
        NumericKind::Real => is_real_matrix(value),
        NumericKind::Complex => is_complex_matrix(value),
    }
}

/// Narrowest kind every element of a vector or matrix coerces to.
///
/// Tries boolean, integer, real, complex in that order; `None` when no kind
/// fits or the value is neither a vector nor a matrix.
pub fn infer_kind(value: &Value) -> Option<NumericKind> {
    let is_matrix = value
        .as_list()
        .and_then(|items| items.first())
        .is_some_and(Value::is_list);
    NumericKind::ALL.into_iter().find(|&kind| {
        if is_matrix {
            is_kind_matrix(value, kind)
        } else {
            is_kind_vector(value, kind)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_predicates() {
        assert!(is_coercible_real(&Value::Int(3)));
        assert!(is_coercible_int(&Value::Bool(true)));
        assert!(!is_coercible_int(&Value::Num(0.5)));
        assert!(!is_coercible_real(&Value::Complex(1.0, 1.0)));
        assert!(is_coercible_complex(&Value::Complex(1.0, 1.0)));
        assert!(!is_coercible_kind(&Value::String("1".into()), NumericKind::Real));
    }

    #[test]
    fn vector_predicates_short_circuit_to_false() {
        assert!(is_int_vector(&Value::list(vec![1, 2, 3])));
        assert!(!is_int_vector(&Value::list(vec!["a", "b"])));
        assert!(!is_real_vector(&Value::Num(1.0)));
        assert!(is_real_vector(&Value::List(vec![])));
        let nested = Value::matrix(vec![vec![1.0]]);
        assert!(!is_real_vector(&nested));
    }

    #[test]
    fn matrix_predicates() {
        assert!(is_real_matrix(&Value::matrix(vec![vec![1, 2], vec![3, 4]])));
        assert!(!is_real_matrix(&Value::matrix(vec![vec![1, 2], vec![3]])));
        assert!(is_bool_matrix(&Value::empty_matrix()));
        let mixed = Value::List(vec![
            Value::list(vec![Value::Num(1.0)]),
            Value::list(vec![Value::Complex(0.0, 1.0)]),
        ]);
        assert!(!is_real_matrix(&mixed));
        assert!(is_complex_matrix(&mixed));
    }

    #[test]
    fn kind_inference_picks_narrowest() {
        assert_eq!(infer_kind(&Value::list(vec![0, 1])), Some(NumericKind::Boolean));
        assert_eq!(infer_kind(&Value::list(vec![0, 2])), Some(NumericKind::Integer));
        assert_eq!(infer_kind(&Value::list(vec![0.5])), Some(NumericKind::Real));
        assert_eq!(
            infer_kind(&Value::matrix(vec![vec![Value::Complex(1.0, 1.0)]])),
            Some(NumericKind::Complex)
        );
        assert_eq!(infer_kind(&Value::list(vec!["x"])), None);
    }
}
