//! Shape validation for dynamic vectors and matrices.

use numbridge_value::Value;

use crate::error::{MarshalError, Result};

/// Length of a dynamic vector. Fails unless `value` is a list.
pub fn validate_vector_shape(value: &Value) -> Result<usize> {
    match value {
        Value::List(items) => Ok(items.len()),
        other => Err(MarshalError::Shape(format!(
            "expected a vector, got {}",
            other.type_name()
        ))),
    }
}

/// `(rows, cols)` of a dynamic matrix.
///
/// Every row must be a list of the same length. An empty outer list, or a
/// first row of length zero, normalizes to `(0, 0)`.
pub fn validate_matrix_shape(value: &Value) -> Result<(usize, usize)> {
    let rows = match value {
        Value::List(rows) => rows,
        other => {
            return Err(MarshalError::Shape(format!(
                "expected a matrix, got {}",
                other.type_name()
            )))
        }
    };
    let Some(first) = rows.first() else {
        return Ok((0, 0));
    };
    let cols = row_len(first, 0)?;
    for (r, row) in rows.iter().enumerate().skip(1) {
        let len = row_len(row, r)?;
        if len != cols {
            return Err(MarshalError::Shape(format!(
                "row {r} has {len} elements, expected {cols}"
            )));
        }
    }
    if cols == 0 {
        return Ok((0, 0));
    }
    Ok((rows.len(), cols))
}

fn row_len(row: &Value, index: usize) -> Result<usize> {
    row.as_list().map(|items| items.len()).ok_or_else(|| {
        MarshalError::Shape(format!(
            "row {index} is {}, expected a list",
            row.type_name()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_length() {
        assert_eq!(validate_vector_shape(&Value::list(vec![1, 2, 3])).unwrap(), 3);
        assert_eq!(validate_vector_shape(&Value::List(vec![])).unwrap(), 0);
        assert!(validate_vector_shape(&Value::Num(1.0)).unwrap_err().is_shape());
    }

    #[test]
    fn degenerate_matrices_normalize_to_zero_by_zero() {
        assert_eq!(validate_matrix_shape(&Value::List(vec![])).unwrap(), (0, 0));
        assert_eq!(validate_matrix_shape(&Value::empty_matrix()).unwrap(), (0, 0));
        let three_empty_rows = Value::List(vec![Value::List(vec![]); 3]);
        assert_eq!(validate_matrix_shape(&three_empty_rows).unwrap(), (0, 0));
    }

    #[test]
    fn jagged_rows_are_rejected() {
        let jagged = Value::matrix(vec![vec![1, 2], vec![3]]);
        let err = validate_matrix_shape(&jagged).unwrap_err();
        assert!(err.is_shape());
        assert!(err.to_string().contains("row 1"));

        let empty_then_full = Value::matrix(vec![vec![], vec![1]]);
        assert!(validate_matrix_shape(&empty_then_full).unwrap_err().is_shape());
    }

    #[test]
    fn non_list_rows_are_rejected() {
        let v = Value::List(vec![Value::list(vec![1]), Value::Int(2)]);
        assert!(validate_matrix_shape(&v).unwrap_err().is_shape());
        let flat = Value::list(vec![1.0, 2.0]);
        assert!(validate_matrix_shape(&flat).unwrap_err().is_shape());
    }

    #[test]
    fn rectangular_shape() {
        let m = Value::matrix(vec![vec![1, 2], vec![3, 4], vec![5, 6]]);
        assert_eq!(validate_matrix_shape(&m).unwrap(), (3, 2));
    }
}
