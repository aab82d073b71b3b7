use num_complex::Complex64;
use numbridge_value::Value;
use std::convert::TryInto;

#[test]
fn test_value_conversions() {
    assert_eq!(Value::from(42i64), Value::Int(42));
    assert_eq!(Value::from(7i32), Value::Int(7));
    assert_eq!(Value::from(3.25), Value::Num(3.25));
    assert_eq!(Value::from(true), Value::Bool(true));
    assert_eq!(Value::from("hello"), Value::String("hello".to_string()));
    assert_eq!(
        Value::from(Complex64::new(1.0, 2.0)),
        Value::Complex(1.0, 2.0)
    );

    let int_val = Value::Int(42);
    let num_val = Value::Num(3.25);
    assert_eq!((&int_val).try_into(), Ok(42i64));
    assert_eq!((&num_val).try_into(), Ok(3.25f64));
    assert_eq!((&int_val).try_into(), Ok(42.0f64));
    assert_eq!((&num_val).try_into(), Ok(true));

    let c: Complex64 = (&Value::Int(3)).try_into().unwrap();
    assert_eq!(c, Complex64::new(3.0, 0.0));
}

#[test]
fn test_failed_extraction_names_type() {
    let err = f64::try_from(&Value::String("x".into())).unwrap_err();
    assert!(err.contains("string"));
    let err = bool::try_from(&Value::list(vec![1i64])).unwrap_err();
    assert!(err.contains("list"));
}

#[test]
fn test_list_and_matrix_builders() {
    let v = Value::list(vec![1.5, 2.5]);
    assert_eq!(v.as_list().map(|l| l.len()), Some(2));
    assert!(v.is_list());
    assert!(!v.is_scalar());

    let m = Value::matrix(vec![vec![1i64, 2], vec![3, 4]]);
    let rows = m.as_list().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1], Value::list(vec![3i64, 4]));

    assert_eq!(Value::empty_matrix(), Value::List(vec![Value::List(vec![])]));
}

#[test]
fn test_list_mutation_in_place() {
    let mut v = Value::list(vec![0.0, 0.0]);
    v.as_list_mut().unwrap()[1] = Value::Num(9.0);
    assert_eq!(v, Value::list(vec![0.0, 9.0]));
    assert!(Value::Int(1).as_list().is_none());
}
