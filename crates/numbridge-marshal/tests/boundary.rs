use num_complex::Complex64;
use numbridge_marshal::{
    allocate_matrix, allocate_vector, copy_into_dynamic, copy_into_dynamic_matrix,
    copy_into_native, copy_into_native_matrix, from_native_matrix, from_native_vector,
    to_native_matrix, to_native_vector, validate_matrix_shape, NativeComplex, NativeInt,
    NativeScalar, NativeVector, Value,
};

#[test]
fn vectors_round_trip_for_their_own_kind() {
    let flags = Value::list(vec![true, false, true]);
    let buf = to_native_vector::<bool>(&flags, "flags").unwrap();
    assert_eq!(from_native_vector(&buf), flags);

    let ints = Value::list(vec![-4i64, 0, 9, i64::MAX]);
    let buf = to_native_vector::<NativeInt>(&ints, "ints").unwrap();
    assert_eq!(from_native_vector(&buf), ints);

    let reals = Value::list(vec![0.1, -2.5e-12, 7.0e300]);
    let buf = to_native_vector::<f64>(&reals, "reals").unwrap();
    assert_eq!(from_native_vector(&buf), reals);
}

#[test]
fn matrices_round_trip_for_their_own_kind() {
    let m = Value::matrix(vec![vec![1i64, 2, 3], vec![4, 5, 6]]);
    let buf = to_native_matrix::<NativeInt>(&m, "m").unwrap();
    assert_eq!(buf.shape(), (2, 3));
    assert_eq!(buf.as_slice(), &[1, 2, 3, 4, 5, 6]);
    assert_eq!(from_native_matrix(&buf), m);
}

#[test]
fn complex_scalar_survives_the_paired_real_record() {
    for c in [
        Complex64::new(0.0, 0.0),
        Complex64::new(-1.25, 3.5),
        Complex64::new(1.0e-300, -1.0e300),
    ] {
        let native = NativeComplex::from(c);
        assert_eq!(native.into_value(), Value::from(c));
        assert_eq!(Complex64::from(native), c);
    }
    assert_eq!(std::mem::size_of::<NativeComplex>(), 2 * std::mem::size_of::<f64>());
}

#[test]
fn degenerate_shapes() {
    assert_eq!(validate_matrix_shape(&Value::List(vec![])).unwrap(), (0, 0));
    assert_eq!(validate_matrix_shape(&Value::empty_matrix()).unwrap(), (0, 0));
    assert!(allocate_matrix::<f64>(0, 5).is_empty());
    assert!(allocate_matrix::<f64>(5, 0).is_empty());
    assert!(allocate_vector::<f64>(-1).is_empty());
}

#[test]
fn jagged_matrix_is_a_shape_error() {
    let err = validate_matrix_shape(&Value::matrix(vec![vec![1, 2], vec![3]])).unwrap_err();
    assert!(err.is_shape());
}

#[test]
fn strings_are_not_integers() {
    let err = to_native_vector::<NativeInt>(&Value::list(vec!["a", "b"]), "x").unwrap_err();
    assert!(err.is_type_mismatch());
    assert!(to_native_vector::<NativeInt>(&Value::list(vec![1, 2, 3]), "x").is_ok());
}

#[test]
fn in_place_copy_trusts_the_caller_about_size() {
    let src = Value::list(vec![1, 2, 3]);

    let mut three = NativeVector::<f64>::zeros(3);
    copy_into_native(&src, &mut three).unwrap();
    assert_eq!(three.as_slice(), &[1.0, 2.0, 3.0]);

    let mut two = NativeVector::<f64>::zeros(2);
    let err = copy_into_native(&src, &mut two).unwrap_err();
    assert!(err.is_index());
    assert!(!err.is_shape());
    // Elements before the overflow were written.
    assert_eq!(two.as_slice(), &[1.0, 2.0]);
}

#[test]
fn in_place_copy_back_into_dynamic_values() {
    let buf = to_native_vector::<f64>(&Value::list(vec![4.0, 5.0]), "x").unwrap();

    let mut dst = Value::list(vec![0.0, 0.0, 99.0]);
    copy_into_dynamic(&buf, &mut dst).unwrap();
    assert_eq!(dst, Value::list(vec![4.0, 5.0, 99.0]));

    let mut short = Value::list(vec![0.0]);
    assert!(copy_into_dynamic(&buf, &mut short).unwrap_err().is_index());

    let mut scalar = Value::Num(0.0);
    assert!(copy_into_dynamic(&buf, &mut scalar).unwrap_err().is_index());
}

#[test]
fn in_place_matrix_copies() {
    let mut buf = allocate_matrix::<f64>(2, 2);
    copy_into_native_matrix(&Value::matrix(vec![vec![1, 2], vec![3, 4]]), &mut buf).unwrap();

    let mut dst = Value::matrix(vec![vec![0, 0], vec![0, 0]]);
    copy_into_dynamic_matrix(&buf, &mut dst).unwrap();
    assert_eq!(dst, Value::matrix(vec![vec![1.0, 2.0], vec![3.0, 4.0]]));

    let too_wide = Value::matrix(vec![vec![1, 2, 3]]);
    assert!(copy_into_native_matrix(&too_wide, &mut buf).unwrap_err().is_index());

    let mut one_row = Value::matrix(vec![vec![0, 0]]);
    assert!(copy_into_dynamic_matrix(&buf, &mut one_row).unwrap_err().is_index());
}

#[test]
fn in_place_copy_still_converts_elements() {
    let mut buf = NativeVector::<NativeInt>::zeros(2);
    let err = copy_into_native(&Value::list(vec![1.0, 1.5]), &mut buf).unwrap_err();
    assert!(err.is_type_mismatch());
}
