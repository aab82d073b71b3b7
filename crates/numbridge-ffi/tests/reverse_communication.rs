//! A native gradient-descent loop that asks the host for gradients.

use numbridge_ffi::rcomm::{REQUEST_DONE, REQUEST_GRADIENT, REQUEST_REPORT, REQUEST_START, REQUEST_VALUE};
use numbridge_ffi::{CallError, Objective, RcommFrame, ReverseCommunication, Value};
use std::ffi::c_void;

const STEP: f64 = 0.25;
const MAX_ITERATIONS: i64 = 200;

/// Steepest descent with a fixed step. Reports every 10 iterations and
/// finishes once the gradient is small.
unsafe extern "C" fn descend(frame: *mut RcommFrame) -> i32 {
    let frame = &mut *frame;
    let Some(x) = frame.x.as_mut_slice::<f64>() else {
        return 1;
    };
    let Some(g) = frame.g.as_mut_slice::<f64>() else {
        return 1;
    };
    match frame.request {
        REQUEST_START | REQUEST_REPORT => {
            frame.request = REQUEST_GRADIENT;
        }
        REQUEST_GRADIENT => {
            let norm: f64 = g.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm < 1e-10 || frame.iteration >= MAX_ITERATIONS {
                frame.request = REQUEST_DONE;
                return 0;
            }
            for (xi, gi) in x.iter_mut().zip(g.iter()) {
                *xi -= STEP * gi;
            }
            frame.iteration += 1;
            frame.request = if frame.iteration % 10 == 0 {
                REQUEST_REPORT
            } else {
                REQUEST_GRADIENT
            };
        }
        _ => return 3,
    }
    0
}

/// Asks once for a plain function value, then stops.
unsafe extern "C" fn probe(frame: *mut RcommFrame) -> i32 {
    let frame = &mut *frame;
    frame.request = match frame.request {
        REQUEST_START => REQUEST_VALUE,
        _ => REQUEST_DONE,
    };
    0
}

unsafe extern "C" fn failing(_frame: *mut RcommFrame) -> i32 {
    7
}

unsafe extern "C" fn endless(frame: *mut RcommFrame) -> i32 {
    (*frame).request = REQUEST_VALUE;
    0
}

/// f(x) = sum (x_i - target_i)^2
struct Quadratic {
    target: Vec<f64>,
    reports: Vec<i64>,
}

impl Quadratic {
    fn point(x: &Value) -> Result<Vec<f64>, String> {
        x.as_list()
            .ok_or("x is not a list")?
            .iter()
            .map(|v| f64::try_from(v))
            .collect()
    }
}

impl Objective for Quadratic {
    fn value(&mut self, x: &Value) -> Result<f64, String> {
        let x = Self::point(x)?;
        Ok(x.iter().zip(&self.target).map(|(a, t)| (a - t).powi(2)).sum())
    }

    fn gradient(&mut self, x: &Value, grad: &mut Value) -> Result<f64, String> {
        let f = self.value(x)?;
        let x = Self::point(x)?;
        let slots = grad.as_list_mut().ok_or("grad is not a list")?;
        for ((slot, xi), ti) in slots.iter_mut().zip(&x).zip(&self.target) {
            *slot = Value::Num(2.0 * (xi - ti));
        }
        Ok(f)
    }

    fn report(&mut self, iteration: i64, _x: &Value, _f: f64) {
        self.reports.push(iteration);
    }
}

fn quadratic() -> Quadratic {
    Quadratic {
        target: vec![1.0, -2.0, 0.5],
        reports: Vec::new(),
    }
}

#[test]
fn gradient_descent_converges() {
    let mut objective = quadratic();
    let mut rc = ReverseCommunication::new(&Value::list(vec![0, 0, 0])).unwrap();
    let outcome = unsafe { rc.run(descend, std::ptr::null_mut::<c_void>(), &mut objective) }.unwrap();

    let x = Quadratic::point(&outcome.x).unwrap();
    for (xi, ti) in x.iter().zip(&objective.target) {
        assert!((xi - ti).abs() < 1e-8, "{xi} vs {ti}");
    }
    assert!(outcome.f < 1e-15);
    assert!(outcome.iterations < MAX_ITERATIONS);
    assert!(!objective.reports.is_empty());
    assert!(objective.reports.iter().all(|i| i % 10 == 0));
}

#[test]
fn value_requests_reach_the_objective() {
    let mut objective = quadratic();
    let mut rc = ReverseCommunication::new(&Value::list(vec![1.0, -2.0, 1.5])).unwrap();
    let outcome = unsafe { rc.run(probe, std::ptr::null_mut(), &mut objective) }.unwrap();
    assert_eq!(outcome.requests, 1);
    assert_eq!(outcome.f, 1.0);
}

#[test]
fn callback_errors_stop_the_loop() {
    struct Broken;
    impl Objective for Broken {
        fn value(&mut self, _x: &Value) -> Result<f64, String> {
            Err("no value here".to_string())
        }
        fn gradient(&mut self, _x: &Value, _grad: &mut Value) -> Result<f64, String> {
            Err("no gradient here".to_string())
        }
    }

    let mut rc = ReverseCommunication::new(&Value::list(vec![0.0])).unwrap();
    let err = unsafe { rc.run(descend, std::ptr::null_mut(), &mut Broken) }.unwrap_err();
    assert!(matches!(err, CallError::Callback(ref m) if m == "no gradient here"));
}

#[test]
fn oversized_gradient_is_an_index_error() {
    struct TooLong;
    impl Objective for TooLong {
        fn value(&mut self, _x: &Value) -> Result<f64, String> {
            Ok(0.0)
        }
        fn gradient(&mut self, _x: &Value, grad: &mut Value) -> Result<f64, String> {
            *grad = Value::list(vec![0.0, 0.0, 0.0]);
            Ok(0.0)
        }
    }

    let mut rc = ReverseCommunication::new(&Value::list(vec![0.0, 0.0])).unwrap();
    let err = unsafe { rc.run(descend, std::ptr::null_mut(), &mut TooLong) }.unwrap_err();
    assert!(matches!(err, CallError::Marshal(ref e) if e.is_index()));
}

#[test]
fn native_failures_and_runaway_loops() {
    let mut objective = quadratic();
    let mut rc = ReverseCommunication::new(&Value::list(vec![0.0])).unwrap();
    let err = unsafe { rc.run(failing, std::ptr::null_mut(), &mut objective) }.unwrap_err();
    assert!(matches!(err, CallError::Native { status: 7, .. }));

    let mut rc = ReverseCommunication::new(&Value::list(vec![0.0]))
        .unwrap()
        .with_max_requests(5);
    let err = unsafe { rc.run(endless, std::ptr::null_mut(), &mut objective) }.unwrap_err();
    assert!(matches!(err, CallError::RequestLimit(5)));
}
