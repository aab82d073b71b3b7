//! Reverse communication: native iterative routines that hand control back to
//! the host whenever they need a function value or gradient.
//!
//! The native side owns the loop state and exposes a single step function. On
//! every return it sets [`RcommFrame::request`]; the host answers by filling
//! `f` and the gradient buffer, then calls the step function again. The point
//! and gradient buffers are allocated once and reused with in-place copies.

use numbridge_marshal::{
    copy_into_dynamic, copy_into_native, from_native_vector, to_native_vector, NativeVector,
    RawVector,
};
use numbridge_value::Value;
use std::ffi::c_void;

use crate::error::{CallError, Result};

/// Set by the host before the first step.
pub const REQUEST_START: i32 = -1;
pub const REQUEST_DONE: i32 = 0;
pub const REQUEST_VALUE: i32 = 1;
pub const REQUEST_GRADIENT: i32 = 2;
pub const REQUEST_REPORT: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    NeedValue,
    NeedGradient,
    Report,
    Done,
}

impl Request {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            REQUEST_DONE => Some(Request::Done),
            REQUEST_VALUE => Some(Request::NeedValue),
            REQUEST_GRADIENT => Some(Request::NeedGradient),
            REQUEST_REPORT => Some(Request::Report),
            _ => None,
        }
    }
}

/// Shared state between host and native step function.
#[repr(C)]
#[derive(Debug)]
pub struct RcommFrame {
    pub request: i32,
    pub status: i32,
    pub iteration: i64,
    /// Objective value written by the host
    pub f: f64,
    /// Current point, written by native code
    pub x: RawVector,
    /// Gradient at `x`, written by the host
    pub g: RawVector,
    /// Private to the native side
    pub state: *mut c_void,
}

pub type StepFn = unsafe extern "C" fn(frame: *mut RcommFrame) -> i32;

/// Host-side answers to native requests.
pub trait Objective {
    fn value(&mut self, x: &Value) -> std::result::Result<f64, String>;

    /// Fill `grad` (a list the size of `x`) in place and return the value at `x`.
    fn gradient(&mut self, x: &Value, grad: &mut Value) -> std::result::Result<f64, String>;

    fn report(&mut self, _iteration: i64, _x: &Value, _f: f64) {}
}

#[derive(Debug, Clone, PartialEq)]
pub struct RcommOutcome {
    pub x: Value,
    pub f: f64,
    pub iterations: i64,
    pub requests: usize,
}

pub struct ReverseCommunication {
    x: NativeVector<f64>,
    g: NativeVector<f64>,
    x_value: Value,
    g_value: Value,
    max_requests: usize,
}

impl ReverseCommunication {
    pub const DEFAULT_MAX_REQUESTS: usize = 100_000;

    /// Validate the starting point and allocate the persistent buffers.
    pub fn new(x0: &Value) -> Result<Self> {
        let x = to_native_vector::<f64>(x0, "x0")?;
        let n = x.len();
        Ok(Self {
            g: NativeVector::zeros(n),
            x_value: Value::list(vec![0.0; n]),
            g_value: Value::list(vec![0.0; n]),
            x,
            max_requests: Self::DEFAULT_MAX_REQUESTS,
        })
    }

    pub fn with_max_requests(mut self, max_requests: usize) -> Self {
        self.max_requests = max_requests;
        self
    }

    pub fn dimension(&self) -> usize {
        self.x.len()
    }

    /// Drive `step` until it reports [`Request::Done`].
    ///
    /// # Safety
    ///
    /// `step` must follow the [`RcommFrame`] protocol and only touch the
    /// `x` and `g` buffers within their described counts.
    pub unsafe fn run<O: Objective>(
        &mut self,
        step: StepFn,
        state: *mut c_void,
        objective: &mut O,
    ) -> Result<RcommOutcome> {
        let mut frame = RcommFrame {
            request: REQUEST_START,
            status: 0,
            iteration: 0,
            f: 0.0,
            x: self.x.raw(),
            g: self.g.raw(),
            state,
        };
        let mut requests = 0usize;

        loop {
            frame.x = self.x.raw();
            frame.g = self.g.raw();
            let status = step(&mut frame);
            if status != 0 {
                return Err(CallError::Native {
                    name: "reverse communication step".to_string(),
                    status,
                });
            }

            let request = Request::from_code(frame.request).ok_or_else(|| {
                CallError::Library(format!("unknown request code {}", frame.request))
            })?;
            if request == Request::Done {
                break;
            }
            requests += 1;
            if requests > self.max_requests {
                return Err(CallError::RequestLimit(self.max_requests));
            }
            log::trace!("rcomm iteration {}: {:?}", frame.iteration, request);

            copy_into_dynamic(&self.x, &mut self.x_value)?;
            match request {
                Request::NeedValue => {
                    frame.f = objective.value(&self.x_value).map_err(CallError::Callback)?;
                }
                Request::NeedGradient => {
                    frame.f = objective
                        .gradient(&self.x_value, &mut self.g_value)
                        .map_err(CallError::Callback)?;
                    copy_into_native(&self.g_value, &mut self.g)?;
                }
                Request::Report => objective.report(frame.iteration, &self.x_value, frame.f),
                Request::Done => {}
            }
        }

        log::debug!(
            "reverse communication finished after {} iteration(s), {} request(s)",
            frame.iteration,
            requests
        );
        Ok(RcommOutcome {
            x: from_native_vector(&self.x),
            f: frame.f,
            iterations: frame.iteration,
            requests,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_codes() {
        assert_eq!(Request::from_code(REQUEST_GRADIENT), Some(Request::NeedGradient));
        assert_eq!(Request::from_code(REQUEST_DONE), Some(Request::Done));
        assert_eq!(Request::from_code(REQUEST_START), None);
    }

    #[test]
    fn starting_point_is_validated() {
        assert!(ReverseCommunication::new(&Value::list(vec!["a"])).is_err());
        let rc = ReverseCommunication::new(&Value::list(vec![1, 2, 3])).unwrap();
        assert_eq!(rc.dimension(), 3);
    }
}
