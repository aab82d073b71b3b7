use numbridge_marshal::MarshalError;
use thiserror::Error;

use crate::parser::ParseError;

/// Errors raised while resolving, marshaling or running a native call.
#[derive(Error, Debug)]
pub enum CallError {
    #[error(transparent)]
    Marshal(#[from] MarshalError),

    #[error("error while calling '{function}': {}", arity_message(.got, .full, .short))]
    ArgumentCount {
        function: String,
        got: usize,
        full: usize,
        short: Option<usize>,
    },

    #[error("error while calling '{function}': looks like one of arguments has wrong size ({detail})")]
    WrongSize { function: String, detail: String },

    #[error("{0}")]
    Library(String),

    #[error("invalid signature: {0}")]
    Signature(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("native function '{name}' returned error code {status}")]
    Native { name: String, status: i32 },

    #[error("callback failed: {0}")]
    Callback(String),

    #[error("reverse communication stopped after {0} requests")]
    RequestLimit(usize),
}

pub type Result<T> = std::result::Result<T, CallError>;

fn arity_message(got: &usize, full: &usize, short: &Option<usize>) -> String {
    match short {
        Some(short) => format!("expected {full} or {short} arguments, got {got}"),
        None => format!("expected {full} arguments, got {got}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_message_names_both_forms() {
        let err = CallError::ArgumentCount {
            function: "fit".into(),
            got: 1,
            full: 3,
            short: Some(2),
        };
        assert_eq!(
            err.to_string(),
            "error while calling 'fit': expected 3 or 2 arguments, got 1"
        );
    }

    #[test]
    fn marshal_errors_pass_through() {
        let err: CallError = MarshalError::Shape("not a list".into()).into();
        assert_eq!(err.to_string(), "shape error: not a list");
    }
}
