//! Marshal dynamic values into native numeric routines and back.
//!
//! ```no_run
//! use numbridge::{Session, Value};
//!
//! let session = Session::from_environment()?;
//! session.load("linalg")?;
//! let dot = session.call_single(
//!     "linalg",
//!     "dot",
//!     &[Value::list(vec![1.0, 2.0]), Value::list(vec![3.0, 4.0])],
//! )?;
//! println!("{dot}");
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
mod session;

pub use config::{ConfigLoader, NumbridgeConfig};
pub use numbridge_ffi as ffi;
pub use numbridge_ffi::{CallError, CallForm, CallSignature, Objective, RcommOutcome};
pub use numbridge_logging as logging;
pub use numbridge_marshal as marshal;
pub use numbridge_marshal::{DimensionPolicy, MarshalError, NumericKind};
pub use numbridge_value::Value;
pub use session::Session;
