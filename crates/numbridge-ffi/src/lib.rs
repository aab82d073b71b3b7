//! Calling native numeric routines with dynamic values.
//!
//! Native functions are described by `.ffi` signature files, loaded through a
//! [`LibraryRegistry`], and called with plain [`Value`] arguments. Arguments
//! are validated and marshaled into native buffers, outputs are allocated from
//! the signature and marshaled back out.
//!
//! # Signature Files
//!
//! ```text
//! # linalg.ffi
//! dot: (vec<real> x[n], vec<real> y[n], int n = len(x)) -> real
//! transpose: (mat<real> a) -> mat<real>[cols(a), rows(a)]
//! ```
//!
//! `dot` accepts both `dot(x, y, n)` and `dot(x, y)`; in the short form `n`
//! is computed as `len(x)` and `y` must have the same length.
//!
//! # Native ABI
//!
//! Every exported function takes an array of slots, see [`abi`]:
//!
//! ```c
//! int32_t dot(nb_slot *slots, size_t count);
//! ```
//!
//! Iterative routines that call back into the host use the
//! [`rcomm`] protocol instead.

pub mod abi;
mod call;
mod error;
mod library;
mod parser;
pub mod rcomm;
mod registry;
mod types;

pub use abi::{EntryPoint, NativeSlot, ScalarCell};
pub use call::{CallForm, ResolvedCall};
pub use error::{CallError, Result};
pub use library::NativeLibrary;
pub use numbridge_value::Value;
pub use parser::{parse_signature_line, ParseError, SignatureFile};
pub use rcomm::{Objective, RcommFrame, RcommOutcome, Request, ReverseCommunication, StepFn};
pub use registry::{global_registry, LibraryRegistry};
pub use types::{CallSignature, Output, Param, ParamType, SizeExpr};
