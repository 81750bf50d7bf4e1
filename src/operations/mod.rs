//! # Operation abstractions.
//!
//! - [`Operation`] - trait for async, cancelable units of work with a typed result
//! - [`OperationFn`] - closure-backed implementation
//! - [`LaunchOptions`] - tag, delivery mode and timeout for one submission

mod operation;
mod operation_fn;
mod options;

pub use operation::Operation;
pub use operation_fn::OperationFn;
pub use options::LaunchOptions;
