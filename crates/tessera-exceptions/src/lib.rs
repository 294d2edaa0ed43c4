//! # tessera-exceptions
//!
//! The closed set of named failure kinds an invalid transaction or block
//! may be declared to produce, and the per-engine tables that translate
//! an engine's free-form rejection message back into one of those kinds.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod expected;
mod kinds;
mod mapper;

pub use expected::{ExpectedException, ParseExceptionError};
pub use kinds::{BlockException, Exception, TransactionException};
pub use mapper::{ExceptionMap, ExceptionMatch};
