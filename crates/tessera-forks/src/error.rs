//! Fork errors

use thiserror::Error;

use crate::Fork;

/// A capability the fork does not have, e.g. blob gas before Cancun.
///
/// Returned instead of a default so callers must branch explicitly.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("{capability} is not supported by {fork}")]
pub struct UnsupportedCapability {
    /// Fork that was queried
    pub fork: Fork,
    /// Capability name
    pub capability: &'static str,
}

/// Fork construction and lookup errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ForkError {
    /// Name is not a known fork
    #[error("unknown fork: {0}")]
    UnknownFork(String),

    /// Transition target is not later than its source
    #[error("transition target {to} is not later than {from}")]
    NonIncreasingTransition {
        /// Fork before activation
        from: Fork,
        /// Fork after activation
        to: Fork,
    },

    /// Block activation used for a timestamp-activated fork or vice versa
    #[error("{to} activates by {expected}, not by the given activation kind")]
    ActivationKindMismatch {
        /// Fork after activation
        to: Fork,
        /// "timestamp" or "block number"
        expected: &'static str,
    },
}
