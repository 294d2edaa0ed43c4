//! Parse errors for hex-encoded primitives

use crate::fixed::FixedBytesError;
use thiserror::Error;

/// A hex-encoded primitive could not be read
#[derive(Debug, Error)]
pub enum PrimitiveError {
    /// Address or hash of the wrong shape
    #[error(transparent)]
    Fixed(#[from] FixedBytesError),

    /// Malformed hex quantity
    #[error("invalid quantity: {0}")]
    Quantity(String),

    /// Malformed hex byte string
    #[error("invalid hex bytes: {0}")]
    Bytes(String),
}
