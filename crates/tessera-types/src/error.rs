//! Error types for scenario construction

use tessera_crypto::CryptoError;
use tessera_forks::{Fork, HeaderField};
use tessera_primitives::Address;
use thiserror::Error;

/// Pre-state allocation errors
#[derive(Debug, Error)]
pub enum AllocError {
    /// Funding would overflow the 256-bit balance
    #[error("balance of {address} would overflow")]
    BalanceOverflow {
        /// Account being funded
        address: Address,
    },

    /// The deterministic counter ran out of room
    #[error("allocator address space exhausted")]
    AddressSpaceExhausted,

    /// Key derivation failed
    #[error("key derivation failed: {0}")]
    Crypto(#[from] CryptoError),
}

/// Transaction construction errors
#[derive(Debug, Error)]
pub enum TxError {
    /// Signing failed
    #[error("signing failed: {0}")]
    Signing(#[from] CryptoError),

    /// A field was set that the chosen type cannot carry
    #[error("{tx_type} transactions cannot carry {field}")]
    UnsupportedField {
        /// Transaction type being built
        tx_type: tessera_forks::TxType,
        /// Field name
        field: &'static str,
    },

    /// The sender's nonce counter cannot advance further
    #[error("nonce overflow for {0}")]
    NonceOverflow(Address),
}

/// Environment construction errors
#[derive(Debug, Error)]
pub enum EnvError {
    /// The author set a field the fork does not carry
    #[error("{field} is not part of a {fork} block")]
    ForbiddenField {
        /// Field set by the author
        field: HeaderField,
        /// Fork the environment was built for
        fork: Fork,
    },

    /// Difficulty set on a fork that requires zero difficulty
    #[error("{0} requires zero difficulty")]
    NonZeroDifficulty(Fork),
}
