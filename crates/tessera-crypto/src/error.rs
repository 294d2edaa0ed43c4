//! Key and signature errors

use thiserror::Error;

/// A key could not be loaded or a signature could not be produced or recovered
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Zero or at least the curve order
    #[error("private key out of range")]
    InvalidPrivateKey,

    /// The signer refused the digest
    #[error("signing failed: {0}")]
    Signing(String),

    /// r, s or the parity do not recover to a key
    #[error("cannot recover signer: {0}")]
    Recovery(String),
}
