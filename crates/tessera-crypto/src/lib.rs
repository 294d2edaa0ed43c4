//! # tessera-crypto
//!
//! Hashing, secp256k1 signatures and Merkle-Patricia roots for fixtures.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod hash;
mod signature;
pub mod trie;

pub use error::CryptoError;
pub use hash::{keccak256, sha256};
pub use signature::{
    address_of, private_key_from_bytes, public_key_to_address, recover_address,
    recover_public_key, sign, PrivateKey, PublicKey, Signature,
};
