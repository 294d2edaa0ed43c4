//! # tessera-types
//!
//! Scenario building blocks for the Tessera fixture filler:
//!
//! - [`Account`], [`Alloc`] and the partial [`ExpectedAlloc`]
//! - [`PreAlloc`], the deterministic pre-state allocator
//! - [`Transaction`], [`TxBuilder`] and [`SignedTransaction`]
//! - [`Environment`], [`Header`], [`HeaderModifier`] and block encoding
//! - [`Receipt`] and [`Log`] as reported by the transition tool

#![warn(missing_docs)]
#![warn(clippy::all)]

mod account;
mod block;
mod error;
mod pre_alloc;
mod receipt;
mod transaction;

pub use account::{
    Account, AccountField, Alloc, ExpectedAccount, ExpectedAlloc, PostStateMismatch, Storage,
};
pub use block::{
    block_rlp, transactions_root, withdrawals_root, Bloom, Environment, Header, HeaderModifier,
    Withdrawal, DEFAULT_BASE_FEE, DEFAULT_COINBASE, DEFAULT_DIFFICULTY, DEFAULT_GAS_LIMIT,
    DEFAULT_TIMESTAMP, EMPTY_OMMERS_HASH,
};
pub use error::{AllocError, EnvError, TxError};
pub use pre_alloc::{
    Eoa, PreAlloc, CONTRACT_ADDRESS_INCREMENT, CONTRACT_START_ADDRESS, DEFAULT_EOA_BALANCE,
};
pub use receipt::{Log, Receipt};
pub use transaction::{
    versioned_hash, AccessListItem, Authorization, SignedTransaction, Transaction, TxBuilder,
    DEFAULT_GAS_PRICE, DEFAULT_MAX_FEE_PER_BLOB_GAS, DEFAULT_MAX_FEE_PER_GAS,
    VERSIONED_HASH_VERSION_KZG,
};

/// Default gas limit of a transaction built without one
pub use transaction::DEFAULT_GAS_LIMIT as DEFAULT_TX_GAS_LIMIT;
