//! # tessera-forks
//!
//! Protocol rules per fork, looked up as pure functions of the fork
//! identity. Each fork only states what changed relative to its parent;
//! every other answer is inherited. A [`TransitionFork`] switches between
//! two forks at a block number or timestamp and resolves that switch on
//! every query.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod blob;
mod capabilities;
mod covariant;
mod error;
mod fee;
mod fork;
pub mod gas;
mod header;
mod opcode;
mod system;
mod transition;
mod tx_type;

pub use blob::{fake_exponential, BlobSchedule};
pub use covariant::{CovariantDimension, CovariantValue};
pub use error::{ForkError, UnsupportedCapability};
pub use fee::BaseFeeParams;
pub use fork::Fork;
pub use gas::{GasCosts, IntrinsicGas, IntrinsicGasInput};
pub use header::HeaderField;
pub use opcode::Opcode;
pub use system::{SystemContract, BEACON_ROOTS_ADDRESS, HISTORY_STORAGE_ADDRESS};
pub use transition::{Activation, ForkSpec, TransitionFork};
pub use tx_type::TxType;
