//! # tessera-filler
//!
//! Test scenarios and the pipeline that turns them into fixtures.
//!
//! This crate provides:
//! - [`StateTest`]: one transaction against a pre-state
//! - [`BlockchainTest`]: a chain of blocks from a genesis, possibly
//!   crossing a fork transition
//! - Local well-formedness checks that name the failure they detect
//! - [`Filler`]: a bounded-concurrency batch runner writing fixtures
//! - [`FillConfig`]: TOML configuration and logging setup
//!
//! ## Filling
//!
//! Each scenario is checked locally, handed to a transition tool, and the
//! tool's verdict is held against what the author declared. Only a
//! scenario whose every outcome matches is written out; everything else
//! is either a [`VerificationFailure`] or a [`HarnessDefect`].

#![warn(missing_docs)]
#![warn(clippy::all)]

mod blockchain;
mod config;
mod error;
pub mod logging;
mod runner;
mod scenario;
mod state;
pub mod validate;
mod verify;

pub use blockchain::{
    requests_hash, Block, BlockchainTest, VerifiedBlock, VerifiedChain, DEFAULT_BLOCK_TIME,
    DEFAULT_CHAIN_ID,
};
pub use config::{ConfigError, FillConfig, T8nConfig};
pub use error::{FillError, FillResult, HarnessDefect, VerificationFailure};
pub use runner::{FillCase, FillReport, FillStats, Filler};
pub use scenario::{Scenario, ScenarioRecord, VerifiedScenario};
pub use state::{StateTest, VerifiedState};
