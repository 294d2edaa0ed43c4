//! # tessera-t8n
//!
//! Bridge to external state transition tools ("t8n").
//!
//! A [`TransitionRequest`] carries the pre-state, the block environment and
//! the signed transactions of one block, encoded for the fork resolved at
//! that block. A [`TransitionTool`] answers with the post-state, receipts
//! and the transactions it rejected. [`ExternalTool`] runs a real engine as
//! a child process; every subprocess failure is a [`T8nError`] and is never
//! retried.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod external;
#[cfg(feature = "test-utils")]
mod scripted;
mod tool;
mod wire;

pub use error::{T8nError, T8nResult};
pub use external::{Engine, ExternalTool, ExternalToolConfig, DEFAULT_TIMEOUT};
#[cfg(feature = "test-utils")]
pub use scripted::ScriptedTool;
pub use tool::TransitionTool;
pub use wire::{
    RejectedTx, TransitionRequest, TransitionResponse, TransitionResult, WireEnv,
    WireTransaction,
};
