//! The transition tool contract

use crate::error::T8nResult;
use crate::wire::{TransitionRequest, TransitionResponse};
use async_trait::async_trait;
use tessera_exceptions::ExceptionMap;

/// An out-of-process state transition engine (object-safe)
#[async_trait]
pub trait TransitionTool: Send + Sync {
    /// Name recorded in fixture provenance
    fn name(&self) -> &str;

    /// Failure strings this engine emits, per exception kind
    fn exception_map(&self) -> &ExceptionMap;

    /// Apply one block of transactions to the request's pre-state
    async fn evaluate(&self, request: &TransitionRequest) -> T8nResult<TransitionResponse>;
}
