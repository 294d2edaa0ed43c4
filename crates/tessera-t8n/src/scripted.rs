//! In-process tool driven by a closure, for tests

use crate::error::T8nResult;
use crate::tool::TransitionTool;
use crate::wire::{TransitionRequest, TransitionResponse};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tessera_exceptions::ExceptionMap;

type Script = dyn Fn(&TransitionRequest) -> T8nResult<TransitionResponse> + Send + Sync;

/// Transition tool whose output is computed by a closure
pub struct ScriptedTool {
    name: String,
    exceptions: ExceptionMap,
    script: Box<Script>,
    calls: AtomicUsize,
    requests: Mutex<Vec<TransitionRequest>>,
}

impl ScriptedTool {
    /// Tool answering every request with `script`
    pub fn new<F>(exceptions: ExceptionMap, script: F) -> Self
    where
        F: Fn(&TransitionRequest) -> T8nResult<TransitionResponse> + Send + Sync + 'static,
    {
        ScriptedTool {
            name: format!("scripted {}", exceptions.engine()),
            exceptions,
            script: Box::new(script),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Number of `evaluate` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Copies of every request received
    pub fn requests(&self) -> Vec<TransitionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for ScriptedTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedTool")
            .field("name", &self.name)
            .field("calls", &self.calls())
            .finish()
    }
}

#[async_trait]
impl TransitionTool for ScriptedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn exception_map(&self) -> &ExceptionMap {
        &self.exceptions
    }

    async fn evaluate(&self, request: &TransitionRequest) -> T8nResult<TransitionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }
        (self.script)(request)
    }
}
