//! Bridge errors. Every variant is fatal to the scenario that hit it.

use std::time::Duration;
use thiserror::Error;

/// Transition tool failure
#[derive(Debug, Error)]
pub enum T8nError {
    /// The binary could not be started
    #[error("failed to spawn {binary}: {source}")]
    Spawn {
        /// Binary that was invoked
        binary: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing tool input/output failed
    #[error("t8n I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The tool did not finish in time and was killed
    #[error("t8n timed out after {0:?}")]
    Timeout(Duration),

    /// The tool exited unsuccessfully
    #[error("t8n exited with {code:?}: {stderr}")]
    NonZeroExit {
        /// Exit code, `None` if killed by a signal
        code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// The tool's output did not match the wire schema
    #[error("malformed t8n output: {0}")]
    MalformedOutput(String),

    /// The request could not be encoded
    #[error("failed to encode t8n input: {0}")]
    Encode(String),
}

/// Result type for bridge operations
pub type T8nResult<T> = Result<T, T8nError>;
