//! Error types for fixture serialization

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    /// Filesystem failure
    #[error("IO error at {path}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// JSON encoding or decoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A fixture with this id was already written
    #[error("fixture already exists: {0}")]
    AlreadyExists(PathBuf),

    /// Scenario id cannot be used as a file name
    #[error("invalid scenario id: {0:?}")]
    InvalidId(String),

    /// Body or document is not a JSON object
    #[error("fixture {0} is not a JSON object")]
    NotAnObject(String),

    /// `_info.hash` is missing
    #[error("fixture {0} carries no _info.hash")]
    MissingHash(String),

    /// Recorded hash disagrees with the content
    #[error("hash mismatch for {id}: recorded {recorded}, computed {computed}")]
    HashMismatch {
        /// Scenario id
        id: String,
        /// Hash found in `_info`
        recorded: String,
        /// Hash of the body as read
        computed: String,
    },
}

impl FixtureError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        FixtureError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Fixture result type
pub type FixtureResult<T> = Result<T, FixtureError>;
