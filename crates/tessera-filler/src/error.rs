//! Filling errors.
//!
//! A [`HarnessDefect`] means the tooling or the scenario itself is broken
//! and nothing can be concluded about the engine. A
//! [`VerificationFailure`] means the engine disagreed with what the author
//! declared.

use tessera_exceptions::{Exception, ExpectedException};
use tessera_fixtures::FixtureError;
use tessera_forks::UnsupportedCapability;
use tessera_primitives::H256;
use tessera_t8n::T8nError;
use tessera_types::{EnvError, PostStateMismatch};
use thiserror::Error;

/// Tooling or scenario construction problem; fatal to the scenario
#[derive(Debug, Error)]
pub enum HarnessDefect {
    /// Subprocess crash, timeout or unreadable output
    #[error("transition tool failed: {0}")]
    Tool(#[from] T8nError),

    /// The engine reported a failure no table entry covers
    #[error("{engine} reported an unmapped failure at {at}: {message}")]
    UnmappedFailure {
        /// Engine name
        engine: String,
        /// Where it happened
        at: String,
        /// Raw message
        message: String,
    },

    /// A local check rejected something the author did not declare invalid
    #[error("{at} fails local validation with {} but declares no exception", kind.name())]
    UndeclaredLocalFailure {
        /// Where it happened
        at: String,
        /// Kind the local check detected
        kind: Exception,
    },

    /// The scenario cannot be filled as written
    #[error("malformed scenario: {0}")]
    MalformedScenario(String),

    /// The environment does not fit the fork
    #[error("invalid environment: {0}")]
    Environment(#[from] EnvError),

    /// A capability the scenario relies on does not exist at that position
    #[error(transparent)]
    Unsupported(#[from] UnsupportedCapability),

    /// The engine's reported root is not the root of its own post-state
    #[error("state root disagreement at {at}: engine reported {reported}, post-state hashes to {computed}")]
    StateRootDisagreement {
        /// Where it happened
        at: String,
        /// Root in the engine result
        reported: H256,
        /// Root recomputed from the engine's alloc
        computed: H256,
    },

    /// The fixture could not be written
    #[error("fixture output failed: {0}")]
    Output(#[from] FixtureError),
}

/// The engine's behaviour does not match the declaration
#[derive(Debug, Error)]
pub enum VerificationFailure {
    /// Declared invalid, but accepted
    #[error("{at}: expected {expected}, got accepted")]
    ExpectedExceptionButAccepted {
        /// Where it happened
        at: String,
        /// Declared failure
        expected: ExpectedException,
    },

    /// Rejected, but for a different reason
    #[error("{at}: expected {expected}, got {}", got.name())]
    WrongException {
        /// Where it happened
        at: String,
        /// Declared failure
        expected: ExpectedException,
        /// Observed failure
        got: Exception,
    },

    /// Declared valid, but rejected
    #[error("{at}: expected success, got rejected: {message}")]
    UnexpectedRejection {
        /// Where it happened
        at: String,
        /// Kind the message maps to
        kind: Exception,
        /// Raw message
        message: String,
    },

    /// Computed post-state differs from the expected one
    #[error("post-state mismatch: {}", format_mismatches(.0))]
    PostState(Vec<PostStateMismatch>),

    /// A valid block does not reference its predecessor
    #[error("block {number}: parent hash {actual} does not reference previous block {expected}")]
    BrokenLinkage {
        /// Block number
        number: u64,
        /// Hash of the previous valid block
        expected: H256,
        /// Parent hash in the header
        actual: H256,
    },

    /// A valid block's state root is not the state it leaves behind
    #[error("block {number}: header state root {header} differs from post-state root {computed}")]
    StateRootMismatch {
        /// Block number
        number: u64,
        /// Root in the header
        header: H256,
        /// Root of the post-state
        computed: H256,
    },
}

fn format_mismatches(mismatches: &[PostStateMismatch]) -> String {
    mismatches
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Why a scenario could not be filled
#[derive(Debug, Error)]
pub enum FillError {
    /// Tooling or scenario defect
    #[error("harness defect: {0}")]
    Harness(#[from] HarnessDefect),

    /// Engine disagrees with the declaration
    #[error("verification failed: {0}")]
    Verification(#[from] VerificationFailure),
}

impl FillError {
    /// True for tooling/scenario problems rather than test failures
    pub fn is_harness_defect(&self) -> bool {
        matches!(self, FillError::Harness(_))
    }
}

impl From<T8nError> for FillError {
    fn from(e: T8nError) -> Self {
        FillError::Harness(e.into())
    }
}

impl From<EnvError> for FillError {
    fn from(e: EnvError) -> Self {
        FillError::Harness(e.into())
    }
}

impl From<UnsupportedCapability> for FillError {
    fn from(e: UnsupportedCapability) -> Self {
        FillError::Harness(e.into())
    }
}

impl From<FixtureError> for FillError {
    fn from(e: FixtureError) -> Self {
        FillError::Harness(e.into())
    }
}

/// Result type for filling
pub type FillResult<T> = Result<T, FillError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_exceptions::TransactionException;
    use tessera_primitives::Address;
    use tessera_types::AccountField;

    #[test]
    fn test_classification() {
        let harness: FillError = T8nError::MalformedOutput("x".into()).into();
        assert!(harness.is_harness_defect());

        let failure: FillError = VerificationFailure::ExpectedExceptionButAccepted {
            at: "tx 0".into(),
            expected: TransactionException::IntrinsicGasTooLow.into(),
        }
        .into();
        assert!(!failure.is_harness_defect());
        assert_eq!(
            failure.to_string(),
            "verification failed: tx 0: expected TransactionException.INTRINSIC_GAS_TOO_LOW, got accepted"
        );
    }

    #[test]
    fn test_wrong_exception_names_both_kinds() {
        let err = VerificationFailure::WrongException {
            at: "block 2".into(),
            expected: TransactionException::NonceMismatchTooLow.into(),
            got: TransactionException::NonceMismatchTooHigh.into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("NONCE_MISMATCH_TOO_LOW"));
        assert!(msg.contains("NONCE_MISMATCH_TOO_HIGH"));
    }

    #[test]
    fn test_post_state_lists_every_field() {
        let err = VerificationFailure::PostState(vec![
            PostStateMismatch {
                address: Address::from_low_u64(0x1000),
                field: AccountField::Nonce,
                expected: "1".into(),
                actual: "0".into(),
            },
            PostStateMismatch {
                address: Address::from_low_u64(0x1100),
                field: AccountField::Existence,
                expected: "absent".into(),
                actual: "present".into(),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("0x0000000000000000000000000000000000001000"));
        assert!(msg.contains("; "));
    }
}
