//! Holding observed outcomes against declarations

use crate::error::{FillResult, HarnessDefect, VerificationFailure};
use tessera_exceptions::{Exception, ExceptionMap, ExceptionMatch, ExpectedException};
use tessera_t8n::TransitionResponse;
use tessera_types::{Alloc, ExpectedAlloc};
use tracing::debug;

/// A locally detected failure must be one the author declared
pub(crate) fn check_local(
    at: &str,
    detected: Option<Exception>,
    declared: Option<&ExpectedException>,
) -> FillResult<Option<Exception>> {
    let Some(kind) = detected else {
        return Ok(None);
    };
    match declared {
        Some(expected) if expected.contains(&kind) => {
            debug!(%at, kind = kind.name(), "declared failure detected locally");
            Ok(Some(kind))
        }
        Some(expected) => Err(VerificationFailure::WrongException {
            at: at.to_string(),
            expected: expected.clone(),
            got: kind,
        }
        .into()),
        None => Err(HarnessDefect::UndeclaredLocalFailure {
            at: at.to_string(),
            kind,
        }
        .into()),
    }
}

/// Match the engine's verdict on one transaction against its declaration.
/// Returns the matched kind when the transaction was rightly rejected.
pub(crate) fn check_rejection(
    exceptions: &ExceptionMap,
    at: &str,
    declared: Option<&ExpectedException>,
    rejection: Option<&str>,
) -> FillResult<Option<Exception>> {
    match (declared, rejection) {
        (None, None) => Ok(None),
        (Some(expected), None) => Err(VerificationFailure::ExpectedExceptionButAccepted {
            at: at.to_string(),
            expected: expected.clone(),
        }
        .into()),
        (None, Some(message)) => match exceptions.classify(message) {
            Some(kind) => Err(VerificationFailure::UnexpectedRejection {
                at: at.to_string(),
                kind,
                message: message.to_string(),
            }
            .into()),
            None => Err(HarnessDefect::UnmappedFailure {
                engine: exceptions.engine().to_string(),
                at: at.to_string(),
                message: message.to_string(),
            }
            .into()),
        },
        (Some(expected), Some(message)) => match exceptions.match_expected(message, expected) {
            ExceptionMatch::Matched(kind) => {
                debug!(%at, kind = kind.name(), engine = exceptions.engine(), "rejection matched");
                Ok(Some(kind))
            }
            ExceptionMatch::Mismatch(got) => Err(VerificationFailure::WrongException {
                at: at.to_string(),
                expected: expected.clone(),
                got,
            }
            .into()),
            ExceptionMatch::Unmapped => Err(HarnessDefect::UnmappedFailure {
                engine: exceptions.engine().to_string(),
                at: at.to_string(),
                message: message.to_string(),
            }
            .into()),
        },
    }
}

/// The root an engine reports must be the root of the state it returned
pub(crate) fn check_engine_root(at: &str, response: &TransitionResponse) -> FillResult<()> {
    let computed = response.alloc.state_root();
    if computed != response.result.state_root {
        return Err(HarnessDefect::StateRootDisagreement {
            at: at.to_string(),
            reported: response.result.state_root,
            computed,
        }
        .into());
    }
    Ok(())
}

/// Every declared field must hold in `actual`
pub(crate) fn check_post_state(expected: &ExpectedAlloc, actual: &Alloc) -> FillResult<()> {
    let mismatches = expected.verify(actual);
    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(VerificationFailure::PostState(mismatches).into())
    }
}
