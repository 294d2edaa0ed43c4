//! Declared exceptions: a single kind or an ordered alternation

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::{BlockException, Exception, TransactionException};

/// Errors parsing exception names
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseExceptionError {
    /// Name not present in the taxonomy
    #[error("unknown exception kind: {0}")]
    UnknownKind(String),
    /// Alternation with no members
    #[error("empty exception alternation")]
    Empty,
}

/// The failure a test author declares for a transaction or block.
///
/// Usually a single kind. When engines legitimately disagree on which of
/// several checks fires first, an alternation lists every acceptable kind
/// in preference order; it renders as `A|B`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpectedException(Vec<Exception>);

impl ExpectedException {
    /// Exactly one acceptable kind
    pub fn single(kind: impl Into<Exception>) -> Self {
        ExpectedException(vec![kind.into()])
    }

    /// Any of several kinds. Duplicates are dropped, first occurrence wins.
    pub fn any_of<I, E>(kinds: I) -> Result<Self, ParseExceptionError>
    where
        I: IntoIterator<Item = E>,
        E: Into<Exception>,
    {
        let mut members: Vec<Exception> = Vec::new();
        for k in kinds {
            let k = k.into();
            if !members.contains(&k) {
                members.push(k);
            }
        }
        if members.is_empty() {
            return Err(ParseExceptionError::Empty);
        }
        Ok(ExpectedException(members))
    }

    /// Members in declared order
    pub fn members(&self) -> &[Exception] {
        &self.0
    }

    /// Whether `kind` is an acceptable outcome
    pub fn contains(&self, kind: &Exception) -> bool {
        self.0.contains(kind)
    }

    /// True if this alternation has more than one member
    pub fn is_alternation(&self) -> bool {
        self.0.len() > 1
    }

    /// True if any member is a transaction-level kind
    pub fn has_transaction_kind(&self) -> bool {
        self.0.iter().any(Exception::is_transaction)
    }

    /// True if any member is a block-level kind
    pub fn has_block_kind(&self) -> bool {
        self.0.iter().any(|e| !e.is_transaction())
    }
}

impl From<Exception> for ExpectedException {
    fn from(e: Exception) -> Self {
        ExpectedException::single(e)
    }
}

impl From<TransactionException> for ExpectedException {
    fn from(e: TransactionException) -> Self {
        ExpectedException::single(e)
    }
}

impl From<BlockException> for ExpectedException {
    fn from(e: BlockException) -> Self {
        ExpectedException::single(e)
    }
}

impl fmt::Display for ExpectedException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            f.write_str(e.name())?;
        }
        Ok(())
    }
}

impl FromStr for ExpectedException {
    type Err = ParseExceptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kinds = s
            .split('|')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse::<Exception>)
            .collect::<Result<Vec<_>, _>>()?;
        ExpectedException::any_of(kinds)
    }
}

impl Serialize for ExpectedException {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ExpectedException {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_rendering() {
        let e = ExpectedException::single(TransactionException::IntrinsicGasTooLow);
        assert_eq!(e.to_string(), "TransactionException.INTRINSIC_GAS_TOO_LOW");
        assert!(!e.is_alternation());
        assert!(e.has_transaction_kind());
        assert!(!e.has_block_kind());
    }

    #[test]
    fn test_alternation_keeps_declared_order() {
        let e: ExpectedException = "TransactionException.INTRINSIC_GAS_BELOW_FLOOR_GAS_COST|TransactionException.INTRINSIC_GAS_TOO_LOW"
            .parse()
            .unwrap();
        assert_eq!(
            e.members(),
            &[
                Exception::from(TransactionException::IntrinsicGasBelowFloorGasCost),
                Exception::from(TransactionException::IntrinsicGasTooLow),
            ]
        );
        assert_eq!(e.to_string().matches('|').count(), 1);
    }

    #[test]
    fn test_alternation_drops_duplicates() {
        let e = ExpectedException::any_of([
            BlockException::IncorrectBlockFormat,
            BlockException::IncorrectBlockFormat,
        ])
        .unwrap();
        assert!(!e.is_alternation());
    }

    #[test]
    fn test_empty_and_unknown_rejected() {
        assert_eq!("".parse::<ExpectedException>(), Err(ParseExceptionError::Empty));
        assert!(matches!(
            "BlockException.NOPE".parse::<ExpectedException>(),
            Err(ParseExceptionError::UnknownKind(_))
        ));
    }
}
