//! Per-engine tables from failure kind to the message substrings an
//! engine is known to emit for it.

use std::collections::BTreeMap;

use crate::{Exception, ExpectedException, TransactionException as Tx};

/// Outcome of matching an engine message against a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionMatch {
    /// The message maps to a declared kind
    Matched(Exception),
    /// The message maps to a known kind that was not declared
    Mismatch(Exception),
    /// No entry in the table covers the message
    Unmapped,
}

/// Versioned, explicitly partial mapping for one engine.
///
/// A kind with no entry is simply not recognisable from that engine's
/// output; a message no entry covers is [`ExceptionMatch::Unmapped`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionMap {
    engine: String,
    version: String,
    entries: BTreeMap<Exception, Vec<String>>,
}

impl ExceptionMap {
    /// Empty table
    pub fn new(engine: impl Into<String>, version: impl Into<String>) -> Self {
        ExceptionMap {
            engine: engine.into(),
            version: version.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Builder form of [`ExceptionMap::extend`]
    pub fn with(mut self, kind: impl Into<Exception>, substrings: &[&str]) -> Self {
        self.extend(kind, substrings.iter().map(|s| s.to_string()));
        self
    }

    /// Add substrings for a kind. Existing ones are kept; empty strings are
    /// ignored because they would match every message.
    pub fn extend<I>(&mut self, kind: impl Into<Exception>, substrings: I)
    where
        I: IntoIterator<Item = String>,
    {
        let entry = self.entries.entry(kind.into()).or_default();
        for s in substrings {
            if !s.is_empty() && !entry.contains(&s) {
                entry.push(s);
            }
        }
    }

    /// Engine this table describes
    pub fn engine(&self) -> &str {
        &self.engine
    }

    /// Engine version the table was last checked against
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Substrings registered for `kind`
    pub fn substrings(&self, kind: &Exception) -> &[String] {
        self.entries.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the table has at least one substring for `kind`
    pub fn is_mapped(&self, kind: &Exception) -> bool {
        !self.substrings(kind).is_empty()
    }

    fn kind_matches(&self, kind: &Exception, message: &str) -> bool {
        self.substrings(kind).iter().any(|s| message.contains(s.as_str()))
    }

    /// First kind, in taxonomy order, whose substrings occur in `message`
    pub fn classify(&self, message: &str) -> Option<Exception> {
        self.entries
            .keys()
            .find(|kind| self.kind_matches(kind, message))
            .copied()
    }

    /// Match `message` against a declaration.
    ///
    /// Declared members are tried first, in declared order, so a message
    /// that several kinds share resolves to what the author declared.
    /// Only if none of them match is the whole table consulted.
    pub fn match_expected(&self, message: &str, expected: &ExpectedException) -> ExceptionMatch {
        if let Some(kind) = expected
            .members()
            .iter()
            .find(|kind| self.kind_matches(kind, message))
        {
            return ExceptionMatch::Matched(*kind);
        }
        match self.classify(message) {
            Some(kind) => ExceptionMatch::Mismatch(kind),
            None => ExceptionMatch::Unmapped,
        }
    }

    /// go-ethereum `evm t8n`
    pub fn geth() -> Self {
        ExceptionMap::new("geth", "1.15")
            .with(Tx::SenderNotEoa, &["sender not an eoa"])
            .with(Tx::NonceMismatchTooLow, &["nonce too low"])
            .with(Tx::NonceMismatchTooHigh, &["nonce too high"])
            .with(Tx::NonceIsMax, &["nonce has max value"])
            .with(Tx::GasAllowanceExceeded, &["gas limit reached"])
            .with(
                Tx::InsufficientAccountFunds,
                &["insufficient funds for gas * price + value"],
            )
            .with(Tx::InitcodeSizeExceeded, &["max initcode size exceeded"])
            .with(Tx::IntrinsicGasTooLow, &["intrinsic gas too low"])
            .with(
                Tx::IntrinsicGasBelowFloorGasCost,
                &["insufficient gas for floor data gas cost"],
            )
            .with(Tx::TypeNotSupported, &["transaction type not supported"])
            .with(
                Tx::PriorityGreaterThanMaxFeePerGas,
                &["max priority fee per gas higher than max fee per gas"],
            )
            .with(
                Tx::InsufficientMaxFeePerGas,
                &["max fee per gas less than block base fee"],
            )
            .with(Tx::InvalidSignature, &["invalid transaction v, r, s values"])
            .with(
                Tx::InsufficientMaxFeePerBlobGas,
                &["max fee per blob gas less than block blob gas fee"],
            )
            .with(Tx::Type3TxZeroBlobs, &["blob transaction missing blob hashes"])
            .with(Tx::Type3TxContractCreation, &["blob transaction of type create"])
            .with(Tx::Type3TxInvalidBlobVersionedHash, &["has invalid hash version"])
            .with(
                Tx::Type3TxMaxBlobGasAllowanceExceeded,
                &["would exceed maximum allowance", "blob gas limit exceeded"],
            )
            .with(
                Tx::Type4EmptyAuthorizationList,
                &["EIP-7702 transaction with empty auth list"],
            )
            .with(
                Tx::Type4TxContractCreation,
                &["EIP-7702 transaction cannot be used to create contract"],
            )
    }

    /// evmone `evmone-t8n`
    pub fn evmone() -> Self {
        ExceptionMap::new("evmone", "0.14")
            .with(Tx::SenderNotEoa, &["sender not an eoa:"])
            .with(Tx::NonceMismatchTooLow, &["nonce too low"])
            .with(Tx::NonceMismatchTooHigh, &["nonce too high"])
            .with(Tx::NonceIsMax, &["nonce has max value:"])
            .with(Tx::GasAllowanceExceeded, &["gas limit reached"])
            .with(Tx::InsufficientAccountFunds, &["insufficient funds for gas * price + value"])
            .with(Tx::InitcodeSizeExceeded, &["max initcode size exceeded"])
            .with(Tx::IntrinsicGasTooLow, &["intrinsic gas too low"])
            // evmone reports the calldata floor with the same message
            .with(Tx::IntrinsicGasBelowFloorGasCost, &["intrinsic gas too low"])
            .with(Tx::TypeNotSupported, &["transaction type not supported"])
            .with(
                Tx::PriorityGreaterThanMaxFeePerGas,
                &["max priority fee per gas higher than max fee per gas"],
            )
            .with(Tx::InsufficientMaxFeePerGas, &["max fee per gas less than block base fee"])
            .with(
                Tx::InsufficientMaxFeePerBlobGas,
                &["max blob fee per gas less than block base fee"],
            )
            .with(Tx::Type3TxZeroBlobs, &["empty blob hashes list"])
            .with(
                Tx::Type3TxContractCreation,
                &["blob transaction must not be a create transaction"],
            )
            .with(Tx::Type3TxInvalidBlobVersionedHash, &["invalid blob hash version"])
            .with(Tx::Type3TxMaxBlobGasAllowanceExceeded, &["blob gas limit exceeded"])
            .with(Tx::Type4EmptyAuthorizationList, &["empty authorization list"])
            .with(Tx::Type4TxContractCreation, &["set code transaction must "])
    }

    /// Built-in table for an engine name, if one exists
    pub fn for_engine(engine: &str) -> Option<Self> {
        match engine {
            "geth" => Some(Self::geth()),
            "evmone" => Some(Self::evmone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BlockException;
    use proptest::prelude::*;

    #[test]
    fn test_geth_classify() {
        let map = ExceptionMap::geth();
        assert_eq!(
            map.classify("intrinsic gas too low: have 21000, want 21001"),
            Some(Exception::from(Tx::IntrinsicGasTooLow))
        );
        assert_eq!(
            map.classify("could not apply tx 0 [0xab]: nonce too low: address 0x.., tx: 0 state: 1"),
            Some(Exception::from(Tx::NonceMismatchTooLow))
        );
        assert_eq!(map.classify("something new and strange"), None);
    }

    #[test]
    fn test_match_declared_single() {
        let map = ExceptionMap::geth();
        let expected = ExpectedException::single(Tx::IntrinsicGasTooLow);
        assert_eq!(
            map.match_expected("intrinsic gas too low: have 0, want 21000", &expected),
            ExceptionMatch::Matched(Tx::IntrinsicGasTooLow.into())
        );
        assert_eq!(
            map.match_expected("nonce too high", &expected),
            ExceptionMatch::Mismatch(Tx::NonceMismatchTooHigh.into())
        );
        assert_eq!(
            map.match_expected("totally unknown", &expected),
            ExceptionMatch::Unmapped
        );
    }

    #[test]
    fn test_shared_message_resolves_to_declared_member() {
        // evmone uses one message for both intrinsic checks
        let map = ExceptionMap::evmone();
        let floor = ExpectedException::single(Tx::IntrinsicGasBelowFloorGasCost);
        assert_eq!(
            map.match_expected("intrinsic gas too low", &floor),
            ExceptionMatch::Matched(Tx::IntrinsicGasBelowFloorGasCost.into())
        );
        // Without a declaration, taxonomy order decides
        assert_eq!(
            map.classify("intrinsic gas too low"),
            Some(Tx::IntrinsicGasTooLow.into())
        );
    }

    #[test]
    fn test_alternation_member_order() {
        let map = ExceptionMap::evmone();
        let alt = ExpectedException::any_of([
            Tx::IntrinsicGasBelowFloorGasCost,
            Tx::IntrinsicGasTooLow,
        ])
        .unwrap();
        assert_eq!(
            map.match_expected("intrinsic gas too low", &alt),
            ExceptionMatch::Matched(Tx::IntrinsicGasBelowFloorGasCost.into())
        );
    }

    #[test]
    fn test_extend_ignores_empty_and_duplicates() {
        let mut map = ExceptionMap::new("custom", "0");
        map.extend(
            BlockException::IncorrectBlockFormat,
            vec!["".to_string(), "bad header".to_string(), "bad header".to_string()],
        );
        let kind = Exception::from(BlockException::IncorrectBlockFormat);
        assert_eq!(map.substrings(&kind), &["bad header".to_string()]);
        assert!(map.is_mapped(&kind));
        assert_eq!(map.classify("x"), None);
    }

    #[test]
    fn test_for_engine() {
        assert_eq!(ExceptionMap::for_engine("geth").unwrap().engine(), "geth");
        assert_eq!(ExceptionMap::for_engine("evmone").unwrap().version(), "0.14");
        assert!(ExceptionMap::for_engine("besu").is_none());
    }

    proptest! {
        // Any mapped substring, embedded anywhere, classifies to some kind
        // that registers a substring contained in the message.
        #[test]
        fn prop_classify_only_returns_contained_kinds(prefix in "[a-z ]{0,12}", suffix in "[a-z ]{0,12}", idx in 0usize..20) {
            let map = ExceptionMap::geth();
            let kinds: Vec<Exception> = Exception::all().filter(|k| map.is_mapped(k)).collect();
            let kind = kinds[idx % kinds.len()];
            let message = format!("{}{}{}", prefix, map.substrings(&kind)[0], suffix);
            let got = map.classify(&message).unwrap();
            prop_assert!(map.substrings(&got).iter().any(|s| message.contains(s.as_str())));
        }
    }
}
