//! Transaction-level and block-level failure kinds

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::ParseExceptionError;

/// A transaction-level failure. Including such a transaction makes the
/// whole block invalid.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransactionException {
    /// Sender balance cannot cover `gas_limit * max_fee + value`
    #[error("sender balance is insufficient to cover the maximum transaction cost")]
    InsufficientAccountFunds,
    /// `max_fee_per_gas` below the block base fee
    #[error("max fee per gas is lower than the block base fee")]
    InsufficientMaxFeePerGas,
    /// `max_priority_fee_per_gas > max_fee_per_gas`
    #[error("max priority fee per gas exceeds max fee per gas")]
    PriorityGreaterThanMaxFeePerGas,
    /// Gas limit below the intrinsic cost
    #[error("gas limit is below the intrinsic gas cost")]
    IntrinsicGasTooLow,
    /// Gas limit below the calldata floor cost
    #[error("gas limit is below the calldata floor gas cost")]
    IntrinsicGasBelowFloorGasCost,
    /// Init code longer than the fork allows
    #[error("init code exceeds the maximum size")]
    InitcodeSizeExceeded,
    /// Nonce lower than the sender's account nonce
    #[error("transaction nonce is lower than the sender nonce")]
    NonceMismatchTooLow,
    /// Nonce higher than the sender's account nonce
    #[error("transaction nonce is higher than the sender nonce")]
    NonceMismatchTooHigh,
    /// Sender nonce is already at its maximum value
    #[error("sender nonce is at its maximum value")]
    NonceIsMax,
    /// Transaction type not enabled in the active fork
    #[error("transaction type is not supported by the active fork")]
    TypeNotSupported,
    /// Gas limit exceeds what is left in the block
    #[error("transaction gas limit exceeds the remaining block gas")]
    GasAllowanceExceeded,
    /// Sender account has code deployed
    #[error("sender account is not an externally owned account")]
    SenderNotEoa,
    /// Signature values out of range or unrecoverable
    #[error("transaction signature is invalid")]
    InvalidSignature,
    /// `max_fee_per_blob_gas` below the block blob gas price
    #[error("max fee per blob gas is lower than the block blob gas price")]
    InsufficientMaxFeePerBlobGas,
    /// Blob transaction without blob hashes
    #[error("blob transaction carries no blob versioned hashes")]
    Type3TxZeroBlobs,
    /// Blob hash with an unknown version byte
    #[error("blob versioned hash has an invalid version byte")]
    Type3TxInvalidBlobVersionedHash,
    /// Blob transaction with an empty `to`
    #[error("blob transaction cannot create a contract")]
    Type3TxContractCreation,
    /// Blob gas of a single transaction exceeds the per-block maximum
    #[error("blob gas exceeds the per-block maximum")]
    Type3TxMaxBlobGasAllowanceExceeded,
    /// Set-code transaction with an empty authorization list
    #[error("set-code transaction carries an empty authorization list")]
    Type4EmptyAuthorizationList,
    /// Set-code transaction with an empty `to`
    #[error("set-code transaction cannot create a contract")]
    Type4TxContractCreation,
}

impl TransactionException {
    /// Every transaction-level kind, in taxonomy order
    pub const ALL: &'static [TransactionException] = &[
        Self::InsufficientAccountFunds,
        Self::InsufficientMaxFeePerGas,
        Self::PriorityGreaterThanMaxFeePerGas,
        Self::IntrinsicGasTooLow,
        Self::IntrinsicGasBelowFloorGasCost,
        Self::InitcodeSizeExceeded,
        Self::NonceMismatchTooLow,
        Self::NonceMismatchTooHigh,
        Self::NonceIsMax,
        Self::TypeNotSupported,
        Self::GasAllowanceExceeded,
        Self::SenderNotEoa,
        Self::InvalidSignature,
        Self::InsufficientMaxFeePerBlobGas,
        Self::Type3TxZeroBlobs,
        Self::Type3TxInvalidBlobVersionedHash,
        Self::Type3TxContractCreation,
        Self::Type3TxMaxBlobGasAllowanceExceeded,
        Self::Type4EmptyAuthorizationList,
        Self::Type4TxContractCreation,
    ];

    /// Canonical name, e.g. `TransactionException.INTRINSIC_GAS_TOO_LOW`
    pub fn name(&self) -> &'static str {
        match self {
            Self::InsufficientAccountFunds => "TransactionException.INSUFFICIENT_ACCOUNT_FUNDS",
            Self::InsufficientMaxFeePerGas => "TransactionException.INSUFFICIENT_MAX_FEE_PER_GAS",
            Self::PriorityGreaterThanMaxFeePerGas => {
                "TransactionException.PRIORITY_GREATER_THAN_MAX_FEE_PER_GAS"
            }
            Self::IntrinsicGasTooLow => "TransactionException.INTRINSIC_GAS_TOO_LOW",
            Self::IntrinsicGasBelowFloorGasCost => {
                "TransactionException.INTRINSIC_GAS_BELOW_FLOOR_GAS_COST"
            }
            Self::InitcodeSizeExceeded => "TransactionException.INITCODE_SIZE_EXCEEDED",
            Self::NonceMismatchTooLow => "TransactionException.NONCE_MISMATCH_TOO_LOW",
            Self::NonceMismatchTooHigh => "TransactionException.NONCE_MISMATCH_TOO_HIGH",
            Self::NonceIsMax => "TransactionException.NONCE_IS_MAX",
            Self::TypeNotSupported => "TransactionException.TYPE_NOT_SUPPORTED",
            Self::GasAllowanceExceeded => "TransactionException.GAS_ALLOWANCE_EXCEEDED",
            Self::SenderNotEoa => "TransactionException.SENDER_NOT_EOA",
            Self::InvalidSignature => "TransactionException.INVALID_SIGNATURE",
            Self::InsufficientMaxFeePerBlobGas => {
                "TransactionException.INSUFFICIENT_MAX_FEE_PER_BLOB_GAS"
            }
            Self::Type3TxZeroBlobs => "TransactionException.TYPE_3_TX_ZERO_BLOBS",
            Self::Type3TxInvalidBlobVersionedHash => {
                "TransactionException.TYPE_3_TX_INVALID_BLOB_VERSIONED_HASH"
            }
            Self::Type3TxContractCreation => "TransactionException.TYPE_3_TX_CONTRACT_CREATION",
            Self::Type3TxMaxBlobGasAllowanceExceeded => {
                "TransactionException.TYPE_3_TX_MAX_BLOB_GAS_ALLOWANCE_EXCEEDED"
            }
            Self::Type4EmptyAuthorizationList => {
                "TransactionException.TYPE_4_EMPTY_AUTHORIZATION_LIST"
            }
            Self::Type4TxContractCreation => "TransactionException.TYPE_4_TX_CONTRACT_CREATION",
        }
    }
}

/// A block-level failure: a header or body property the fork forbids.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockException {
    /// Header is missing a field the fork requires or carries one it forbids
    #[error("block header fields do not match the fork's required set")]
    IncorrectBlockFormat,
    /// Extra data longer than 32 bytes
    #[error("header extra data exceeds 32 bytes")]
    ExtraDataTooBig,
    /// Sum of transaction gas exceeds the header gas limit
    #[error("gas used exceeds the block gas limit")]
    GasUsedOverflow,
    /// Gas limit outside the bounds allowed relative to the parent
    #[error("gas limit is outside the bounds allowed by the parent")]
    InvalidGasLimit,
    /// Base fee does not follow from the parent header
    #[error("base fee per gas does not follow from the parent header")]
    InvalidBaseFeePerGas,
    /// Non-zero difficulty after the merge, or wrong difficulty before it
    #[error("difficulty is invalid for the fork")]
    InvalidDifficulty,
    /// Withdrawals root does not match the block body
    #[error("withdrawals root does not match the block withdrawals")]
    InvalidWithdrawalsRoot,
    /// Blob gas used exceeds the per-block maximum
    #[error("blob gas used exceeds the per-block maximum")]
    BlobGasUsedAboveLimit,
    /// Blob gas used does not match the block's blob transactions
    #[error("blob gas used does not match the block transactions")]
    IncorrectBlobGasUsed,
    /// Excess blob gas does not follow from the parent header
    #[error("excess blob gas does not follow from the parent header")]
    IncorrectExcessBlobGas,
    /// Requests hash does not match the block's execution requests
    #[error("requests hash does not match the execution requests")]
    InvalidRequests,
    /// State root does not match the post-execution state
    #[error("state root does not match the post-execution state")]
    InvalidStateRoot,
    /// Block number is not parent number plus one
    #[error("block number is not the parent number plus one")]
    InvalidBlockNumber,
    /// Timestamp not strictly greater than the parent's
    #[error("timestamp is not greater than the parent timestamp")]
    InvalidBlockTimestampOlderThanParent,
    /// Parent hash does not reference the previous block
    #[error("parent hash does not reference a known block")]
    UnknownParent,
}

impl BlockException {
    /// Every block-level kind, in taxonomy order
    pub const ALL: &'static [BlockException] = &[
        Self::IncorrectBlockFormat,
        Self::ExtraDataTooBig,
        Self::GasUsedOverflow,
        Self::InvalidGasLimit,
        Self::InvalidBaseFeePerGas,
        Self::InvalidDifficulty,
        Self::InvalidWithdrawalsRoot,
        Self::BlobGasUsedAboveLimit,
        Self::IncorrectBlobGasUsed,
        Self::IncorrectExcessBlobGas,
        Self::InvalidRequests,
        Self::InvalidStateRoot,
        Self::InvalidBlockNumber,
        Self::InvalidBlockTimestampOlderThanParent,
        Self::UnknownParent,
    ];

    /// Canonical name, e.g. `BlockException.INCORRECT_BLOCK_FORMAT`
    pub fn name(&self) -> &'static str {
        match self {
            Self::IncorrectBlockFormat => "BlockException.INCORRECT_BLOCK_FORMAT",
            Self::ExtraDataTooBig => "BlockException.EXTRA_DATA_TOO_BIG",
            Self::GasUsedOverflow => "BlockException.GAS_USED_OVERFLOW",
            Self::InvalidGasLimit => "BlockException.INVALID_GASLIMIT",
            Self::InvalidBaseFeePerGas => "BlockException.INVALID_BASEFEE_PER_GAS",
            Self::InvalidDifficulty => "BlockException.INVALID_DIFFICULTY",
            Self::InvalidWithdrawalsRoot => "BlockException.INVALID_WITHDRAWALS_ROOT",
            Self::BlobGasUsedAboveLimit => "BlockException.BLOB_GAS_USED_ABOVE_LIMIT",
            Self::IncorrectBlobGasUsed => "BlockException.INCORRECT_BLOB_GAS_USED",
            Self::IncorrectExcessBlobGas => "BlockException.INCORRECT_EXCESS_BLOB_GAS",
            Self::InvalidRequests => "BlockException.INVALID_REQUESTS",
            Self::InvalidStateRoot => "BlockException.INVALID_STATE_ROOT",
            Self::InvalidBlockNumber => "BlockException.INVALID_BLOCK_NUMBER",
            Self::InvalidBlockTimestampOlderThanParent => {
                "BlockException.INVALID_BLOCK_TIMESTAMP_OLDER_THAN_PARENT"
            }
            Self::UnknownParent => "BlockException.UNKNOWN_PARENT",
        }
    }
}

/// Any member of the taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Exception {
    /// Transaction-level kind
    Transaction(TransactionException),
    /// Block-level kind
    Block(BlockException),
}

impl Exception {
    /// The whole taxonomy: transaction kinds first, then block kinds.
    pub fn all() -> impl Iterator<Item = Exception> {
        TransactionException::ALL
            .iter()
            .copied()
            .map(Exception::Transaction)
            .chain(BlockException::ALL.iter().copied().map(Exception::Block))
    }

    /// Canonical name
    pub fn name(&self) -> &'static str {
        match self {
            Exception::Transaction(e) => e.name(),
            Exception::Block(e) => e.name(),
        }
    }

    /// Human-readable description
    pub fn description(&self) -> String {
        match self {
            Exception::Transaction(e) => e.to_string(),
            Exception::Block(e) => e.to_string(),
        }
    }

    /// True for transaction-level kinds
    pub fn is_transaction(&self) -> bool {
        matches!(self, Exception::Transaction(_))
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Exception {
    type Err = ParseExceptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Exception::all()
            .find(|e| e.name() == s)
            .ok_or_else(|| ParseExceptionError::UnknownKind(s.to_string()))
    }
}

impl From<TransactionException> for Exception {
    fn from(e: TransactionException) -> Self {
        Exception::Transaction(e)
    }
}

impl From<BlockException> for Exception {
    fn from(e: BlockException) -> Self {
        Exception::Block(e)
    }
}

impl Serialize for Exception {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Exception {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
