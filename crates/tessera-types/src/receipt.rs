//! Receipts and logs as reported by the transition tool

use crate::block::Bloom;
use serde::{Deserialize, Serialize};
use tessera_primitives::{serde_hex, Address, Bytes, H256};

/// One emitted log
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Emitting contract
    pub address: Address,
    /// Indexed topics
    #[serde(default)]
    pub topics: Vec<H256>,
    /// Unindexed data
    #[serde(default)]
    pub data: Bytes,
}

/// Receipt of one included transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Envelope type
    #[serde(rename = "type", default, with = "serde_hex::opt_quantity", skip_serializing_if = "Option::is_none")]
    pub tx_type: Option<u64>,
    /// 1 on success, 0 on revert (Byzantium and later)
    #[serde(default, with = "serde_hex::opt_quantity", skip_serializing_if = "Option::is_none")]
    pub status: Option<u64>,
    /// Gas used by the block up to and including this transaction
    #[serde(with = "serde_hex::quantity")]
    pub cumulative_gas_used: u64,
    /// Gas used by this transaction
    #[serde(with = "serde_hex::quantity")]
    pub gas_used: u64,
    /// Logs bloom
    #[serde(default)]
    pub logs_bloom: Bloom,
    /// Emitted logs
    #[serde(default, deserialize_with = "null_as_empty")]
    pub logs: Vec<Log>,
    /// Transaction hash
    pub transaction_hash: H256,
    /// Created contract, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<Address>,
    /// Position in the block
    #[serde(default, with = "serde_hex::opt_quantity", skip_serializing_if = "Option::is_none")]
    pub transaction_index: Option<u64>,
    /// EIP-4844 blob gas charged
    #[serde(default, with = "serde_hex::opt_quantity", skip_serializing_if = "Option::is_none")]
    pub blob_gas_used: Option<u64>,
}

impl Receipt {
    /// False only when the engine reported a revert
    pub fn succeeded(&self) -> bool {
        self.status != Some(0)
    }
}

fn null_as_empty<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Vec<Log>, D::Error> {
    Ok(Option::<Vec<Log>>::deserialize(deserializer)?.unwrap_or_default())
}
