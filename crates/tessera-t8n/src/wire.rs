//! JSON schema spoken with transition tools
//!
//! Quantities are minimal `0x` hex. Environment fields a fork does not
//! carry are left out entirely rather than sent as zero.

use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use tessera_crypto::trie::EMPTY_ROOT;
use tessera_forks::{Fork, HeaderField, TxType};
use tessera_primitives::serde_hex::{self, HexQuantity, HexU256};
use tessera_primitives::{Address, Bytes, H256, U256};
use tessera_types::{
    AccessListItem, Alloc, Authorization, Bloom, Environment, Receipt, SignedTransaction,
    Withdrawal, EMPTY_OMMERS_HASH,
};

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Block environment as the tool expects it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEnv {
    /// Fee recipient
    pub current_coinbase: Address,
    /// Block gas limit
    #[serde(with = "serde_hex::quantity")]
    pub current_gas_limit: u64,
    /// Block number
    #[serde(with = "serde_hex::quantity")]
    pub current_number: u64,
    /// Block timestamp
    #[serde(with = "serde_hex::quantity")]
    pub current_timestamp: u64,
    /// Pre-merge difficulty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_difficulty: Option<HexU256>,
    /// Post-merge randomness
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_random: Option<H256>,
    /// EIP-1559 base fee
    #[serde(default, with = "serde_hex::opt_quantity", skip_serializing_if = "Option::is_none")]
    pub current_base_fee: Option<u64>,
    /// EIP-4844 excess blob gas
    #[serde(default, with = "serde_hex::opt_quantity", skip_serializing_if = "Option::is_none")]
    pub current_excess_blob_gas: Option<u64>,
    /// EIP-4788 beacon root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_beacon_block_root: Option<H256>,
    /// EIP-4895 withdrawals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals: Option<Vec<Withdrawal>>,
    /// Ancestor hashes keyed by hex block number
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub block_hashes: BTreeMap<String, H256>,
}

impl WireEnv {
    /// Encode `env` for `fork`. Optional fields are only sent when `fork`
    /// carries them.
    pub fn new(env: &Environment, fork: Fork) -> Self {
        let fields = fork.header_fields();
        let carried = |field: HeaderField| fields.contains(&field);
        let post_merge = fork.requires_zero_difficulty();

        WireEnv {
            current_coinbase: env.coinbase,
            current_gas_limit: env.gas_limit,
            current_number: env.number,
            current_timestamp: env.timestamp,
            current_difficulty: if post_merge {
                None
            } else {
                Some(HexU256(env.difficulty.unwrap_or_default()))
            },
            current_random: if post_merge {
                Some(env.prev_randao.unwrap_or_default())
            } else {
                None
            },
            current_base_fee: env
                .base_fee_per_gas
                .filter(|_| carried(HeaderField::BaseFeePerGas)),
            current_excess_blob_gas: env
                .excess_blob_gas
                .filter(|_| carried(HeaderField::ExcessBlobGas)),
            parent_beacon_block_root: env
                .parent_beacon_block_root
                .filter(|_| carried(HeaderField::ParentBeaconBlockRoot)),
            withdrawals: env
                .withdrawals
                .clone()
                .filter(|_| carried(HeaderField::WithdrawalsRoot)),
            block_hashes: env
                .block_hashes
                .iter()
                .map(|(n, h)| (format!("0x{:x}", n), *h))
                .collect(),
        }
    }
}

/// Signed transaction on the wire
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireTransaction {
    /// Envelope type
    #[serde(rename = "type", with = "serde_hex::quantity")]
    pub tx_type: u64,
    /// Chain id, absent for unprotected legacy transactions
    #[serde(default, with = "serde_hex::opt_quantity", skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// Nonce
    #[serde(with = "serde_hex::quantity")]
    pub nonce: u64,
    /// Legacy gas price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<HexQuantity>,
    /// EIP-1559 tip cap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<HexQuantity>,
    /// EIP-1559 fee cap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<HexQuantity>,
    /// Gas limit
    #[serde(rename = "gas", with = "serde_hex::quantity")]
    pub gas_limit: u64,
    /// Recipient; `null` creates a contract
    pub to: Option<Address>,
    /// Value
    pub value: HexU256,
    /// Calldata
    pub input: Bytes,
    /// Access list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_list: Option<Vec<AccessListItem>>,
    /// Blob fee cap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_blob_gas: Option<HexQuantity>,
    /// Blob versioned hashes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_versioned_hashes: Option<Vec<H256>>,
    /// Authorizations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_list: Option<Vec<Authorization>>,
    /// Signature v
    pub v: HexU256,
    /// Signature r
    pub r: HexU256,
    /// Signature s
    pub s: HexU256,
    /// Recovered sender
    pub sender: Address,
    /// Transaction hash
    pub hash: H256,
}

impl From<&SignedTransaction> for WireTransaction {
    fn from(signed: &SignedTransaction) -> Self {
        let tx = &signed.tx;
        let typed = tx.tx_type != TxType::Legacy;
        let dynamic = tx.tx_type.has_dynamic_fee();
        WireTransaction {
            tx_type: tx.tx_type.as_u8() as u64,
            chain_id: (typed || tx.protected).then_some(tx.chain_id),
            nonce: tx.nonce,
            gas_price: (!dynamic).then_some(HexQuantity(tx.gas_price)),
            max_priority_fee_per_gas: dynamic.then_some(HexQuantity(tx.max_priority_fee_per_gas)),
            max_fee_per_gas: dynamic.then_some(HexQuantity(tx.max_fee_per_gas)),
            gas_limit: tx.gas_limit,
            to: tx.to,
            value: HexU256(tx.value),
            input: tx.data.clone(),
            access_list: typed.then(|| tx.access_list.clone()),
            max_fee_per_blob_gas: (tx.tx_type == TxType::Blob)
                .then_some(HexQuantity(tx.max_fee_per_blob_gas)),
            blob_versioned_hashes: (tx.tx_type == TxType::Blob)
                .then(|| tx.blob_versioned_hashes.clone()),
            authorization_list: (tx.tx_type == TxType::SetCode)
                .then(|| tx.authorization_list.clone()),
            v: HexU256(U256::from(signed.v)),
            r: HexU256(signed.r),
            s: HexU256(signed.s),
            sender: signed.sender,
            hash: signed.hash,
        }
    }
}

/// Everything one tool invocation needs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionRequest {
    /// Pre-state
    pub alloc: Alloc,
    /// Block environment, already filtered for `fork`
    pub env: WireEnv,
    /// Transactions in block order
    pub txs: Vec<WireTransaction>,
    /// Fork resolved for this block
    pub fork: Fork,
    /// Chain id
    pub chain_id: u64,
    /// Block reward, `None` to disable
    pub reward: Option<u64>,
}

impl TransitionRequest {
    /// Request for one block
    pub fn new(
        alloc: Alloc,
        env: &Environment,
        txs: &[SignedTransaction],
        fork: Fork,
        chain_id: u64,
    ) -> Self {
        TransitionRequest {
            alloc,
            env: WireEnv::new(env, fork),
            txs: txs.iter().map(WireTransaction::from).collect(),
            fork,
            chain_id,
            reward: None,
        }
    }

    /// Enable the block reward
    pub fn with_reward(mut self, reward: Option<u64>) -> Self {
        self.reward = reward;
        self
    }

    /// `--state.reward` value; `-1` disables rewards
    pub fn reward_arg(&self) -> String {
        match self.reward {
            Some(r) => r.to_string(),
            None => "-1".to_string(),
        }
    }
}

/// Combined stdin document of the geth streaming mode
#[derive(Serialize)]
pub(crate) struct StdinInput<'a> {
    pub alloc: &'a Alloc,
    pub txs: &'a [WireTransaction],
    pub env: &'a WireEnv,
}

/// A transaction the tool refused to include
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedTx {
    /// Position in the request
    pub index: usize,
    /// Engine-specific reason
    pub error: String,
}

/// Block-level result reported by the tool
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionResult {
    /// Post-state root
    pub state_root: H256,
    /// Transactions trie root
    pub tx_root: H256,
    /// Receipts trie root
    pub receipts_root: H256,
    /// Hash of the RLP log list
    pub logs_hash: H256,
    /// Aggregated bloom
    pub logs_bloom: Bloom,
    /// Receipts of included transactions
    #[serde(default, deserialize_with = "null_as_default")]
    pub receipts: Vec<Receipt>,
    /// Transactions left out
    #[serde(default, deserialize_with = "null_as_default")]
    pub rejected: Vec<RejectedTx>,
    /// Total gas used
    #[serde(with = "serde_hex::quantity")]
    pub gas_used: u64,
    /// Base fee the tool used
    #[serde(default, with = "serde_hex::opt_quantity", skip_serializing_if = "Option::is_none")]
    pub current_base_fee: Option<u64>,
    /// Withdrawals trie root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals_root: Option<H256>,
    /// Excess blob gas the tool used
    #[serde(default, with = "serde_hex::opt_quantity", skip_serializing_if = "Option::is_none")]
    pub current_excess_blob_gas: Option<u64>,
    /// Blob gas consumed
    #[serde(default, with = "serde_hex::opt_quantity", skip_serializing_if = "Option::is_none")]
    pub blob_gas_used: Option<u64>,
    /// EIP-7685 requests hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_hash: Option<H256>,
    /// EIP-7685 requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<Vec<Bytes>>,
}

impl TransitionResult {
    /// Result of a block with no included transactions
    pub fn empty(state_root: H256) -> Self {
        TransitionResult {
            state_root,
            tx_root: EMPTY_ROOT,
            receipts_root: EMPTY_ROOT,
            logs_hash: EMPTY_OMMERS_HASH,
            logs_bloom: Bloom::ZERO,
            receipts: Vec::new(),
            rejected: Vec::new(),
            gas_used: 0,
            current_base_fee: None,
            withdrawals_root: None,
            current_excess_blob_gas: None,
            blob_gas_used: None,
            requests_hash: None,
            requests: None,
        }
    }

    /// Rejection reason of the transaction at `index`
    pub fn rejection(&self, index: usize) -> Option<&str> {
        self.rejected
            .iter()
            .find(|r| r.index == index)
            .map(|r| r.error.as_str())
    }
}

/// Decoded tool output
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionResponse {
    /// Post-state
    pub alloc: Alloc,
    /// Block result
    pub result: TransitionResult,
    /// RLP list of included transactions, when the tool emits it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Bytes>,
    /// Per-transaction execution traces (one JSON value per line)
    #[serde(skip)]
    pub traces: Option<Vec<Vec<serde_json::Value>>>,
}
