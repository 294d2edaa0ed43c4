//! Transaction shapes embedded in fixtures

use serde::{Deserialize, Serialize};
use tessera_forks::TxType;
use tessera_primitives::serde_hex::{self, HexQuantity, HexU256};
use tessera_primitives::{Address, Bytes, H256, U256};
use tessera_types::{AccessListItem, Authorization, SignedTransaction};

/// A signed transaction as it appears in a blockchain fixture's block body
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureTransaction {
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
    #[serde(with = "serde_hex::quantity")]
    pub gas_limit: u64,
    /// Recipient; `null` creates a contract
    pub to: Option<Address>,
    /// Value
    pub value: HexU256,
    /// Calldata or init code
    pub data: Bytes,
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
    /// Sender
    pub sender: Address,
    /// Sender key, so clients can re-sign
    pub secret_key: H256,
}

impl From<&SignedTransaction> for FixtureTransaction {
    fn from(signed: &SignedTransaction) -> Self {
        let tx = &signed.tx;
        let typed = tx.tx_type != TxType::Legacy;
        let dynamic = tx.tx_type.has_dynamic_fee();
        let blob = tx.tx_type == TxType::Blob;
        FixtureTransaction {
            tx_type: tx.tx_type.as_u8() as u64,
            chain_id: (typed || tx.protected).then_some(tx.chain_id),
            nonce: tx.nonce,
            gas_price: (!dynamic).then_some(HexQuantity(tx.gas_price)),
            max_priority_fee_per_gas: dynamic.then_some(HexQuantity(tx.max_priority_fee_per_gas)),
            max_fee_per_gas: dynamic.then_some(HexQuantity(tx.max_fee_per_gas)),
            gas_limit: tx.gas_limit,
            to: tx.to,
            value: HexU256(tx.value),
            data: tx.data.clone(),
            access_list: typed.then(|| tx.access_list.clone()),
            max_fee_per_blob_gas: blob.then_some(HexQuantity(tx.max_fee_per_blob_gas)),
            blob_versioned_hashes: blob.then(|| tx.blob_versioned_hashes.clone()),
            authorization_list: (tx.tx_type == TxType::SetCode)
                .then(|| tx.authorization_list.clone()),
            v: HexU256(U256::from(signed.v)),
            r: HexU256(signed.r),
            s: HexU256(signed.s),
            sender: signed.sender,
            secret_key: signed.secret_key,
        }
    }
}

/// The single transaction of a state fixture, in the indexed form
/// (`data`, `gasLimit` and `value` are lists selected by `indexes`)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateTransaction {
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
    /// Gas limit variants
    pub gas_limit: Vec<HexQuantity>,
    /// Recipient; `null` creates a contract
    pub to: Option<Address>,
    /// Value variants
    pub value: Vec<HexU256>,
    /// Calldata variants
    pub data: Vec<Bytes>,
    /// Access list variants
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_lists: Option<Vec<Vec<AccessListItem>>>,
    /// Blob fee cap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_blob_gas: Option<HexQuantity>,
    /// Blob versioned hashes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_versioned_hashes: Option<Vec<H256>>,
    /// Authorizations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_list: Option<Vec<Authorization>>,
    /// Sender
    pub sender: Address,
    /// Sender key
    pub secret_key: H256,
}

impl From<&SignedTransaction> for StateTransaction {
    fn from(signed: &SignedTransaction) -> Self {
        let tx = &signed.tx;
        let dynamic = tx.tx_type.has_dynamic_fee();
        let blob = tx.tx_type == TxType::Blob;
        StateTransaction {
            nonce: tx.nonce,
            gas_price: (!dynamic).then_some(HexQuantity(tx.gas_price)),
            max_priority_fee_per_gas: dynamic.then_some(HexQuantity(tx.max_priority_fee_per_gas)),
            max_fee_per_gas: dynamic.then_some(HexQuantity(tx.max_fee_per_gas)),
            gas_limit: vec![HexQuantity::from(tx.gas_limit)],
            to: tx.to,
            value: vec![HexU256(tx.value)],
            data: vec![tx.data.clone()],
            access_lists: (tx.tx_type != TxType::Legacy).then(|| vec![tx.access_list.clone()]),
            max_fee_per_blob_gas: blob.then_some(HexQuantity(tx.max_fee_per_blob_gas)),
            blob_versioned_hashes: blob.then(|| tx.blob_versioned_hashes.clone()),
            authorization_list: (tx.tx_type == TxType::SetCode)
                .then(|| tx.authorization_list.clone()),
            sender: signed.sender,
            secret_key: signed.secret_key,
        }
    }
}
