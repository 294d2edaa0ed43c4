//! Block environment, headers, withdrawals and block encoding

use crate::error::EnvError;
use crate::transaction::SignedTransaction;
use hex_literal::hex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tessera_crypto::{keccak256, trie};
use tessera_forks::{Fork, HeaderField};
use tessera_primitives::{serde_hex, Address, Bytes, H256, U256};
use tessera_rlp::{utils, Encodable, RlpStream};

/// `keccak(rlp([]))`, the ommers hash of every block without uncles
pub const EMPTY_OMMERS_HASH: H256 = H256::from_bytes(hex!(
    "1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347"
));

/// Base fee used when the author does not set one
pub const DEFAULT_BASE_FEE: u64 = 7;

/// Block gas limit used when the author does not set one
pub const DEFAULT_GAS_LIMIT: u64 = 0x016345785d8a0000;

/// Pre-merge difficulty used when the author does not set one
pub const DEFAULT_DIFFICULTY: u64 = 0x20000;

/// Timestamp of the first block when the author does not set one
pub const DEFAULT_TIMESTAMP: u64 = 1000;

/// Coinbase used when the author does not set one
pub const DEFAULT_COINBASE: Address =
    Address::from_bytes(hex!("2adc25665018aa1fe0e6bc666dac8fc2697ff9ba"));

/// 2048-bit logs bloom
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bloom(pub [u8; 256]);

impl Bloom {
    /// Empty bloom
    pub const ZERO: Bloom = Bloom([0u8; 256]);

    /// From a 256-byte slice
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; 256] = slice.try_into().ok()?;
        Some(Bloom(bytes))
    }
}

impl Default for Bloom {
    fn default() -> Self {
        Bloom::ZERO
    }
}

impl fmt::Debug for Bloom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bloom(0x{})", hex_string(&self.0))
    }
}

impl Encodable for Bloom {
    fn rlp_append(&self, s: &mut RlpStream) {
        utils::append_bytes(s, &self.0);
    }
}

impl Serialize for Bloom {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex_string(&self.0)))
    }
}

impl<'de> Deserialize<'de> for Bloom {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = Bytes::deserialize(deserializer)?;
        Bloom::from_slice(&bytes).ok_or_else(|| de::Error::invalid_length(bytes.len(), &"256 bytes"))
    }
}

fn hex_string(bytes: &[u8]) -> String {
    Bytes::from(bytes).to_hex().split_off(2)
}

/// EIP-4895 beacon chain withdrawal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    /// Monotonic withdrawal index
    #[serde(with = "serde_hex::quantity")]
    pub index: u64,
    /// Validator index
    #[serde(with = "serde_hex::quantity")]
    pub validator_index: u64,
    /// Recipient
    pub address: Address,
    /// Amount in gwei
    #[serde(with = "serde_hex::quantity")]
    pub amount: u64,
}

impl Encodable for Withdrawal {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(4);
        s.append(&self.index);
        s.append(&self.validator_index);
        s.append(&self.address);
        s.append(&self.amount);
    }
}

/// Root of the withdrawals trie
pub fn withdrawals_root(withdrawals: &[Withdrawal]) -> H256 {
    trie::ordered_trie_root(withdrawals.iter().map(tessera_rlp::encode))
}

/// Root of the transactions trie, keyed by index over envelopes
pub fn transactions_root(txs: &[SignedTransaction]) -> H256 {
    trie::ordered_trie_root(txs.iter().map(|tx| tx.encoded.to_vec()))
}

/// Block context handed to the transition tool. Fork-dependent fields are
/// `None` where the fork does not carry them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Environment {
    /// Fee recipient
    pub coinbase: Address,
    /// Block gas limit
    pub gas_limit: u64,
    /// Block number
    pub number: u64,
    /// Block timestamp
    pub timestamp: u64,
    /// Proof-of-work difficulty (zero after the merge)
    pub difficulty: Option<U256>,
    /// Beacon randomness (after the merge)
    pub prev_randao: Option<H256>,
    /// EIP-1559 base fee
    pub base_fee_per_gas: Option<u64>,
    /// EIP-4844 excess blob gas
    pub excess_blob_gas: Option<u64>,
    /// EIP-4788 parent beacon block root
    pub parent_beacon_block_root: Option<H256>,
    /// EIP-4895 withdrawals
    pub withdrawals: Option<Vec<Withdrawal>>,
    /// Ancestor hashes visible to `BLOCKHASH`
    pub block_hashes: BTreeMap<u64, H256>,
    /// Header extra data
    pub extra_data: Bytes,
}

impl Default for Environment {
    fn default() -> Self {
        Environment {
            coinbase: DEFAULT_COINBASE,
            gas_limit: DEFAULT_GAS_LIMIT,
            number: 1,
            timestamp: DEFAULT_TIMESTAMP,
            difficulty: None,
            prev_randao: None,
            base_fee_per_gas: None,
            excess_blob_gas: None,
            parent_beacon_block_root: None,
            withdrawals: None,
            block_hashes: BTreeMap::new(),
            extra_data: Bytes::new(),
        }
    }
}

impl Environment {
    /// Fill every field `fork` requires with its default and reject fields
    /// the author set that `fork` does not carry
    pub fn for_fork(mut self, fork: Fork) -> Result<Self, EnvError> {
        let fields = fork.header_fields();
        let forbid = |field: HeaderField, set: bool| {
            if set && !fields.contains(&field) {
                Err(EnvError::ForbiddenField { field, fork })
            } else {
                Ok(())
            }
        };

        forbid(HeaderField::BaseFeePerGas, self.base_fee_per_gas.is_some())?;
        forbid(HeaderField::WithdrawalsRoot, self.withdrawals.is_some())?;
        forbid(HeaderField::ExcessBlobGas, self.excess_blob_gas.is_some())?;
        forbid(
            HeaderField::ParentBeaconBlockRoot,
            self.parent_beacon_block_root.is_some(),
        )?;

        if fields.contains(&HeaderField::BaseFeePerGas) {
            self.base_fee_per_gas.get_or_insert(DEFAULT_BASE_FEE);
        }
        if fields.contains(&HeaderField::WithdrawalsRoot) {
            self.withdrawals.get_or_insert_with(Vec::new);
        }
        if fields.contains(&HeaderField::ExcessBlobGas) {
            self.excess_blob_gas.get_or_insert(0);
        }
        if fields.contains(&HeaderField::ParentBeaconBlockRoot) {
            self.parent_beacon_block_root.get_or_insert(H256::ZERO);
        }

        if fork.requires_zero_difficulty() {
            if self.difficulty.is_some_and(|d| !d.is_zero()) {
                return Err(EnvError::NonZeroDifficulty(fork));
            }
            self.difficulty = Some(U256::zero());
            self.prev_randao.get_or_insert(H256::ZERO);
        } else {
            self.difficulty.get_or_insert(U256::from(DEFAULT_DIFFICULTY));
        }
        Ok(self)
    }
}

/// Serde for the 8-byte header nonce
mod nonce8 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{:016x}", value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let bytes = Bytes::deserialize(deserializer)?;
        let arr: [u8; 8] = bytes[..]
            .try_into()
            .map_err(|_| de::Error::invalid_length(bytes.len(), &"8 bytes"))?;
        Ok(u64::from_be_bytes(arr))
    }
}

/// Block header. Fields introduced by later forks are `None` when absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    /// Parent block hash
    pub parent_hash: H256,
    /// Ommers hash
    #[serde(rename = "uncleHash")]
    pub ommers_hash: H256,
    /// Fee recipient
    pub coinbase: Address,
    /// State trie root
    pub state_root: H256,
    /// Transactions trie root
    #[serde(rename = "transactionsTrie")]
    pub transactions_root: H256,
    /// Receipts trie root
    #[serde(rename = "receiptTrie")]
    pub receipts_root: H256,
    /// Logs bloom
    #[serde(rename = "bloom")]
    pub logs_bloom: Bloom,
    /// Difficulty
    #[serde(with = "serde_hex::u256")]
    pub difficulty: U256,
    /// Block number
    #[serde(with = "serde_hex::quantity")]
    pub number: u64,
    /// Gas limit
    #[serde(with = "serde_hex::quantity")]
    pub gas_limit: u64,
    /// Gas used
    #[serde(with = "serde_hex::quantity")]
    pub gas_used: u64,
    /// Timestamp
    #[serde(with = "serde_hex::quantity")]
    pub timestamp: u64,
    /// Extra data
    pub extra_data: Bytes,
    /// Mix hash, `prevRandao` after the merge
    pub mix_hash: H256,
    /// Proof-of-work nonce
    #[serde(with = "nonce8")]
    pub nonce: u64,
    /// EIP-1559
    #[serde(default, with = "serde_hex::opt_quantity", skip_serializing_if = "Option::is_none")]
    pub base_fee_per_gas: Option<u64>,
    /// EIP-4895
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals_root: Option<H256>,
    /// EIP-4844
    #[serde(default, with = "serde_hex::opt_quantity", skip_serializing_if = "Option::is_none")]
    pub blob_gas_used: Option<u64>,
    /// EIP-4844
    #[serde(default, with = "serde_hex::opt_quantity", skip_serializing_if = "Option::is_none")]
    pub excess_blob_gas: Option<u64>,
    /// EIP-4788
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_beacon_block_root: Option<H256>,
    /// EIP-7685
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_hash: Option<H256>,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            parent_hash: H256::ZERO,
            ommers_hash: EMPTY_OMMERS_HASH,
            coinbase: Address::ZERO,
            state_root: trie::EMPTY_ROOT,
            transactions_root: trie::EMPTY_ROOT,
            receipts_root: trie::EMPTY_ROOT,
            logs_bloom: Bloom::ZERO,
            difficulty: U256::zero(),
            number: 0,
            gas_limit: DEFAULT_GAS_LIMIT,
            gas_used: 0,
            timestamp: 0,
            extra_data: Bytes::new(),
            mix_hash: H256::ZERO,
            nonce: 0,
            base_fee_per_gas: None,
            withdrawals_root: None,
            blob_gas_used: None,
            excess_blob_gas: None,
            parent_beacon_block_root: None,
            requests_hash: None,
        }
    }
}

impl Header {
    /// Optional fields currently present
    pub fn present_fields(&self) -> BTreeSet<HeaderField> {
        HeaderField::ALL
            .into_iter()
            .filter(|f| self.has_field(*f))
            .collect()
    }

    /// True if the optional field is present
    pub fn has_field(&self, field: HeaderField) -> bool {
        match field {
            HeaderField::BaseFeePerGas => self.base_fee_per_gas.is_some(),
            HeaderField::WithdrawalsRoot => self.withdrawals_root.is_some(),
            HeaderField::BlobGasUsed => self.blob_gas_used.is_some(),
            HeaderField::ExcessBlobGas => self.excess_blob_gas.is_some(),
            HeaderField::ParentBeaconBlockRoot => self.parent_beacon_block_root.is_some(),
            HeaderField::RequestsHash => self.requests_hash.is_some(),
        }
    }

    /// Drop an optional field
    pub fn remove_field(&mut self, field: HeaderField) {
        match field {
            HeaderField::BaseFeePerGas => self.base_fee_per_gas = None,
            HeaderField::WithdrawalsRoot => self.withdrawals_root = None,
            HeaderField::BlobGasUsed => self.blob_gas_used = None,
            HeaderField::ExcessBlobGas => self.excess_blob_gas = None,
            HeaderField::ParentBeaconBlockRoot => self.parent_beacon_block_root = None,
            HeaderField::RequestsHash => self.requests_hash = None,
        }
    }

    /// Add an optional field with a zero value unless already present
    pub fn insert_field(&mut self, field: HeaderField) {
        match field {
            HeaderField::BaseFeePerGas => {
                self.base_fee_per_gas.get_or_insert(0);
            }
            HeaderField::WithdrawalsRoot => {
                self.withdrawals_root.get_or_insert(trie::EMPTY_ROOT);
            }
            HeaderField::BlobGasUsed => {
                self.blob_gas_used.get_or_insert(0);
            }
            HeaderField::ExcessBlobGas => {
                self.excess_blob_gas.get_or_insert(0);
            }
            HeaderField::ParentBeaconBlockRoot => {
                self.parent_beacon_block_root.get_or_insert(H256::ZERO);
            }
            HeaderField::RequestsHash => {
                self.requests_hash.get_or_insert(H256::ZERO);
            }
        }
    }

    /// RLP encoding; optional fields are appended in order when present
    pub fn rlp(&self) -> Vec<u8> {
        let optional = self.present_fields().len();
        let mut s = RlpStream::new_list(15 + optional);
        s.append(&self.parent_hash);
        s.append(&self.ommers_hash);
        s.append(&self.coinbase);
        s.append(&self.state_root);
        s.append(&self.transactions_root);
        s.append(&self.receipts_root);
        s.append(&self.logs_bloom);
        s.append(&self.difficulty);
        s.append(&self.number);
        s.append(&self.gas_limit);
        s.append(&self.gas_used);
        s.append(&self.timestamp);
        utils::append_bytes(&mut s, &self.extra_data);
        s.append(&self.mix_hash);
        utils::append_bytes(&mut s, &self.nonce.to_be_bytes());
        if let Some(v) = self.base_fee_per_gas {
            s.append(&v);
        }
        if let Some(v) = &self.withdrawals_root {
            s.append(v);
        }
        if let Some(v) = self.blob_gas_used {
            s.append(&v);
        }
        if let Some(v) = self.excess_blob_gas {
            s.append(&v);
        }
        if let Some(v) = &self.parent_beacon_block_root {
            s.append(v);
        }
        if let Some(v) = &self.requests_hash {
            s.append(v);
        }
        s.out().to_vec()
    }

    /// Block hash
    pub fn hash(&self) -> H256 {
        keccak256(&self.rlp())
    }
}

/// Post-construction edits to a header, used to build invalid blocks
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderModifier {
    /// Optional fields to drop
    pub remove: BTreeSet<HeaderField>,
    /// Optional fields to force in with a zero value
    pub insert: BTreeSet<HeaderField>,
    /// Replacement extra data
    pub extra_data: Option<Bytes>,
    /// Replacement gas limit
    pub gas_limit: Option<u64>,
    /// Replacement state root
    pub state_root: Option<H256>,
    /// Replacement base fee
    pub base_fee_per_gas: Option<u64>,
    /// Replacement blob gas used
    pub blob_gas_used: Option<u64>,
    /// Replacement excess blob gas
    pub excess_blob_gas: Option<u64>,
    /// Replacement difficulty
    pub difficulty: Option<U256>,
    /// Replacement parent hash
    pub parent_hash: Option<H256>,
}

impl HeaderModifier {
    /// No edits
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop `field`
    pub fn remove(mut self, field: HeaderField) -> Self {
        self.remove.insert(field);
        self
    }

    /// Force `field` in
    pub fn insert(mut self, field: HeaderField) -> Self {
        self.insert.insert(field);
        self
    }

    /// Replace extra data
    pub fn extra_data(mut self, data: impl Into<Bytes>) -> Self {
        self.extra_data = Some(data.into());
        self
    }

    /// Replace the gas limit
    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// Replace the state root
    pub fn state_root(mut self, root: H256) -> Self {
        self.state_root = Some(root);
        self
    }

    /// Replace the base fee
    pub fn base_fee_per_gas(mut self, fee: u64) -> Self {
        self.base_fee_per_gas = Some(fee);
        self
    }

    /// Replace blob gas used
    pub fn blob_gas_used(mut self, used: u64) -> Self {
        self.blob_gas_used = Some(used);
        self
    }

    /// Replace excess blob gas
    pub fn excess_blob_gas(mut self, excess: u64) -> Self {
        self.excess_blob_gas = Some(excess);
        self
    }

    /// Replace the difficulty
    pub fn difficulty(mut self, difficulty: impl Into<U256>) -> Self {
        self.difficulty = Some(difficulty.into());
        self
    }

    /// Replace the parent hash
    pub fn parent_hash(mut self, hash: H256) -> Self {
        self.parent_hash = Some(hash);
        self
    }

    /// True if applying this modifier changes nothing
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply in place. Insertions run before removals and value overrides
    /// run last.
    pub fn apply(&self, header: &mut Header) {
        for field in &self.insert {
            header.insert_field(*field);
        }
        for field in &self.remove {
            header.remove_field(*field);
        }
        if let Some(v) = &self.extra_data {
            header.extra_data = v.clone();
        }
        if let Some(v) = self.gas_limit {
            header.gas_limit = v;
        }
        if let Some(v) = self.state_root {
            header.state_root = v;
        }
        if let Some(v) = self.base_fee_per_gas {
            header.base_fee_per_gas = Some(v);
        }
        if let Some(v) = self.blob_gas_used {
            header.blob_gas_used = Some(v);
        }
        if let Some(v) = self.excess_blob_gas {
            header.excess_blob_gas = Some(v);
        }
        if let Some(v) = self.difficulty {
            header.difficulty = v;
        }
        if let Some(v) = self.parent_hash {
            header.parent_hash = v;
        }
    }
}

/// `rlp([header, txs, ommers, withdrawals?])`
pub fn block_rlp(
    header: &Header,
    txs: &[SignedTransaction],
    withdrawals: Option<&[Withdrawal]>,
) -> Bytes {
    let mut s = RlpStream::new_list(if withdrawals.is_some() { 4 } else { 3 });
    utils::append_encoded(&mut s, &header.rlp());
    s.begin_list(txs.len());
    for tx in txs {
        tx.append_to_block(&mut s);
    }
    s.begin_list(0);
    if let Some(withdrawals) = withdrawals {
        s.append_list::<Withdrawal, Withdrawal>(withdrawals);
    }
    Bytes::from(s.out().to_vec())
}
