//! On-disk fixture schemas
//!
//! Field names follow the ethereum/tests conventions clients already
//! consume, so the same files can be replayed by any client's runner.

use crate::transaction::{FixtureTransaction, StateTransaction};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tessera_exceptions::ExpectedException;
use tessera_primitives::{serde_hex, Address, Bytes, H256, U256};
use tessera_types::{Alloc, Environment, Header, Withdrawal};

/// Seal engine recorded in blockchain fixtures; filled blocks are never sealed
pub const SEAL_ENGINE: &str = "NoProof";

/// Kind of fixture, also the output subdirectory name
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureFormat {
    /// Single transaction against a pre-state
    StateTest,
    /// Sequence of blocks from a genesis
    BlockchainTest,
}

impl FixtureFormat {
    /// Canonical name
    pub fn as_str(self) -> &'static str {
        match self {
            FixtureFormat::StateTest => "state_test",
            FixtureFormat::BlockchainTest => "blockchain_test",
        }
    }
}

impl fmt::Display for FixtureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Network and chain the fixture was filled for
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureConfig {
    /// Fork or transition fork name
    pub network: String,
    /// Chain id
    #[serde(rename = "chainid", with = "serde_hex::quantity")]
    pub chain_id: u64,
}

/// Block context of a state fixture
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureEnv {
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
    /// Difficulty, zero after the merge
    #[serde(with = "serde_hex::u256")]
    pub current_difficulty: U256,
    /// Randomness after the merge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_random: Option<H256>,
    /// EIP-1559 base fee
    #[serde(default, with = "serde_hex::opt_quantity", skip_serializing_if = "Option::is_none")]
    pub current_base_fee: Option<u64>,
    /// EIP-4844 excess blob gas
    #[serde(default, with = "serde_hex::opt_quantity", skip_serializing_if = "Option::is_none")]
    pub current_excess_blob_gas: Option<u64>,
}

impl From<&Environment> for FixtureEnv {
    /// `env` must already be completed for its fork
    fn from(env: &Environment) -> Self {
        FixtureEnv {
            current_coinbase: env.coinbase,
            current_gas_limit: env.gas_limit,
            current_number: env.number,
            current_timestamp: env.timestamp,
            current_difficulty: env.difficulty.unwrap_or_default(),
            current_random: env.prev_randao,
            current_base_fee: env.base_fee_per_gas,
            current_excess_blob_gas: env.excess_blob_gas,
        }
    }
}

/// Selects one variant from each of the transaction's lists
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostIndexes {
    /// Index into `data`
    pub data: usize,
    /// Index into `gasLimit`
    pub gas: usize,
    /// Index into `value`
    pub value: usize,
}

/// Expected outcome of a state fixture under one fork
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePost {
    /// Post-state root
    pub hash: H256,
    /// Hash of the RLP log list
    pub logs: H256,
    /// Signed transaction envelope
    pub txbytes: Bytes,
    /// Variant selection
    pub indexes: PostIndexes,
    /// Full post-state
    pub state: Alloc,
    /// Declared failure, if the transaction must be rejected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_exception: Option<ExpectedException>,
}

/// One transaction against a pre-state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFixture {
    /// Block context
    pub env: FixtureEnv,
    /// Pre-state
    pub pre: Alloc,
    /// The transaction
    pub transaction: StateTransaction,
    /// Outcome keyed by fork name
    pub post: BTreeMap<String, Vec<StatePost>>,
    /// Network
    pub config: FixtureConfig,
}

/// Decoded contents of a block
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureBlockBody {
    /// Header
    pub block_header: Header,
    /// Transactions in order
    pub transactions: Vec<FixtureTransaction>,
    /// Always empty
    pub uncle_headers: Vec<Header>,
    /// EIP-4895 withdrawals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals: Option<Vec<Withdrawal>>,
}

/// A block clients must import
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidBlock {
    /// Header
    pub block_header: Header,
    /// Transactions in order
    pub transactions: Vec<FixtureTransaction>,
    /// Always empty
    pub uncle_headers: Vec<Header>,
    /// EIP-4895 withdrawals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals: Option<Vec<Withdrawal>>,
    /// Block RLP
    pub rlp: Bytes,
    /// Decimal block number
    pub blocknumber: String,
}

/// A block clients must reject
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidBlock {
    /// Block RLP
    pub rlp: Bytes,
    /// Declared failure
    pub expect_exception: ExpectedException,
    /// What the RLP decodes to
    #[serde(rename = "rlp_decoded", default, skip_serializing_if = "Option::is_none")]
    pub rlp_decoded: Option<FixtureBlockBody>,
}

/// Entry of a blockchain fixture's `blocks` list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FixtureBlock {
    /// Must be rejected; tried first since only it carries `expectException`
    Invalid(InvalidBlock),
    /// Must be imported
    Valid(Box<ValidBlock>),
}

impl FixtureBlock {
    /// Whether clients must reject this block
    pub fn is_invalid(&self) -> bool {
        matches!(self, FixtureBlock::Invalid(_))
    }
}

/// A chain of blocks from a genesis
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockchainFixture {
    /// Fork or transition fork name
    pub network: String,
    /// Genesis header
    pub genesis_block_header: Header,
    /// Genesis block RLP
    #[serde(rename = "genesisRLP")]
    pub genesis_rlp: Bytes,
    /// Pre-state
    pub pre: Alloc,
    /// State after the last valid block
    pub post_state: Alloc,
    /// Hash of the last valid block
    pub lastblockhash: H256,
    /// Blocks in import order
    pub blocks: Vec<FixtureBlock>,
    /// Always [`SEAL_ENGINE`]
    pub seal_engine: String,
    /// Network
    pub config: FixtureConfig,
}

/// Any fixture
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fixture {
    /// State test
    State(Box<StateFixture>),
    /// Blockchain test
    Blockchain(Box<BlockchainFixture>),
}

impl Fixture {
    /// Format of this fixture
    pub fn format(&self) -> FixtureFormat {
        match self {
            Fixture::State(_) => FixtureFormat::StateTest,
            Fixture::Blockchain(_) => FixtureFormat::BlockchainTest,
        }
    }
}

impl From<StateFixture> for Fixture {
    fn from(fixture: StateFixture) -> Self {
        Fixture::State(Box::new(fixture))
    }
}

impl From<BlockchainFixture> for Fixture {
    fn from(fixture: BlockchainFixture) -> Self {
        Fixture::Blockchain(Box::new(fixture))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_exceptions::BlockException;
    use tessera_forks::Fork;

    #[test]
    fn test_env_fields_follow_fork() {
        let env = Environment::default().for_fork(Fork::Cancun).unwrap();
        let json = serde_json::to_value(FixtureEnv::from(&env)).unwrap();
        assert_eq!(json["currentDifficulty"], "0x0");
        assert_eq!(json["currentBaseFee"], "0x7");
        assert!(json.get("currentRandom").is_some());

        let env = Environment::default().for_fork(Fork::Berlin).unwrap();
        let json = serde_json::to_value(FixtureEnv::from(&env)).unwrap();
        assert_eq!(json["currentDifficulty"], "0x20000");
        assert!(json.get("currentBaseFee").is_none());
        assert!(json.get("currentRandom").is_none());
    }

    #[test]
    fn test_invalid_block_round_trip() {
        let block = FixtureBlock::Invalid(InvalidBlock {
            rlp: Bytes::from(vec![0xc0]),
            expect_exception: BlockException::IncorrectBlockFormat.into(),
            rlp_decoded: None,
        });
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(
            json["expectException"],
            "BlockException.INCORRECT_BLOCK_FORMAT"
        );
        let back: FixtureBlock = serde_json::from_value(json).unwrap();
        assert!(back.is_invalid());
    }

    #[test]
    fn test_config_naming() {
        let config = FixtureConfig {
            network: "Cancun".to_string(),
            chain_id: 1,
        };
        assert_eq!(
            serde_json::to_string(&config).unwrap(),
            r#"{"network":"Cancun","chainid":"0x1"}"#
        );
    }
}
