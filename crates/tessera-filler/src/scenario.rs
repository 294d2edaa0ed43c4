//! Scenarios of either level, and what a fill leaves behind for reporting

use crate::blockchain::{BlockchainTest, VerifiedBlock, VerifiedChain};
use crate::error::FillResult;
use crate::state::{StateTest, VerifiedState};
use std::collections::BTreeSet;
use tessera_exceptions::Exception;
use tessera_fixtures::{Fixture, FixtureFormat, WrittenFixture};
use tessera_forks::{ForkSpec, TxType};
use tessera_t8n::TransitionTool;

/// A scenario at state level or chain level
#[derive(Clone, Debug)]
pub enum Scenario {
    /// One transaction
    State(Box<StateTest>),
    /// A chain of blocks
    Blockchain(Box<BlockchainTest>),
}

impl Scenario {
    /// Fixture format the scenario fills into
    pub fn format(&self) -> FixtureFormat {
        match self {
            Scenario::State(_) => FixtureFormat::StateTest,
            Scenario::Blockchain(_) => FixtureFormat::BlockchainTest,
        }
    }

    /// Chain id the transactions are signed for
    pub fn chain_id(&self) -> FillResult<u64> {
        match self {
            Scenario::State(test) => Ok(test.chain_id()),
            Scenario::Blockchain(test) => test.chain_id(),
        }
    }

    /// Fill under `fork`
    pub async fn fill(
        &self,
        fork: &ForkSpec,
        tool: &dyn TransitionTool,
    ) -> FillResult<VerifiedScenario> {
        match self {
            Scenario::State(test) => Ok(VerifiedScenario::State(Box::new(
                test.fill(fork, tool).await?,
            ))),
            Scenario::Blockchain(test) => Ok(VerifiedScenario::Blockchain(Box::new(
                test.fill(fork, tool).await?,
            ))),
        }
    }
}

impl From<StateTest> for Scenario {
    fn from(test: StateTest) -> Self {
        Scenario::State(Box::new(test))
    }
}

impl From<BlockchainTest> for Scenario {
    fn from(test: BlockchainTest) -> Self {
        Scenario::Blockchain(Box::new(test))
    }
}

/// A filled scenario
#[derive(Clone, Debug)]
pub enum VerifiedScenario {
    /// State level
    State(Box<VerifiedState>),
    /// Chain level
    Blockchain(Box<VerifiedChain>),
}

impl VerifiedScenario {
    /// Fixture form
    pub fn to_fixture(&self) -> Fixture {
        match self {
            VerifiedScenario::State(state) => state.to_fixture().into(),
            VerifiedScenario::Blockchain(chain) => chain.to_fixture().into(),
        }
    }

    /// Fork or transition name
    pub fn network(&self) -> String {
        match self {
            VerifiedScenario::State(state) => state.fork.name().to_string(),
            VerifiedScenario::Blockchain(chain) => chain.network.clone(),
        }
    }

    /// Read-only summary of what the scenario exercised
    pub fn record(&self, written: &WrittenFixture) -> ScenarioRecord {
        let mut tx_types = BTreeSet::new();
        let mut exceptions = BTreeSet::new();
        let (format, blocks) = match self {
            VerifiedScenario::State(state) => {
                tx_types.insert(state.tx.tx.tx_type);
                if let Some(expected) = state.tx.expected_error() {
                    exceptions.extend(expected.members().iter().copied());
                }
                (FixtureFormat::StateTest, 1)
            }
            VerifiedScenario::Blockchain(chain) => {
                for block in &chain.blocks {
                    for tx in block.txs() {
                        tx_types.insert(tx.tx.tx_type);
                        if let Some(expected) = tx.expected_error() {
                            exceptions.extend(expected.members().iter().copied());
                        }
                    }
                    if let VerifiedBlock::Invalid { exception, .. } = block {
                        exceptions.extend(exception.members().iter().copied());
                    }
                }
                (FixtureFormat::BlockchainTest, chain.blocks.len())
            }
        };
        ScenarioRecord {
            id: written.id.clone(),
            network: self.network(),
            format,
            tx_types,
            exceptions,
            blocks,
            hash: written.hash.clone(),
        }
    }
}

/// What one filled fixture covers, handed to reporting at the end of a run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScenarioRecord {
    /// Scenario id
    pub id: String,
    /// Fork or transition name
    pub network: String,
    /// Fixture format
    pub format: FixtureFormat,
    /// Transaction types used
    pub tx_types: BTreeSet<TxType>,
    /// Failure kinds declared and observed
    pub exceptions: BTreeSet<Exception>,
    /// Blocks in the fixture
    pub blocks: usize,
    /// Integrity hash of the written fixture
    pub hash: String,
}
