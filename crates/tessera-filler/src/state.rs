//! State tests: one transaction against a pre-state

use crate::error::FillResult;
use crate::validate::validate_transaction;
use crate::verify::{check_engine_root, check_local, check_post_state, check_rejection};
use std::collections::BTreeMap;
use tessera_exceptions::Exception;
use tessera_fixtures::{
    FixtureConfig, FixtureEnv, PostIndexes, StateFixture, StatePost, StateTransaction,
};
use tessera_forks::{Fork, ForkSpec};
use tessera_primitives::H256;
use tessera_t8n::{TransitionRequest, TransitionTool};
use tessera_types::{Alloc, Environment, ExpectedAlloc, Receipt, SignedTransaction};
use tracing::{debug, info};

/// A single transaction executed in one block on top of `pre`
#[derive(Clone, Debug)]
pub struct StateTest {
    /// Block context; fork-dependent fields are filled in per fork
    pub env: Environment,
    /// Pre-state
    pub pre: Alloc,
    /// The transaction, possibly declaring an expected failure
    pub tx: SignedTransaction,
    /// Partial expected post-state
    pub post: ExpectedAlloc,
}

impl StateTest {
    /// Scenario with the default environment
    pub fn new(pre: Alloc, tx: SignedTransaction, post: ExpectedAlloc) -> Self {
        StateTest {
            env: Environment::default(),
            pre,
            tx,
            post,
        }
    }

    /// Replace the environment
    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Chain id the transaction is signed for
    pub fn chain_id(&self) -> u64 {
        self.tx.tx.chain_id
    }

    /// Run the transaction through `tool` under the fork in effect at the
    /// environment's position and verify the outcome.
    pub async fn fill(
        &self,
        fork: &ForkSpec,
        tool: &dyn TransitionTool,
    ) -> FillResult<VerifiedState> {
        let resolved = fork.resolve(self.env.number, self.env.timestamp);
        let env = self.env.clone().for_fork(resolved)?;
        let declared = self.tx.expected_error();
        info!(fork = %resolved, tx_type = ?self.tx.tx.tx_type, engine = tool.name(), "filling state test");

        let at = "tx 0";
        let detected = validate_transaction(
            &self.tx,
            resolved,
            &env,
            self.pre.get(&self.tx.sender),
        );
        check_local(at, detected.map(Exception::from), declared)?;

        let request = TransitionRequest::new(
            self.pre.clone(),
            &env,
            std::slice::from_ref(&self.tx),
            resolved,
            self.chain_id(),
        )
        .with_reward(resolved.block_reward());
        let response = tool.evaluate(&request).await?;
        check_engine_root(at, &response)?;

        let rejection = response.result.rejection(0);
        let matched = check_rejection(tool.exception_map(), at, declared, rejection)?;
        check_post_state(&self.post, &response.alloc)?;
        debug!(root = %response.result.state_root, "state test verified");

        Ok(VerifiedState {
            fork: resolved,
            env,
            pre: self.pre.clone(),
            tx: self.tx.clone(),
            post: response.alloc,
            state_root: response.result.state_root,
            logs_hash: response.result.logs_hash,
            receipts: response.result.receipts,
            exception: matched,
            traces: response.traces,
        })
    }
}

/// A state test whose outcome matched its declaration
#[derive(Clone, Debug)]
pub struct VerifiedState {
    /// Fork the transaction ran under
    pub fork: Fork,
    /// Completed environment
    pub env: Environment,
    /// Pre-state
    pub pre: Alloc,
    /// The transaction
    pub tx: SignedTransaction,
    /// Engine post-state
    pub post: Alloc,
    /// Post-state root
    pub state_root: H256,
    /// Hash of the logs
    pub logs_hash: H256,
    /// Receipts of included transactions
    pub receipts: Vec<Receipt>,
    /// Kind the rejection matched, if the transaction was declared invalid
    pub exception: Option<Exception>,
    /// Engine traces, when collected
    pub traces: Option<Vec<Vec<serde_json::Value>>>,
}

impl VerifiedState {
    /// Fixture form
    pub fn to_fixture(&self) -> StateFixture {
        let mut post = BTreeMap::new();
        post.insert(
            self.fork.name().to_string(),
            vec![StatePost {
                hash: self.state_root,
                logs: self.logs_hash,
                txbytes: self.tx.encoded.clone(),
                indexes: PostIndexes::default(),
                state: self.post.clone(),
                expect_exception: self.tx.expected_error().cloned(),
            }],
        );
        StateFixture {
            env: FixtureEnv::from(&self.env),
            pre: self.pre.clone(),
            transaction: StateTransaction::from(&self.tx),
            post,
            config: FixtureConfig {
                network: self.fork.name().to_string(),
                chain_id: self.tx.tx.chain_id,
            },
        }
    }
}
