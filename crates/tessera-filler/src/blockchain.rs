//! Blockchain tests: a chain of blocks built on one genesis
//!
//! Every block is resolved against the fork in effect at its own number
//! and timestamp, so a chain that crosses a transition is checked against
//! the rules of each side.

use crate::error::{FillResult, HarnessDefect, VerificationFailure};
use crate::validate::{
    expected_base_fee, expected_excess_blob_gas, expected_gas_limit, validate_against_execution,
    validate_header, validate_transaction,
};
use crate::verify::{check_engine_root, check_local, check_post_state, check_rejection};
use std::collections::BTreeMap;
use tessera_crypto::sha256;
use tessera_exceptions::{Exception, ExpectedException};
use tessera_fixtures::{
    BlockchainFixture, FixtureBlock, FixtureBlockBody, FixtureConfig, FixtureTransaction,
    InvalidBlock, ValidBlock, SEAL_ENGINE,
};
use tessera_forks::{Fork, ForkSpec, HeaderField};
use tessera_primitives::{Address, Bytes, H256};
use tessera_t8n::{TransitionRequest, TransitionTool};
use tessera_types::{
    block_rlp, transactions_root, withdrawals_root, Account, Alloc, Environment, ExpectedAlloc,
    Header, HeaderModifier, Receipt, SignedTransaction, Withdrawal, DEFAULT_COINBASE,
    EMPTY_OMMERS_HASH,
};
use tracing::{debug, info};

/// Seconds between blocks when a block does not set its timestamp
pub const DEFAULT_BLOCK_TIME: u64 = 12;

/// Chain id used when no transaction names one
pub const DEFAULT_CHAIN_ID: u64 = 1;

/// EIP-7685 commitment to a block's execution requests
pub fn requests_hash(requests: &[Bytes]) -> H256 {
    let mut preimage = Vec::with_capacity(requests.len() * 32);
    for request in requests.iter().filter(|r| r.len() > 1) {
        preimage.extend_from_slice(sha256(request).as_bytes());
    }
    sha256(&preimage)
}

/// One block of a chain scenario. Unset fields are derived from the parent.
#[derive(Clone, Debug, Default)]
pub struct Block {
    /// Transactions in order
    pub txs: Vec<SignedTransaction>,
    /// EIP-4895 withdrawals
    pub withdrawals: Option<Vec<Withdrawal>>,
    /// Timestamp, parent's plus [`DEFAULT_BLOCK_TIME`] if unset
    pub timestamp: Option<u64>,
    /// Fee recipient
    pub coinbase: Option<Address>,
    /// Gas limit, parent's if unset
    pub gas_limit: Option<u64>,
    /// EIP-4788 parent beacon block root
    pub parent_beacon_block_root: Option<H256>,
    /// Header extra data
    pub extra_data: Option<Bytes>,
    /// Failure the block as a whole must be rejected with
    pub exception: Option<ExpectedException>,
    /// Edits applied to the header after it is built
    pub header_modifier: HeaderModifier,
}

impl Block {
    /// Empty block
    pub fn new() -> Self {
        Self::default()
    }

    /// Block carrying `txs`
    pub fn with_txs(txs: Vec<SignedTransaction>) -> Self {
        Block {
            txs,
            ..Self::default()
        }
    }

    /// Append a transaction
    pub fn tx(mut self, tx: SignedTransaction) -> Self {
        self.txs.push(tx);
        self
    }

    /// Set the withdrawals
    pub fn withdrawals(mut self, withdrawals: Vec<Withdrawal>) -> Self {
        self.withdrawals = Some(withdrawals);
        self
    }

    /// Set the timestamp
    pub fn timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Set the fee recipient
    pub fn coinbase(mut self, coinbase: Address) -> Self {
        self.coinbase = Some(coinbase);
        self
    }

    /// Set the gas limit
    pub fn gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// Set the parent beacon block root
    pub fn parent_beacon_block_root(mut self, root: H256) -> Self {
        self.parent_beacon_block_root = Some(root);
        self
    }

    /// Set the extra data
    pub fn extra_data(mut self, data: impl Into<Bytes>) -> Self {
        self.extra_data = Some(data.into());
        self
    }

    /// Declare that the block must be rejected
    pub fn expect_exception(mut self, exception: impl Into<ExpectedException>) -> Self {
        self.exception = Some(exception.into());
        self
    }

    /// Edit the header after it is built
    pub fn modify_header(mut self, modifier: HeaderModifier) -> Self {
        self.header_modifier = modifier;
        self
    }

    /// What clients must reject the block with: the block's own
    /// declaration, else that of its first transaction declaring one
    pub fn expected_exception(&self) -> Option<&ExpectedException> {
        self.exception
            .as_ref()
            .or_else(|| self.txs.iter().find_map(SignedTransaction::expected_error))
    }
}

/// A chain of blocks on top of a genesis holding `pre`
#[derive(Clone, Debug)]
pub struct BlockchainTest {
    /// Genesis block context
    pub genesis_env: Environment,
    /// Genesis state; system contracts are added when filling
    pub pre: Alloc,
    /// Blocks in import order
    pub blocks: Vec<Block>,
    /// Partial expected state after the last valid block
    pub post: ExpectedAlloc,
}

/// Block number 0 at timestamp 0
fn genesis_env() -> Environment {
    Environment {
        number: 0,
        timestamp: 0,
        ..Environment::default()
    }
}

/// Where a chain stands after its last valid block
struct Head {
    state: Alloc,
    header: Header,
    block_hashes: BTreeMap<u64, H256>,
}

impl BlockchainTest {
    /// Scenario on the default genesis
    pub fn new(pre: Alloc, blocks: Vec<Block>, post: ExpectedAlloc) -> Self {
        BlockchainTest {
            genesis_env: genesis_env(),
            pre,
            blocks,
            post,
        }
    }

    /// Replace the genesis environment
    pub fn with_genesis_env(mut self, env: Environment) -> Self {
        self.genesis_env = env;
        self
    }

    /// Chain id shared by every transaction
    pub fn chain_id(&self) -> FillResult<u64> {
        let mut ids = self.blocks.iter().flat_map(|b| &b.txs).map(|tx| tx.tx.chain_id);
        let Some(first) = ids.next() else {
            return Ok(DEFAULT_CHAIN_ID);
        };
        if ids.any(|id| id != first) {
            return Err(HarnessDefect::MalformedScenario(
                "transactions are signed for different chains".to_string(),
            )
            .into());
        }
        Ok(first)
    }

    /// Genesis state with the system contracts every reachable fork needs
    fn genesis_alloc(&self, fork: &ForkSpec) -> Alloc {
        let mut alloc = self.pre.clone();
        for contract in fork.genesis_system_contracts() {
            if !alloc.contains(&contract.address) {
                alloc.insert(
                    contract.address,
                    Account {
                        nonce: contract.nonce,
                        code: Bytes::from(contract.code.to_vec()),
                        ..Account::default()
                    },
                );
            }
        }
        alloc
    }

    /// Build every block through `tool` and verify each outcome and the
    /// final state.
    pub async fn fill(
        &self,
        fork: &ForkSpec,
        tool: &dyn TransitionTool,
    ) -> FillResult<VerifiedChain> {
        if self.genesis_env.number != 0 {
            return Err(HarnessDefect::MalformedScenario(format!(
                "genesis must be block 0, got {}",
                self.genesis_env.number
            ))
            .into());
        }
        let chain_id = self.chain_id()?;
        let genesis_fork = fork.resolve(0, self.genesis_env.timestamp);
        let genesis_env = self.genesis_env.clone().for_fork(genesis_fork)?;
        let pre = self.genesis_alloc(fork);
        let genesis = genesis_header(&genesis_env, genesis_fork, pre.state_root());
        let genesis_rlp = block_rlp(&genesis, &[], genesis_env.withdrawals.as_deref());
        info!(
            network = %fork.name(),
            blocks = self.blocks.len(),
            engine = tool.name(),
            genesis = %genesis.hash(),
            "filling blockchain test"
        );

        let mut head = Head {
            state: pre.clone(),
            block_hashes: BTreeMap::from([(0, genesis.hash())]),
            header: genesis.clone(),
        };
        let mut blocks = Vec::with_capacity(self.blocks.len());
        for block in &self.blocks {
            let verified = fill_block(block, fork, tool, chain_id, &mut head).await?;
            blocks.push(verified);
        }
        check_post_state(&self.post, &head.state)?;

        Ok(VerifiedChain {
            network: fork.name(),
            chain_id,
            genesis,
            genesis_rlp,
            pre,
            blocks,
            last_block_hash: head.header.hash(),
            post_state: head.state,
        })
    }
}

fn genesis_header(env: &Environment, fork: Fork, state_root: H256) -> Header {
    let fields = fork.header_fields();
    Header {
        coinbase: env.coinbase,
        state_root,
        difficulty: env.difficulty.unwrap_or_default(),
        number: env.number,
        gas_limit: env.gas_limit,
        timestamp: env.timestamp,
        extra_data: env.extra_data.clone(),
        mix_hash: env.prev_randao.unwrap_or(H256::ZERO),
        base_fee_per_gas: env.base_fee_per_gas,
        withdrawals_root: env.withdrawals.as_deref().map(withdrawals_root),
        blob_gas_used: fields.contains(&HeaderField::BlobGasUsed).then_some(0),
        excess_blob_gas: env.excess_blob_gas,
        parent_beacon_block_root: env.parent_beacon_block_root,
        requests_hash: fields
            .contains(&HeaderField::RequestsHash)
            .then(|| requests_hash(&[])),
        ..Header::default()
    }
}

/// Environment of the child of `parent`, derived under `fork`
fn block_env(
    block: &Block,
    fork: Fork,
    number: u64,
    timestamp: u64,
    head: &Head,
) -> FillResult<Environment> {
    let env = Environment {
        coinbase: block.coinbase.unwrap_or(DEFAULT_COINBASE),
        gas_limit: block
            .gas_limit
            .unwrap_or_else(|| expected_gas_limit(fork, &head.header)),
        number,
        timestamp,
        difficulty: None,
        prev_randao: None,
        base_fee_per_gas: expected_base_fee(fork, &head.header),
        excess_blob_gas: expected_excess_blob_gas(fork, &head.header),
        parent_beacon_block_root: block.parent_beacon_block_root,
        withdrawals: block.withdrawals.clone(),
        block_hashes: head.block_hashes.clone(),
        extra_data: block.extra_data.clone().unwrap_or_default(),
    };
    Ok(env.for_fork(fork)?)
}

/// Nonces the block's transactions will consume if they are included
fn advance_view(view: &mut Alloc, tx: &SignedTransaction) {
    let sender = view.entry(tx.sender);
    sender.nonce = sender.nonce.saturating_add(1);
    for auth in &tx.tx.authorization_list {
        let authority = view.entry(auth.signer);
        if authority.nonce == auth.nonce {
            authority.nonce = authority.nonce.saturating_add(1);
        }
    }
}

async fn fill_block(
    block: &Block,
    spec: &ForkSpec,
    tool: &dyn TransitionTool,
    chain_id: u64,
    head: &mut Head,
) -> FillResult<VerifiedBlock> {
    let number = head.header.number + 1;
    let timestamp = block
        .timestamp
        .unwrap_or(head.header.timestamp + DEFAULT_BLOCK_TIME);
    let fork = spec.resolve(number, timestamp);
    let at = format!("block {number}");
    let env = block_env(block, fork, number, timestamp, head)?;
    debug!(%number, %fork, txs = block.txs.len(), "building block");

    let mut view = head.state.clone();
    for (index, tx) in block.txs.iter().enumerate() {
        let tx_at = format!("{at} tx {index}");
        let detected = validate_transaction(tx, fork, &env, view.get(&tx.sender));
        let local = check_local(&tx_at, detected.map(Exception::from), tx.expected_error())?;
        if local.is_none() && tx.expected_error().is_none() {
            advance_view(&mut view, tx);
        }
    }

    let request = TransitionRequest::new(head.state.clone(), &env, &block.txs, fork, chain_id)
        .with_reward(fork.block_reward());
    let response = tool.evaluate(&request).await?;
    check_engine_root(&at, &response)?;

    let mut tx_failure: Option<(Exception, ExpectedException)> = None;
    for (index, tx) in block.txs.iter().enumerate() {
        let tx_at = format!("{at} tx {index}");
        let matched = check_rejection(
            tool.exception_map(),
            &tx_at,
            tx.expected_error(),
            response.result.rejection(index),
        )?;
        if tx_failure.is_none() {
            if let (Some(kind), Some(declared)) = (matched, tx.expected_error()) {
                tx_failure = Some((kind, declared.clone()));
            }
        }
    }

    let result = &response.result;
    let fields = fork.header_fields();
    let computed = Header {
        parent_hash: head.header.hash(),
        ommers_hash: EMPTY_OMMERS_HASH,
        coinbase: env.coinbase,
        state_root: result.state_root,
        transactions_root: transactions_root(&block.txs),
        receipts_root: result.receipts_root,
        logs_bloom: result.logs_bloom,
        difficulty: env.difficulty.unwrap_or_default(),
        number,
        gas_limit: env.gas_limit,
        gas_used: result.gas_used,
        timestamp,
        extra_data: env.extra_data.clone(),
        mix_hash: env.prev_randao.unwrap_or(H256::ZERO),
        nonce: 0,
        base_fee_per_gas: env.base_fee_per_gas,
        withdrawals_root: env.withdrawals.as_deref().map(withdrawals_root),
        blob_gas_used: fields
            .contains(&HeaderField::BlobGasUsed)
            .then(|| result.blob_gas_used.unwrap_or(0)),
        excess_blob_gas: env.excess_blob_gas,
        parent_beacon_block_root: env.parent_beacon_block_root,
        requests_hash: fields.contains(&HeaderField::RequestsHash).then(|| {
            result
                .requests_hash
                .unwrap_or_else(|| requests_hash(result.requests.as_deref().unwrap_or(&[])))
        }),
    };
    let mut header = computed.clone();
    block.header_modifier.apply(&mut header);
    let block_failure = validate_header(&header, fork, Some(&head.header))
        .or_else(|| validate_against_execution(&header, &computed))
        .map(Exception::from);

    let rejected_with = match &block.exception {
        Some(expected) => {
            let observed = [tx_failure.as_ref().map(|(k, _)| *k), block_failure];
            if observed.iter().flatten().any(|k| expected.contains(k)) {
                Some(expected.clone())
            } else if let Some(got) = observed.into_iter().flatten().next() {
                return Err(VerificationFailure::WrongException {
                    at,
                    expected: expected.clone(),
                    got,
                }
                .into());
            } else {
                return Err(VerificationFailure::ExpectedExceptionButAccepted {
                    at,
                    expected: expected.clone(),
                }
                .into());
            }
        }
        None => {
            if let Some(kind) = block_failure {
                return Err(HarnessDefect::UndeclaredLocalFailure { at, kind }.into());
            }
            tx_failure.map(|(_, declared)| declared)
        }
    };

    let withdrawals = env.withdrawals.clone();
    let rlp = block_rlp(&header, &block.txs, withdrawals.as_deref());

    if let Some(exception) = rejected_with {
        info!(%number, %fork, exception = %exception, "invalid block recorded");
        return Ok(VerifiedBlock::Invalid {
            fork,
            header,
            txs: block.txs.clone(),
            withdrawals,
            rlp,
            exception,
        });
    }

    let expected_parent = head.header.hash();
    if header.parent_hash != expected_parent {
        return Err(VerificationFailure::BrokenLinkage {
            number,
            expected: expected_parent,
            actual: header.parent_hash,
        }
        .into());
    }
    let post_root = response.alloc.state_root();
    if header.state_root != post_root {
        return Err(VerificationFailure::StateRootMismatch {
            number,
            header: header.state_root,
            computed: post_root,
        }
        .into());
    }

    let hash = header.hash();
    debug!(%number, %hash, gas_used = header.gas_used, "block accepted");
    head.block_hashes.insert(number, hash);
    head.header = header.clone();
    head.state = response.alloc;
    Ok(VerifiedBlock::Valid {
        fork,
        header,
        txs: block.txs.clone(),
        withdrawals,
        rlp,
        receipts: response.result.receipts,
    })
}

/// One verified block
#[derive(Clone, Debug)]
pub enum VerifiedBlock {
    /// Imported; advanced the chain
    Valid {
        /// Fork the block was built under
        fork: Fork,
        /// Header
        header: Header,
        /// Transactions
        txs: Vec<SignedTransaction>,
        /// Withdrawals
        withdrawals: Option<Vec<Withdrawal>>,
        /// Block RLP
        rlp: Bytes,
        /// Engine receipts
        receipts: Vec<Receipt>,
    },
    /// Rejected as declared; the chain stays on its parent
    Invalid {
        /// Fork the block was built under
        fork: Fork,
        /// Header, after modification
        header: Header,
        /// Transactions
        txs: Vec<SignedTransaction>,
        /// Withdrawals
        withdrawals: Option<Vec<Withdrawal>>,
        /// Block RLP
        rlp: Bytes,
        /// Declared failure clients must report
        exception: ExpectedException,
    },
}

impl VerifiedBlock {
    /// Fork the block was built under
    pub fn fork(&self) -> Fork {
        match self {
            VerifiedBlock::Valid { fork, .. } | VerifiedBlock::Invalid { fork, .. } => *fork,
        }
    }

    /// Header
    pub fn header(&self) -> &Header {
        match self {
            VerifiedBlock::Valid { header, .. } | VerifiedBlock::Invalid { header, .. } => header,
        }
    }

    /// Transactions
    pub fn txs(&self) -> &[SignedTransaction] {
        match self {
            VerifiedBlock::Valid { txs, .. } | VerifiedBlock::Invalid { txs, .. } => txs,
        }
    }

    /// True if clients must reject the block
    pub fn is_invalid(&self) -> bool {
        matches!(self, VerifiedBlock::Invalid { .. })
    }

    fn to_fixture(&self) -> FixtureBlock {
        match self {
            VerifiedBlock::Valid {
                header,
                txs,
                withdrawals,
                rlp,
                ..
            } => FixtureBlock::Valid(Box::new(ValidBlock {
                block_header: header.clone(),
                transactions: txs.iter().map(FixtureTransaction::from).collect(),
                uncle_headers: Vec::new(),
                withdrawals: withdrawals.clone(),
                rlp: rlp.clone(),
                blocknumber: header.number.to_string(),
            })),
            VerifiedBlock::Invalid {
                header,
                txs,
                withdrawals,
                rlp,
                exception,
                ..
            } => FixtureBlock::Invalid(InvalidBlock {
                rlp: rlp.clone(),
                expect_exception: exception.clone(),
                rlp_decoded: Some(FixtureBlockBody {
                    block_header: header.clone(),
                    transactions: txs.iter().map(FixtureTransaction::from).collect(),
                    uncle_headers: Vec::new(),
                    withdrawals: withdrawals.clone(),
                }),
            }),
        }
    }
}

/// A blockchain test whose every block matched its declaration
#[derive(Clone, Debug)]
pub struct VerifiedChain {
    /// Fork or transition name
    pub network: String,
    /// Chain id
    pub chain_id: u64,
    /// Genesis header
    pub genesis: Header,
    /// Genesis block RLP
    pub genesis_rlp: Bytes,
    /// Genesis state including system contracts
    pub pre: Alloc,
    /// Blocks in import order
    pub blocks: Vec<VerifiedBlock>,
    /// Hash of the last valid block
    pub last_block_hash: H256,
    /// State after the last valid block
    pub post_state: Alloc,
}

impl VerifiedChain {
    /// Fixture form
    pub fn to_fixture(&self) -> BlockchainFixture {
        BlockchainFixture {
            network: self.network.clone(),
            genesis_block_header: self.genesis.clone(),
            genesis_rlp: self.genesis_rlp.clone(),
            pre: self.pre.clone(),
            post_state: self.post_state.clone(),
            lastblockhash: self.last_block_hash,
            blocks: self.blocks.iter().map(VerifiedBlock::to_fixture).collect(),
            seal_engine: SEAL_ENGINE.to_string(),
            config: FixtureConfig {
                network: self.network.clone(),
                chain_id: self.chain_id,
            },
        }
    }
}
