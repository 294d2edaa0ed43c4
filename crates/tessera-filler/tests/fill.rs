//! End-to-end filling through the in-process engine.

mod common;

use common::mini_engine;
use tessera_exceptions::{BlockException, TransactionException};
use tessera_filler::{
    Block, BlockchainTest, FillError, StateTest, VerificationFailure, VerifiedBlock,
};
use tessera_fixtures::{verify_file, Fixture, FixtureWriter, Provenance};
use tessera_forks::{Activation, Fork, ForkSpec, HeaderField, TransitionFork, BEACON_ROOTS_ADDRESS};
use tessera_primitives::{Address, U256};
use tessera_types::{ExpectedAccount, ExpectedAlloc, HeaderModifier, PreAlloc, Storage, TxBuilder};

// PUSH1 1, PUSH1 2, ADD, PUSH1 0, SSTORE, STOP
const ADD_AND_STORE: [u8; 9] = [0x60, 0x01, 0x60, 0x02, 0x01, 0x60, 0x00, 0x55, 0x00];

fn add_and_store() -> (StateTest, Address) {
    let mut pre = PreAlloc::new();
    let mut sender = pre.fund_eoa(None).unwrap();
    let contract = pre.deploy_contract(ADD_AND_STORE.to_vec(), None, None).unwrap();
    let tx = TxBuilder::new()
        .to(contract)
        .gas_limit(100_000)
        .build(&mut sender, 1)
        .unwrap();
    let mut post = ExpectedAlloc::new();
    post.insert(
        contract,
        ExpectedAccount::exists().storage([(0u64, 3u64)].into_iter().collect::<Storage>()),
    );
    (StateTest::new(pre.into_alloc(), tx, post), contract)
}

#[tokio::test]
async fn test_state_test_stores_sum() {
    let tool = mini_engine();
    let (test, contract) = add_and_store();
    let verified = test.fill(&Fork::Cancun.into(), tool.as_ref()).await.unwrap();

    assert_eq!(verified.fork, Fork::Cancun);
    assert_eq!(verified.exception, None);
    assert_eq!(
        verified.post.get(&contract).unwrap().storage.get(&U256::zero()),
        U256::from(3u64)
    );
    assert_eq!(verified.state_root, verified.post.state_root());

    let fixture = verified.to_fixture();
    let post = &fixture.post["Cancun"];
    assert_eq!(post.len(), 1);
    assert_eq!(post[0].hash, verified.state_root);
    assert!(post[0].expect_exception.is_none());
    assert_eq!(fixture.config.chain_id, 1);
}

#[tokio::test]
async fn test_intrinsic_gas_too_low_is_recorded_as_declared() {
    let tool = mini_engine();
    let mut pre = PreAlloc::new();
    let mut sender = pre.fund_eoa(None).unwrap();
    let intrinsic = Fork::Cancun
        .intrinsic_gas(&TxBuilder::new().to(sender.address()).build_unsigned(0, 1).unwrap().intrinsic_gas_input())
        .regular;
    let tx = TxBuilder::new()
        .to(Address::from_low_u64(0x1234))
        .gas_limit(intrinsic - 1)
        .expect_error(TransactionException::IntrinsicGasTooLow)
        .build(&mut sender, 1)
        .unwrap();
    let test = StateTest::new(pre.into_alloc(), tx, ExpectedAlloc::new());

    let verified = test.fill(&Fork::Cancun.into(), tool.as_ref()).await.unwrap();
    assert_eq!(
        verified.exception,
        Some(TransactionException::IntrinsicGasTooLow.into())
    );
    // rejected: the pre-state is untouched
    assert_eq!(verified.post, verified.pre);

    let fixture = verified.to_fixture();
    assert_eq!(
        fixture.post["Cancun"][0].expect_exception,
        Some(TransactionException::IntrinsicGasTooLow.into())
    );
}

#[tokio::test]
async fn test_undeclared_local_failure_never_reaches_the_engine() {
    let tool = mini_engine();
    let mut pre = PreAlloc::new();
    let mut sender = pre.fund_eoa(None).unwrap();
    let tx = TxBuilder::new()
        .to(Address::from_low_u64(0x1234))
        .gas_limit(20_000)
        .build(&mut sender, 1)
        .unwrap();
    let test = StateTest::new(pre.into_alloc(), tx, ExpectedAlloc::new());

    let err = test.fill(&Fork::Cancun.into(), tool.as_ref()).await.unwrap_err();
    assert!(err.is_harness_defect());
    assert_eq!(tool.calls(), 0);
}

#[tokio::test]
async fn test_declared_failure_that_is_accepted_fails_verification() {
    let tool = mini_engine();
    let mut pre = PreAlloc::new();
    let mut sender = pre.fund_eoa(None).unwrap();
    let tx = TxBuilder::new()
        .to(Address::from_low_u64(0x1234))
        .expect_error(TransactionException::IntrinsicGasTooLow)
        .build(&mut sender, 1)
        .unwrap();
    let test = StateTest::new(pre.into_alloc(), tx, ExpectedAlloc::new());

    let err = test.fill(&Fork::Cancun.into(), tool.as_ref()).await.unwrap_err();
    assert!(matches!(
        err,
        FillError::Verification(VerificationFailure::ExpectedExceptionButAccepted { .. })
    ));
}

#[tokio::test]
async fn test_post_state_mismatch_fails_verification() {
    let tool = mini_engine();
    let (mut test, contract) = add_and_store();
    test.post.insert(
        contract,
        ExpectedAccount::exists().storage([(0u64, 4u64)].into_iter().collect::<Storage>()),
    );
    let err = test.fill(&Fork::Cancun.into(), tool.as_ref()).await.unwrap_err();
    match err {
        FillError::Verification(VerificationFailure::PostState(mismatches)) => {
            assert_eq!(mismatches.len(), 1);
            assert_eq!(mismatches[0].address, contract);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_transition_block_without_base_fee_is_recorded_invalid() {
    let tool = mini_engine();
    let fork: ForkSpec = TransitionFork::new(Fork::Berlin, Fork::London, Activation::Block(2))
        .unwrap()
        .into();
    let recipient = Address::from_low_u64(0x1234);

    let mut pre = PreAlloc::new();
    let mut sender = pre.fund_eoa(None).unwrap();
    let transfer = TxBuilder::new()
        .to(recipient)
        .value(1u64)
        .build(&mut sender, 1)
        .unwrap();
    let mut post = ExpectedAlloc::new();
    post.insert(recipient, ExpectedAccount::exists().balance(1u64));

    let test = BlockchainTest::new(
        pre.into_alloc(),
        vec![
            Block::with_txs(vec![transfer]),
            Block::new()
                .modify_header(HeaderModifier::new().remove(HeaderField::BaseFeePerGas))
                .expect_exception(BlockException::IncorrectBlockFormat),
        ],
        post,
    );
    let chain = test.fill(&fork, tool.as_ref()).await.unwrap();

    assert_eq!(chain.blocks.len(), 2);
    assert_eq!(chain.blocks[0].fork(), Fork::Berlin);
    assert!(!chain.blocks[0].is_invalid());
    assert_eq!(chain.blocks[1].fork(), Fork::London);
    assert!(chain.blocks[1].is_invalid());
    assert_eq!(chain.blocks[1].header().base_fee_per_gas, None);
    // the invalid block does not advance the chain
    assert_eq!(chain.last_block_hash, chain.blocks[0].header().hash());
    assert_eq!(chain.blocks[0].header().parent_hash, chain.genesis.hash());

    let requests = tool.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].fork, Fork::London);
    assert_eq!(requests[1].env.current_base_fee, Some(1_000_000_000));

    let fixture = chain.to_fixture();
    assert_eq!(fixture.network, fork.name());
    assert_eq!(fixture.lastblockhash, chain.last_block_hash);
    assert!(matches!(fixture.blocks[1], tessera_fixtures::FixtureBlock::Invalid(_)));
}

#[tokio::test]
async fn test_chain_carries_base_fee_and_system_contracts() {
    let tool = mini_engine();
    let mut pre = PreAlloc::new();
    let mut sender = pre.fund_eoa(None).unwrap();
    let recipient = Address::from_low_u64(0x1234);
    let first = TxBuilder::new().to(recipient).value(1u64).build(&mut sender, 1).unwrap();
    let second = TxBuilder::new().to(recipient).value(1u64).build(&mut sender, 1).unwrap();
    let mut post = ExpectedAlloc::new();
    post.insert(recipient, ExpectedAccount::exists().balance(2u64));
    post.insert(sender.address(), ExpectedAccount::exists().nonce(2));

    let test = BlockchainTest::new(
        pre.into_alloc(),
        vec![Block::with_txs(vec![first]), Block::with_txs(vec![second])],
        post,
    );
    let chain = test.fill(&Fork::Cancun.into(), tool.as_ref()).await.unwrap();

    assert!(chain.pre.contains(&BEACON_ROOTS_ADDRESS));
    let params = Fork::Cancun.base_fee_params().unwrap();
    let parent = chain.blocks[0].header();
    assert_eq!(
        chain.blocks[1].header().base_fee_per_gas,
        Some(params.next_base_fee(
            parent.gas_used,
            parent.gas_limit,
            parent.base_fee_per_gas.unwrap()
        ))
    );
    assert_eq!(chain.blocks[1].header().timestamp, 24);
    assert!(chain.blocks.iter().all(|b| matches!(b, VerifiedBlock::Valid { .. })));
}

#[tokio::test]
async fn test_chain_crosses_cancun_by_timestamp() {
    let tool = mini_engine();
    let fork: ForkSpec =
        TransitionFork::new(Fork::Shanghai, Fork::Cancun, Activation::Timestamp(15_000))
            .unwrap()
            .into();
    let recipient = Address::from_low_u64(0x1234);

    let mut pre = PreAlloc::new();
    let mut sender = pre.fund_eoa(None).unwrap();
    let transfer = TxBuilder::new()
        .to(recipient)
        .value(1u64)
        .build(&mut sender, 1)
        .unwrap();
    let mut post = ExpectedAlloc::new();
    post.insert(recipient, ExpectedAccount::exists().balance(1u64));

    let test = BlockchainTest::new(
        pre.into_alloc(),
        vec![
            Block::new().timestamp(14_999),
            Block::with_txs(vec![transfer]).timestamp(15_000),
            Block::new(),
        ],
        post,
    );
    let chain = test.fill(&fork, tool.as_ref()).await.unwrap();

    // deployed at genesis so the first Cancun block finds it
    assert!(chain.pre.contains(&BEACON_ROOTS_ADDRESS));
    assert_eq!(chain.genesis.excess_blob_gas, None);

    let forks: Vec<Fork> = chain.blocks.iter().map(VerifiedBlock::fork).collect();
    assert_eq!(forks, vec![Fork::Shanghai, Fork::Cancun, Fork::Cancun]);
    assert!(chain.blocks.iter().all(|b| !b.is_invalid()));

    let shanghai = chain.blocks[0].header();
    assert_eq!(shanghai.timestamp, 14_999);
    assert!(shanghai.withdrawals_root.is_some());
    assert_eq!(shanghai.blob_gas_used, None);
    assert_eq!(shanghai.excess_blob_gas, None);
    assert_eq!(shanghai.parent_beacon_block_root, None);

    // no blob fields in the parent: excess starts from zero
    let first_cancun = chain.blocks[1].header();
    assert_eq!(first_cancun.timestamp, 15_000);
    assert_eq!(first_cancun.blob_gas_used, Some(0));
    assert_eq!(first_cancun.excess_blob_gas, Some(0));
    assert_eq!(first_cancun.parent_beacon_block_root, Some(tessera_primitives::H256::ZERO));
    assert_eq!(first_cancun.parent_hash, shanghai.hash());

    let next = chain.blocks[2].header();
    assert_eq!(next.timestamp, 15_012);
    let expected = Fork::Cancun
        .blob_schedule()
        .unwrap()
        .excess_blob_gas(0, 0);
    assert_eq!(next.excess_blob_gas, Some(expected));

    let requests = tool.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].fork, Fork::Shanghai);
    assert_eq!(requests[0].env.current_excess_blob_gas, None);
    assert_eq!(requests[1].fork, Fork::Cancun);
    assert_eq!(requests[1].env.current_excess_blob_gas, Some(0));

    assert_eq!(chain.to_fixture().network, "ShanghaiToCancunAtTime15k");
}

#[tokio::test]
async fn test_wrong_block_exception_fails_verification() {
    let tool = mini_engine();
    let test = BlockchainTest::new(
        PreAlloc::new().into_alloc(),
        vec![Block::new()
            .modify_header(HeaderModifier::new().remove(HeaderField::BaseFeePerGas))
            .expect_exception(BlockException::InvalidStateRoot)],
        ExpectedAlloc::new(),
    );
    let err = test.fill(&Fork::Shanghai.into(), tool.as_ref()).await.unwrap_err();
    match err {
        FillError::Verification(VerificationFailure::WrongException { got, .. }) => {
            assert_eq!(got, BlockException::IncorrectBlockFormat.into())
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_refilling_reproduces_the_same_fixture() {
    let tool = mini_engine();
    let mut hashes = Vec::new();
    let mut documents = Vec::new();
    for _ in 0..2 {
        let dir = tempfile::tempdir().unwrap();
        let (test, _) = add_and_store();
        let verified = test.fill(&Fork::Cancun.into(), tool.as_ref()).await.unwrap();
        let written = FixtureWriter::new(dir.path())
            .write(
                "add_and_store",
                &Fixture::from(verified.to_fixture()),
                &Provenance::new(tessera_t8n::TransitionTool::name(tool.as_ref())),
            )
            .unwrap();

        let embedded = verify_file(&written.path).unwrap();
        assert_eq!(embedded[0].1.hash, written.hash);
        hashes.push(written.hash);
        documents.push(std::fs::read(&written.path).unwrap());
    }
    assert_eq!(hashes[0], hashes[1]);
    assert_eq!(documents[0], documents[1]);
}
