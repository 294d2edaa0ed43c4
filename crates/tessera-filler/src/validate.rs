//! Checks run before and after the engine, without executing anything.
//!
//! Each check returns the exception kind it detects so the caller can hold
//! it against what the author declared.

use tessera_crypto::recover_address;
use tessera_exceptions::{BlockException, TransactionException};
use tessera_forks::{Fork, TxType};
use tessera_primitives::U256;
use tessera_types::{Account, Environment, Header, SignedTransaction, VERSIONED_HASH_VERSION_KZG};

/// Lowest gas limit a header may carry
pub const MIN_GAS_LIMIT: u64 = 5000;

/// Largest per-block gas limit change is `parent / GAS_LIMIT_BOUND_DIVISOR`
pub const GAS_LIMIT_BOUND_DIVISOR: u64 = 1024;

/// EIP-7702 delegation designator prefix
const DELEGATION_PREFIX: [u8; 3] = [0xef, 0x01, 0x00];

fn is_delegation(code: &[u8]) -> bool {
    code.len() == 23 && code.starts_with(&DELEGATION_PREFIX)
}

/// Well-formedness of `tx` under `fork`, in the block described by `env`,
/// sent from `sender` (`None` if the account does not exist yet).
pub fn validate_transaction(
    tx: &SignedTransaction,
    fork: Fork,
    env: &Environment,
    sender: Option<&Account>,
) -> Option<TransactionException> {
    use TransactionException as Tx;

    let t = &tx.tx;
    if !fork.tx_types().contains(&t.tx_type) {
        return Some(Tx::TypeNotSupported);
    }

    let signature = tx.signature();
    let signer = recover_address(&t.signing_hash(), &signature).ok();
    if !signature.is_in_range() || signer != Some(tx.sender) {
        return Some(Tx::InvalidSignature);
    }

    if t.is_create() && !fork.contract_creating_tx_types().contains(&t.tx_type) {
        return Some(match t.tx_type {
            TxType::Blob => Tx::Type3TxContractCreation,
            _ => Tx::Type4TxContractCreation,
        });
    }

    if t.tx_type == TxType::Blob {
        if t.blob_versioned_hashes.is_empty() {
            return Some(Tx::Type3TxZeroBlobs);
        }
        if t
            .blob_versioned_hashes
            .iter()
            .any(|h| h.as_bytes()[0] != VERSIONED_HASH_VERSION_KZG)
        {
            return Some(Tx::Type3TxInvalidBlobVersionedHash);
        }
        if let Ok(schedule) = fork.blob_schedule() {
            let blob_gas = schedule.blob_gas(t.blob_versioned_hashes.len() as u64);
            if blob_gas > schedule.max_blob_gas_per_block() {
                return Some(Tx::Type3TxMaxBlobGasAllowanceExceeded);
            }
        }
    }

    if t.tx_type == TxType::SetCode && t.authorization_list.is_empty() {
        return Some(Tx::Type4EmptyAuthorizationList);
    }

    let (nonce, code) = sender.map_or((0, &[][..]), |a| (a.nonce, &a.code[..]));
    if nonce == u64::MAX {
        return Some(Tx::NonceIsMax);
    }
    if t.nonce < nonce {
        return Some(Tx::NonceMismatchTooLow);
    }
    if t.nonce > nonce {
        return Some(Tx::NonceMismatchTooHigh);
    }
    if !code.is_empty() && !(fork >= Fork::Prague && is_delegation(code)) {
        return Some(Tx::SenderNotEoa);
    }

    if t.gas_limit > env.gas_limit {
        return Some(Tx::GasAllowanceExceeded);
    }

    if t.is_create() {
        if let Ok(max) = fork.max_initcode_size() {
            if t.data.len() > max {
                return Some(Tx::InitcodeSizeExceeded);
            }
        }
    }

    let intrinsic = fork.intrinsic_gas(&t.intrinsic_gas_input());
    if t.gas_limit < intrinsic.regular {
        return Some(Tx::IntrinsicGasTooLow);
    }
    if t.gas_limit < intrinsic.required() {
        return Some(Tx::IntrinsicGasBelowFloorGasCost);
    }

    if t.tx_type.has_dynamic_fee() && t.max_priority_fee_per_gas > t.max_fee_per_gas {
        return Some(Tx::PriorityGreaterThanMaxFeePerGas);
    }
    if let Some(base_fee) = env.base_fee_per_gas {
        if t.max_fee() < u128::from(base_fee) {
            return Some(Tx::InsufficientMaxFeePerGas);
        }
    }

    if t.tx_type == TxType::Blob {
        if let (Ok(schedule), Some(excess)) = (fork.blob_schedule(), env.excess_blob_gas) {
            if U256::from(t.max_fee_per_blob_gas) < schedule.blob_gas_price(excess) {
                return Some(Tx::InsufficientMaxFeePerBlobGas);
            }
        }
    }

    None
}

/// Base fee a child of `parent` must carry under `fork`, `None` before
/// London. The first EIP-1559 block starts from the initial base fee.
pub fn expected_base_fee(fork: Fork, parent: &Header) -> Option<u64> {
    let params = fork.base_fee_params().ok()?;
    Some(match parent.base_fee_per_gas {
        Some(parent_fee) => {
            params.next_base_fee(parent.gas_used, parent.gas_limit, parent_fee)
        }
        None => params.initial_base_fee,
    })
}

/// Excess blob gas a child of `parent` must carry under `fork`, `None`
/// before Cancun
pub fn expected_excess_blob_gas(fork: Fork, parent: &Header) -> Option<u64> {
    let schedule = fork.blob_schedule().ok()?;
    Some(match (parent.excess_blob_gas, parent.blob_gas_used) {
        (Some(excess), Some(used)) => schedule.excess_blob_gas(excess, used),
        _ => 0,
    })
}

/// Gas limit a child of `parent` carries by default under `fork`. The first
/// EIP-1559 block doubles it so the gas target is unchanged.
pub fn expected_gas_limit(fork: Fork, parent: &Header) -> u64 {
    match fork.base_fee_params() {
        Ok(params) if parent.base_fee_per_gas.is_none() => {
            parent.gas_limit.saturating_mul(params.elasticity_multiplier)
        }
        _ => parent.gas_limit,
    }
}

fn gas_limit_in_bounds(fork: Fork, header: &Header, parent: &Header) -> bool {
    let parent_limit = expected_gas_limit(fork, parent);
    let bound = parent_limit / GAS_LIMIT_BOUND_DIVISOR;
    header.gas_limit >= MIN_GAS_LIMIT && header.gas_limit.abs_diff(parent_limit) < bound
}

/// Header checks that need no execution: field presence for `fork`,
/// value ranges, and derivation from `parent` when there is one.
pub fn validate_header(
    header: &Header,
    fork: Fork,
    parent: Option<&Header>,
) -> Option<BlockException> {
    use BlockException as B;

    if header.present_fields() != fork.header_fields() {
        return Some(B::IncorrectBlockFormat);
    }
    if header.extra_data.len() > fork.max_extra_data_size() {
        return Some(B::ExtraDataTooBig);
    }
    if fork.requires_zero_difficulty() && !header.difficulty.is_zero() {
        return Some(B::InvalidDifficulty);
    }
    if header.gas_used > header.gas_limit {
        return Some(B::GasUsedOverflow);
    }
    if let (Ok(schedule), Some(used)) = (fork.blob_schedule(), header.blob_gas_used) {
        if used > schedule.max_blob_gas_per_block() {
            return Some(B::BlobGasUsedAboveLimit);
        }
    }

    let parent = parent?;
    if header.parent_hash != parent.hash() {
        return Some(B::UnknownParent);
    }
    if header.number != parent.number.wrapping_add(1) {
        return Some(B::InvalidBlockNumber);
    }
    if header.timestamp <= parent.timestamp {
        return Some(B::InvalidBlockTimestampOlderThanParent);
    }
    if !gas_limit_in_bounds(fork, header, parent) {
        return Some(B::InvalidGasLimit);
    }
    if header.base_fee_per_gas != expected_base_fee(fork, parent) {
        return Some(B::InvalidBaseFeePerGas);
    }
    if header.excess_blob_gas != expected_excess_blob_gas(fork, parent) {
        return Some(B::IncorrectExcessBlobGas);
    }
    None
}

/// Compare a header against the one execution produced. Fields a header
/// modifier changed away from the computed values are reported as the
/// kind a client would detect.
pub fn validate_against_execution(header: &Header, computed: &Header) -> Option<BlockException> {
    use BlockException as B;

    if header.blob_gas_used != computed.blob_gas_used {
        return Some(B::IncorrectBlobGasUsed);
    }
    if header.withdrawals_root != computed.withdrawals_root {
        return Some(B::InvalidWithdrawalsRoot);
    }
    if header.requests_hash != computed.requests_hash {
        return Some(B::InvalidRequests);
    }
    if header.state_root != computed.state_root {
        return Some(B::InvalidStateRoot);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_forks::HeaderField;
    use tessera_primitives::{Bytes, H256};
    use tessera_types::{HeaderModifier, PreAlloc, TxBuilder};

    fn funded() -> (PreAlloc, tessera_types::Eoa) {
        let mut pre = PreAlloc::new();
        let eoa = pre.fund_eoa(None).unwrap();
        (pre, eoa)
    }

    fn cancun_env() -> Environment {
        Environment::default().for_fork(Fork::Cancun).unwrap()
    }

    #[test]
    fn test_valid_transfer_passes() {
        let (pre, mut eoa) = funded();
        let sender = pre.alloc().get(&eoa.address()).cloned();
        let tx = TxBuilder::new()
            .to(eoa.address())
            .build(&mut eoa, 1)
            .unwrap();
        assert_eq!(
            validate_transaction(&tx, Fork::Cancun, &cancun_env(), sender.as_ref()),
            None
        );
    }

    #[test]
    fn test_intrinsic_gas_too_low() {
        let (pre, mut eoa) = funded();
        let sender = pre.alloc().get(&eoa.address()).cloned();
        let tx = TxBuilder::new()
            .to(eoa.address())
            .gas_limit(20_999)
            .build(&mut eoa, 1)
            .unwrap();
        assert_eq!(
            validate_transaction(&tx, Fork::Cancun, &cancun_env(), sender.as_ref()),
            Some(TransactionException::IntrinsicGasTooLow)
        );
    }

    #[test]
    fn test_type_not_supported_before_fork() {
        let (pre, mut eoa) = funded();
        let sender = pre.alloc().get(&eoa.address()).cloned();
        let tx = TxBuilder::new()
            .tx_type(TxType::DynamicFee)
            .to(eoa.address())
            .build(&mut eoa, 1)
            .unwrap();
        let env = Environment::default().for_fork(Fork::Berlin).unwrap();
        assert_eq!(
            validate_transaction(&tx, Fork::Berlin, &env, sender.as_ref()),
            Some(TransactionException::TypeNotSupported)
        );
    }

    #[test]
    fn test_nonce_sequencing() {
        let (pre, mut eoa) = funded();
        let mut sender = pre.alloc().get(&eoa.address()).cloned().unwrap();
        let tx = TxBuilder::new()
            .to(eoa.address())
            .build(&mut eoa, 1)
            .unwrap();

        sender.nonce = 1;
        assert_eq!(
            validate_transaction(&tx, Fork::Cancun, &cancun_env(), Some(&sender)),
            Some(TransactionException::NonceMismatchTooLow)
        );

        let ahead = TxBuilder::new()
            .to(eoa.address())
            .nonce(5)
            .build(&mut eoa, 1)
            .unwrap();
        assert_eq!(
            validate_transaction(&ahead, Fork::Cancun, &cancun_env(), Some(&sender)),
            Some(TransactionException::NonceMismatchTooHigh)
        );
    }

    #[test]
    fn test_sender_with_code() {
        let (pre, mut eoa) = funded();
        let mut sender = pre.alloc().get(&eoa.address()).cloned().unwrap();
        sender.code = Bytes::from(vec![0x00]);
        let tx = TxBuilder::new()
            .to(eoa.address())
            .build(&mut eoa, 1)
            .unwrap();
        assert_eq!(
            validate_transaction(&tx, Fork::Cancun, &cancun_env(), Some(&sender)),
            Some(TransactionException::SenderNotEoa)
        );
    }

    #[test]
    fn test_fee_below_base_fee() {
        let (pre, mut eoa) = funded();
        let sender = pre.alloc().get(&eoa.address()).cloned();
        let tx = TxBuilder::new()
            .to(eoa.address())
            .max_fee_per_gas(7)
            .max_priority_fee_per_gas(0)
            .build(&mut eoa, 1)
            .unwrap();
        let mut env = cancun_env();
        env.base_fee_per_gas = Some(8);
        assert_eq!(
            validate_transaction(&tx, Fork::Cancun, &env, sender.as_ref()),
            Some(TransactionException::InsufficientMaxFeePerGas)
        );
    }

    #[test]
    fn test_tampered_signature() {
        let (pre, mut eoa) = funded();
        let sender = pre.alloc().get(&eoa.address()).cloned();
        let mut tx = TxBuilder::new()
            .to(eoa.address())
            .build(&mut eoa, 1)
            .unwrap();
        tx.s = U256::zero();
        assert_eq!(
            validate_transaction(&tx, Fork::Cancun, &cancun_env(), sender.as_ref()),
            Some(TransactionException::InvalidSignature)
        );
    }

    fn child_of(parent: &Header, fork: Fork) -> Header {
        let mut header = Header {
            parent_hash: parent.hash(),
            number: parent.number + 1,
            timestamp: parent.timestamp + 12,
            gas_limit: expected_gas_limit(fork, parent),
            base_fee_per_gas: expected_base_fee(fork, parent),
            excess_blob_gas: expected_excess_blob_gas(fork, parent),
            ..Header::default()
        };
        for field in fork.header_fields() {
            header.insert_field(field);
        }
        header
    }

    fn genesis(fork: Fork) -> Header {
        let mut header = Header {
            gas_limit: 30_000_000,
            ..Header::default()
        };
        for field in fork.header_fields() {
            header.insert_field(field);
        }
        if fork.header_fields().contains(&HeaderField::BaseFeePerGas) {
            header.base_fee_per_gas = Some(7);
        }
        header
    }

    #[test]
    fn test_well_formed_child_passes() {
        let parent = genesis(Fork::Cancun);
        let child = child_of(&parent, Fork::Cancun);
        assert_eq!(validate_header(&child, Fork::Cancun, Some(&parent)), None);
    }

    #[test]
    fn test_missing_field_is_incorrect_format() {
        let parent = genesis(Fork::Cancun);
        let mut child = child_of(&parent, Fork::Cancun);
        HeaderModifier::new()
            .remove(HeaderField::ParentBeaconBlockRoot)
            .apply(&mut child);
        assert_eq!(
            validate_header(&child, Fork::Cancun, Some(&parent)),
            Some(BlockException::IncorrectBlockFormat)
        );
    }

    #[test]
    fn test_extra_data_too_big() {
        let mut header = genesis(Fork::Shanghai);
        header.extra_data = Bytes::from(vec![0u8; 33]);
        assert_eq!(
            validate_header(&header, Fork::Shanghai, None),
            Some(BlockException::ExtraDataTooBig)
        );
    }

    #[test]
    fn test_linkage_checks() {
        let parent = genesis(Fork::Shanghai);

        let mut child = child_of(&parent, Fork::Shanghai);
        child.parent_hash = H256::from_low_u64(1);
        assert_eq!(
            validate_header(&child, Fork::Shanghai, Some(&parent)),
            Some(BlockException::UnknownParent)
        );

        let mut child = child_of(&parent, Fork::Shanghai);
        child.timestamp = parent.timestamp;
        assert_eq!(
            validate_header(&child, Fork::Shanghai, Some(&parent)),
            Some(BlockException::InvalidBlockTimestampOlderThanParent)
        );

        let mut child = child_of(&parent, Fork::Shanghai);
        child.base_fee_per_gas = Some(8);
        assert_eq!(
            validate_header(&child, Fork::Shanghai, Some(&parent)),
            Some(BlockException::InvalidBaseFeePerGas)
        );

        let mut child = child_of(&parent, Fork::Shanghai);
        child.gas_limit = parent.gas_limit * 2;
        assert_eq!(
            validate_header(&child, Fork::Shanghai, Some(&parent)),
            Some(BlockException::InvalidGasLimit)
        );
    }

    #[test]
    fn test_first_london_block_uses_initial_base_fee() {
        let parent = genesis(Fork::Berlin);
        assert_eq!(expected_base_fee(Fork::Berlin, &parent), None);
        assert_eq!(expected_base_fee(Fork::London, &parent), Some(1_000_000_000));

        let child = child_of(&parent, Fork::London);
        assert_eq!(validate_header(&child, Fork::London, Some(&parent)), None);
    }

    #[test]
    fn test_execution_mismatch() {
        let computed = genesis(Fork::Cancun);
        let mut header = computed.clone();
        assert_eq!(validate_against_execution(&header, &computed), None);
        header.state_root = H256::from_low_u64(9);
        assert_eq!(
            validate_against_execution(&header, &computed),
            Some(BlockException::InvalidStateRoot)
        );
        header.blob_gas_used = Some(1);
        assert_eq!(
            validate_against_execution(&header, &computed),
            Some(BlockException::IncorrectBlobGasUsed)
        );
    }
}
