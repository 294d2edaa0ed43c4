//! A tiny in-process engine for pipeline tests.
//!
//! It applies value transfers and nonce bumps, charges `gas_price` for the
//! gas it uses, and interprets four opcodes (PUSH1, ADD, SSTORE, STOP) in
//! the recipient's code. Transactions below intrinsic gas or with the wrong
//! nonce are rejected with geth's wording.

#![allow(dead_code)]

use std::sync::Arc;
use tessera_exceptions::ExceptionMap;
use tessera_forks::IntrinsicGasInput;
use tessera_primitives::U256;
use tessera_t8n::{
    RejectedTx, ScriptedTool, T8nResult, TransitionRequest, TransitionResponse, TransitionResult,
    WireTransaction,
};
use tessera_types::{Alloc, Bloom, Receipt};

const SSTORE_GAS: u64 = 20_000;
const STEP_GAS: u64 = 3;

fn run_code(alloc: &mut Alloc, to: tessera_primitives::Address) -> u64 {
    let code = match alloc.get(&to) {
        Some(account) => account.code.to_vec(),
        None => return 0,
    };
    let mut stack: Vec<U256> = Vec::new();
    let mut gas = 0;
    let mut pc = 0;
    while pc < code.len() {
        match code[pc] {
            0x60 => {
                let value = code.get(pc + 1).copied().unwrap_or_default();
                stack.push(U256::from(value));
                gas += STEP_GAS;
                pc += 2;
            }
            0x01 => {
                let a = stack.pop().unwrap_or_default();
                let b = stack.pop().unwrap_or_default();
                stack.push(a.overflowing_add(b).0);
                gas += STEP_GAS;
                pc += 1;
            }
            0x55 => {
                let key = stack.pop().unwrap_or_default();
                let value = stack.pop().unwrap_or_default();
                alloc.entry(to).storage.set(key, value);
                gas += SSTORE_GAS;
                pc += 1;
            }
            _ => break,
        }
    }
    gas
}

fn intrinsic(request: &TransitionRequest, tx: &WireTransaction) -> u64 {
    let access_list = tx.access_list.as_deref().unwrap_or(&[]);
    request
        .fork
        .intrinsic_gas(&IntrinsicGasInput {
            calldata: &tx.input,
            contract_creation: tx.to.is_none(),
            access_list_addresses: access_list.len() as u64,
            access_list_storage_keys: access_list
                .iter()
                .map(|item| item.storage_keys.len() as u64)
                .sum(),
            authorizations: tx.authorization_list.as_ref().map_or(0, |l| l.len() as u64),
        })
        .regular
}

fn gas_price(request: &TransitionRequest, tx: &WireTransaction) -> u128 {
    if let Some(price) = &tx.gas_price {
        return price.0;
    }
    let base = u128::from(request.env.current_base_fee.unwrap_or(0));
    let max_fee = tx.max_fee_per_gas.as_ref().map_or(0, |f| f.0);
    let tip = tx.max_priority_fee_per_gas.as_ref().map_or(0, |f| f.0);
    max_fee.min(base + tip)
}

/// Apply `request` the way a very small EVM would
pub fn execute(request: &TransitionRequest) -> T8nResult<TransitionResponse> {
    let mut alloc = request.alloc.clone();
    let mut rejected = Vec::new();
    let mut receipts = Vec::new();
    let mut cumulative = 0u64;
    let coinbase = request.env.current_coinbase;

    for (index, tx) in request.txs.iter().enumerate() {
        let nonce = alloc.get(&tx.sender).map_or(0, |a| a.nonce);
        let want = intrinsic(request, tx);
        let error = if tx.nonce < nonce {
            Some(format!("nonce too low: address {}, tx: {} state: {}", tx.sender, tx.nonce, nonce))
        } else if tx.nonce > nonce {
            Some(format!("nonce too high: address {}, tx: {} state: {}", tx.sender, tx.nonce, nonce))
        } else if tx.gas_limit < want {
            Some(format!("intrinsic gas too low: have {}, want {}", tx.gas_limit, want))
        } else {
            None
        };
        if let Some(error) = error {
            rejected.push(RejectedTx { index, error });
            continue;
        }

        let price = U256::from(gas_price(request, tx));
        let sender = alloc.entry(tx.sender);
        sender.nonce += 1;
        sender.balance = sender.balance.saturating_sub(tx.value.0);
        let mut used = want;
        if let Some(to) = tx.to {
            alloc.entry(to).balance += tx.value.0;
            used += run_code(&mut alloc, to);
        }
        let used = used.min(tx.gas_limit);
        let fee = price * U256::from(used);
        let sender = alloc.entry(tx.sender);
        sender.balance = sender.balance.saturating_sub(fee);
        alloc.entry(coinbase).balance += fee;

        cumulative += used;
        receipts.push(Receipt {
            tx_type: Some(tx.tx_type),
            status: Some(1),
            cumulative_gas_used: cumulative,
            gas_used: used,
            logs_bloom: Bloom::ZERO,
            logs: Vec::new(),
            transaction_hash: tx.hash,
            contract_address: None,
            transaction_index: Some(index as u64),
            blob_gas_used: None,
        });
    }

    if let Some(reward) = request.reward {
        alloc.entry(coinbase).balance += U256::from(reward);
    }

    let root = alloc.state_root();
    Ok(TransitionResponse {
        alloc,
        result: TransitionResult {
            receipts,
            rejected,
            gas_used: cumulative,
            current_base_fee: request.env.current_base_fee,
            ..TransitionResult::empty(root)
        },
        body: None,
        traces: None,
    })
}

/// Geth-flavoured tool backed by [`execute`]
pub fn mini_engine() -> Arc<ScriptedTool> {
    Arc::new(ScriptedTool::new(ExceptionMap::geth(), execute))
}
