//! System contracts deployed at fork activation

use hex_literal::hex;
use tessera_primitives::Address;

/// EIP-4788 beacon block root contract
pub const BEACON_ROOTS_ADDRESS: Address =
    Address::from_bytes(hex!("000F3df6D732807Ef1319fB7B8bB8522d0Beac02"));

const BEACON_ROOTS_CODE: &[u8] = &hex!(
    "3373fffffffffffffffffffffffffffffffffffffffe14604d57602036146024575f5ffd5b5f35801560495762001fff810690815414603c575f5ffd5b62001fff01545f5260205ff35b5f5ffd5b62001fff42064281555f359062001fff015500"
);

/// EIP-2935 historical block hashes contract
pub const HISTORY_STORAGE_ADDRESS: Address =
    Address::from_bytes(hex!("0000F90827F1C53a10cb7A02335B175320002935"));

const HISTORY_STORAGE_CODE: &[u8] = &hex!(
    "3373fffffffffffffffffffffffffffffffffffffffe14604657602036036042575f35600143038111604257611fff81430311604257611fff9006545f5260205ff35b5f5ffd5b5f35611fff60014303065500"
);

/// A contract the protocol calls into, with the code that must be present
/// in genesis for the fork to operate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SystemContract {
    /// Deployment address
    pub address: Address,
    /// Short identifier
    pub name: &'static str,
    /// Runtime bytecode
    pub code: &'static [u8],
    /// Nonce the deployed account carries
    pub nonce: u64,
}

impl SystemContract {
    /// EIP-4788
    pub const BEACON_ROOTS: SystemContract = SystemContract {
        address: BEACON_ROOTS_ADDRESS,
        name: "beacon_roots",
        code: BEACON_ROOTS_CODE,
        nonce: 1,
    };

    /// EIP-2935
    pub const HISTORY_STORAGE: SystemContract = SystemContract {
        address: HISTORY_STORAGE_ADDRESS,
        name: "history_storage",
        code: HISTORY_STORAGE_CODE,
        nonce: 1,
    };
}
