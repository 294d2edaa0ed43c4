//! Deterministic pre-state allocator
//!
//! Every scenario owns one [`PreAlloc`]. Addresses come from two local
//! counters, never from randomness or the clock, so filling the same
//! scenario twice produces byte-identical pre-states.

use crate::account::{Account, Alloc, Storage};
use crate::error::AllocError;
use tessera_crypto::{address_of, private_key_from_bytes, PrivateKey};
use tessera_primitives::{Address, Bytes, H256, U256};
use tracing::trace;

/// First contract address handed out
pub const CONTRACT_START_ADDRESS: u64 = 0x1000;

/// Step between consecutive contract addresses
pub const CONTRACT_ADDRESS_INCREMENT: u64 = 0x100;

/// Balance given to an EOA when the author does not name one (1000 ether)
pub const DEFAULT_EOA_BALANCE: u128 = 1_000_000_000_000_000_000_000;

/// Externally-owned account handle
#[derive(Clone)]
pub struct Eoa {
    private_key: PrivateKey,
    address: Address,
    nonce: u64,
}

impl Eoa {
    /// Handle for a known key, starting at nonce zero
    pub fn from_key(private_key: PrivateKey) -> Self {
        let address = address_of(&private_key);
        Eoa {
            private_key,
            address,
            nonce: 0,
        }
    }

    /// Account address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Signing key
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    /// Raw secret key bytes, as written into fixtures
    pub fn secret_key(&self) -> H256 {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&self.private_key.to_bytes());
        H256::from_bytes(bytes)
    }

    /// Nonce the next transaction will use
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Take the current nonce and advance the counter
    pub fn next_nonce(&mut self) -> Option<u64> {
        let n = self.nonce;
        self.nonce = n.checked_add(1)?;
        Some(n)
    }
}

impl std::fmt::Debug for Eoa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Eoa")
            .field("address", &self.address.to_hex())
            .field("nonce", &self.nonce)
            .finish()
    }
}

/// Scenario-local pre-state builder
#[derive(Debug, Clone)]
pub struct PreAlloc {
    alloc: Alloc,
    next_contract: u64,
    next_key: u64,
}

impl Default for PreAlloc {
    fn default() -> Self {
        Self::new()
    }
}

impl PreAlloc {
    /// Empty pre-state with fresh counters
    pub fn new() -> Self {
        PreAlloc {
            alloc: Alloc::new(),
            next_contract: 0,
            next_key: 1,
        }
    }

    /// Seed with accounts the allocator must never hand out again
    pub fn with_alloc(alloc: Alloc) -> Self {
        PreAlloc {
            alloc,
            ..Self::new()
        }
    }

    /// Create a funded EOA. A zero amount yields a key without a
    /// pre-state entry.
    pub fn fund_eoa(&mut self, amount: Option<U256>) -> Result<Eoa, AllocError> {
        let amount = amount.unwrap_or_else(|| U256::from(DEFAULT_EOA_BALANCE));
        let eoa = loop {
            let index = self.next_key;
            self.next_key = index
                .checked_add(1)
                .ok_or(AllocError::AddressSpaceExhausted)?;
            let mut secret = [0u8; 32];
            secret[24..].copy_from_slice(&index.to_be_bytes());
            let eoa = Eoa::from_key(private_key_from_bytes(&secret)?);
            if !self.alloc.contains(&eoa.address) {
                break eoa;
            }
        };
        if !amount.is_zero() {
            self.alloc.insert(eoa.address, Account::with_balance(amount));
        }
        trace!(address = %eoa.address, %amount, "funded eoa");
        Ok(eoa)
    }

    /// Deploy `code` at the next free contract address
    pub fn deploy_contract(
        &mut self,
        code: impl Into<Bytes>,
        balance: Option<U256>,
        storage: Option<Storage>,
    ) -> Result<Address, AllocError> {
        let address = loop {
            let offset = self
                .next_contract
                .checked_mul(CONTRACT_ADDRESS_INCREMENT)
                .and_then(|o| o.checked_add(CONTRACT_START_ADDRESS))
                .ok_or(AllocError::AddressSpaceExhausted)?;
            self.next_contract += 1;
            let address = Address::from_low_u64(offset);
            if !self.alloc.contains(&address) {
                break address;
            }
        };
        self.alloc.insert(
            address,
            Account {
                nonce: 1,
                balance: balance.unwrap_or_default(),
                code: code.into(),
                storage: storage.unwrap_or_default(),
            },
        );
        trace!(%address, "deployed contract");
        Ok(address)
    }

    /// Add `amount` to the balance at `address`, creating the account if
    /// needed
    pub fn fund_address(&mut self, address: Address, amount: U256) -> Result<(), AllocError> {
        let account = self.alloc.entry(address);
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or(AllocError::BalanceOverflow { address })?;
        Ok(())
    }

    /// Place an account verbatim, e.g. a system contract predeploy
    pub fn insert(&mut self, address: Address, account: Account) {
        self.alloc.insert(address, account);
    }

    /// The allocation built so far
    pub fn alloc(&self) -> &Alloc {
        &self.alloc
    }

    /// Finish building
    pub fn into_alloc(self) -> Alloc {
        self.alloc
    }
}
