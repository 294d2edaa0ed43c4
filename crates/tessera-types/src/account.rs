//! Accounts, allocations and post-state expectations

use serde::{de, ser::SerializeMap, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{btree_map, BTreeMap};
use std::fmt;
use tessera_crypto::{keccak256, trie};
use tessera_primitives::{serde_hex, u256_from_hex, u256_to_word, Address, Bytes, H256, U256};
use tessera_rlp::RlpStream;

/// Sparse contract storage. Absence means zero, so zero values are never
/// stored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Storage(BTreeMap<U256, U256>);

impl Storage {
    /// Empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Value at `key`, zero when unset
    pub fn get(&self, key: &U256) -> U256 {
        self.0.get(key).copied().unwrap_or_default()
    }

    /// Set `key`; a zero value clears the slot
    pub fn set(&mut self, key: impl Into<U256>, value: impl Into<U256>) {
        let (key, value) = (key.into(), value.into());
        if value.is_zero() {
            self.0.remove(&key);
        } else {
            self.0.insert(key, value);
        }
    }

    /// Number of non-zero slots
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if every slot is zero
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Non-zero slots in key order
    pub fn iter(&self) -> btree_map::Iter<'_, U256, U256> {
        self.0.iter()
    }

    /// Root of the storage trie: `keccak(word(key)) -> rlp(value)`
    pub fn root(&self) -> H256 {
        if self.0.is_empty() {
            return trie::EMPTY_ROOT;
        }
        trie::sec_trie_root(
            self.0
                .iter()
                .map(|(k, v)| (u256_to_word(k), tessera_rlp::encode(v))),
        )
    }
}

impl<K: Into<U256>, V: Into<U256>> FromIterator<(K, V)> for Storage {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut storage = Storage::new();
        for (k, v) in iter {
            storage.set(k, v);
        }
        storage
    }
}

impl Serialize for Storage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(&format!("0x{:x}", k), &format!("0x{:x}", v))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Storage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Engines emit null for an empty map
        let raw = Option::<BTreeMap<String, String>>::deserialize(deserializer)?;
        let mut storage = Storage::new();
        for (k, v) in raw.unwrap_or_default() {
            let key = u256_from_hex(&k).map_err(de::Error::custom)?;
            let value = u256_from_hex(&v).map_err(de::Error::custom)?;
            storage.set(key, value);
        }
        Ok(storage)
    }
}

/// A complete account
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Nonce
    #[serde(default, with = "serde_hex::quantity")]
    pub nonce: u64,
    /// Balance in wei
    #[serde(default, with = "serde_hex::u256")]
    pub balance: U256,
    /// Runtime code
    #[serde(default)]
    pub code: Bytes,
    /// Storage slots
    #[serde(default)]
    pub storage: Storage,
}

impl Account {
    /// Account holding only a balance
    pub fn with_balance(balance: U256) -> Self {
        Account {
            balance,
            ..Default::default()
        }
    }

    /// EIP-161 emptiness: no code, zero nonce and zero balance
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code.is_empty()
    }

    /// `keccak(code)`
    pub fn code_hash(&self) -> H256 {
        keccak256(&self.code)
    }

    /// `rlp([nonce, balance, storage_root, code_hash])`
    pub fn rlp(&self) -> Vec<u8> {
        let mut s = RlpStream::new_list(4);
        s.append(&self.nonce);
        s.append(&self.balance);
        s.append(&self.storage.root());
        s.append(&self.code_hash());
        s.out().to_vec()
    }
}

/// Full allocation: every account of a pre- or post-state
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Alloc(BTreeMap<Address, Account>);

impl Alloc {
    /// Empty allocation
    pub fn new() -> Self {
        Self::default()
    }

    /// Account at `address`
    pub fn get(&self, address: &Address) -> Option<&Account> {
        self.0.get(address)
    }

    /// Mutable account at `address`
    pub fn get_mut(&mut self, address: &Address) -> Option<&mut Account> {
        self.0.get_mut(address)
    }

    /// Account at `address`, inserting an empty one if absent
    pub fn entry(&mut self, address: Address) -> &mut Account {
        self.0.entry(address).or_default()
    }

    /// Insert or replace an account
    pub fn insert(&mut self, address: Address, account: Account) -> Option<Account> {
        self.0.insert(address, account)
    }

    /// True if `address` is allocated
    pub fn contains(&self, address: &Address) -> bool {
        self.0.contains_key(address)
    }

    /// Number of accounts
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no account is allocated
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Accounts in address order
    pub fn iter(&self) -> btree_map::Iter<'_, Address, Account> {
        self.0.iter()
    }

    /// State trie root of this allocation
    pub fn state_root(&self) -> H256 {
        if self.0.is_empty() {
            return trie::EMPTY_ROOT;
        }
        trie::sec_trie_root(self.0.iter().map(|(addr, acc)| (*addr, acc.rlp())))
    }
}

impl FromIterator<(Address, Account)> for Alloc {
    fn from_iter<I: IntoIterator<Item = (Address, Account)>>(iter: I) -> Self {
        Alloc(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Alloc {
    type Item = (&'a Address, &'a Account);
    type IntoIter = btree_map::Iter<'a, Address, Account>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Account field named in a post-state mismatch
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccountField {
    /// Existence of the account itself
    Existence,
    /// Nonce
    Nonce,
    /// Balance
    Balance,
    /// Code
    Code,
    /// One storage slot
    Storage(U256),
}

impl fmt::Display for AccountField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountField::Existence => f.write_str("existence"),
            AccountField::Nonce => f.write_str("nonce"),
            AccountField::Balance => f.write_str("balance"),
            AccountField::Code => f.write_str("code"),
            AccountField::Storage(key) => write!(f, "storage[0x{:x}]", key),
        }
    }
}

/// One field that differs between the expected and actual post-state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostStateMismatch {
    /// Account
    pub address: Address,
    /// Field
    pub field: AccountField,
    /// Declared value
    pub expected: String,
    /// Value the engine produced
    pub actual: String,
}

impl fmt::Display for PostStateMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: expected {}, got {}",
            self.address, self.field, self.expected, self.actual
        )
    }
}

/// Author-declared expectation for one account. Unset fields are not
/// checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExpectedAccount {
    /// The account must exist and match every field that is set
    Exists {
        /// Expected nonce
        nonce: Option<u64>,
        /// Expected balance
        balance: Option<U256>,
        /// Expected code
        code: Option<Bytes>,
        /// Expected storage, compared exactly (absent keys are zero)
        storage: Option<Storage>,
    },
    /// The account must not exist
    NonExistent,
}

impl ExpectedAccount {
    /// Existence only
    pub fn exists() -> Self {
        ExpectedAccount::Exists {
            nonce: None,
            balance: None,
            code: None,
            storage: None,
        }
    }

    /// Set the expected nonce
    pub fn nonce(self, value: u64) -> Self {
        self.map_exists(|nonce, _, _, _| *nonce = Some(value))
    }

    /// Set the expected balance
    pub fn balance(self, value: impl Into<U256>) -> Self {
        let value = value.into();
        self.map_exists(|_, balance, _, _| *balance = Some(value))
    }

    /// Set the expected code
    pub fn code(self, value: impl Into<Bytes>) -> Self {
        let value = value.into();
        self.map_exists(|_, _, code, _| *code = Some(value))
    }

    /// Set the expected storage
    pub fn storage(self, value: Storage) -> Self {
        self.map_exists(|_, _, _, storage| *storage = Some(value))
    }

    fn map_exists(
        mut self,
        f: impl FnOnce(&mut Option<u64>, &mut Option<U256>, &mut Option<Bytes>, &mut Option<Storage>),
    ) -> Self {
        if let ExpectedAccount::Exists {
            nonce,
            balance,
            code,
            storage,
        } = &mut self
        {
            f(nonce, balance, code, storage);
        }
        self
    }

    fn verify(&self, address: Address, actual: Option<&Account>, out: &mut Vec<PostStateMismatch>) {
        let mut push = |field, expected: String, actual: String| {
            out.push(PostStateMismatch {
                address,
                field,
                expected,
                actual,
            })
        };

        let (nonce, balance, code, storage) = match (self, actual) {
            (ExpectedAccount::NonExistent, None) => return,
            (ExpectedAccount::NonExistent, Some(_)) => {
                push(AccountField::Existence, "absent".into(), "present".into());
                return;
            }
            (ExpectedAccount::Exists { .. }, None) => {
                push(AccountField::Existence, "present".into(), "absent".into());
                return;
            }
            (
                ExpectedAccount::Exists {
                    nonce,
                    balance,
                    code,
                    storage,
                },
                Some(acc),
            ) => (
                nonce.map(|n| (n, acc.nonce)),
                balance.map(|b| (b, acc.balance)),
                code.as_ref().map(|c| (c, &acc.code)),
                storage.as_ref().map(|s| (s, &acc.storage)),
            ),
        };

        if let Some((want, got)) = nonce {
            if want != got {
                push(AccountField::Nonce, want.to_string(), got.to_string());
            }
        }
        if let Some((want, got)) = balance {
            if want != got {
                push(AccountField::Balance, want.to_string(), got.to_string());
            }
        }
        if let Some((want, got)) = code {
            if want != got {
                push(AccountField::Code, want.to_hex(), got.to_hex());
            }
        }
        if let Some((want, got)) = storage {
            let keys: std::collections::BTreeSet<&U256> =
                want.0.keys().chain(got.0.keys()).collect();
            for key in keys {
                let (w, g) = (want.get(key), got.get(key));
                if w != g {
                    push(
                        AccountField::Storage(*key),
                        format!("0x{:x}", w),
                        format!("0x{:x}", g),
                    );
                }
            }
        }
    }
}

/// Partial post-state declared by the author
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpectedAlloc(BTreeMap<Address, ExpectedAccount>);

impl ExpectedAlloc {
    /// No expectations
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an expectation for `address`
    pub fn insert(&mut self, address: Address, expected: ExpectedAccount) -> &mut Self {
        self.0.insert(address, expected);
        self
    }

    /// Number of accounts with an expectation
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if nothing is declared
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compare against the engine's complete post-state. An empty result
    /// means every declared field matched.
    pub fn verify(&self, actual: &Alloc) -> Vec<PostStateMismatch> {
        let mut out = Vec::new();
        for (address, expected) in &self.0 {
            expected.verify(*address, actual.get(address), &mut out);
        }
        out
    }
}

impl FromIterator<(Address, ExpectedAccount)> for ExpectedAlloc {
    fn from_iter<I: IntoIterator<Item = (Address, ExpectedAccount)>>(iter: I) -> Self {
        ExpectedAlloc(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    #[test]
    fn test_storage_drops_zero() {
        let mut s = Storage::new();
        s.set(1u64, 5u64);
        s.set(2u64, 0u64);
        assert_eq!(s.len(), 1);
        s.set(1u64, 0u64);
        assert!(s.is_empty());
        assert_eq!(s.get(&U256::from(1u64)), U256::zero());
    }

    #[test]
    fn test_empty_alloc_root() {
        assert_eq!(Alloc::new().state_root(), trie::EMPTY_ROOT);
        assert_eq!(Storage::new().root(), trie::EMPTY_ROOT);
    }

    #[test]
    fn test_state_root_ignores_insertion_order() {
        let a: Alloc = [(addr(1), Account::with_balance(1u64.into())), (addr(2), Account::default())]
            .into_iter()
            .collect();
        let mut b = Alloc::new();
        b.insert(addr(2), Account::default());
        b.insert(addr(1), Account::with_balance(1u64.into()));
        assert_eq!(a.state_root(), b.state_root());
        assert_ne!(a.state_root(), trie::EMPTY_ROOT);
    }

    #[test]
    fn test_empty_account_rlp() {
        // rlp([0, 0, EMPTY_ROOT, keccak("")])
        let rlp = Account::default().rlp();
        assert_eq!(rlp.len(), 70);
        assert_eq!(rlp[0], 0xf8);
        assert_eq!(rlp[1], 0x44);
    }

    #[test]
    fn test_alloc_json_shape() {
        let mut acc = Account::with_balance(U256::from(0x3b9aca00u64));
        acc.storage.set(0u64, 3u64);
        let alloc: Alloc = [(addr(0x1000), acc)].into_iter().collect();
        let json = serde_json::to_value(&alloc).unwrap();
        let entry = &json["0x0000000000000000000000000000000000001000"];
        assert_eq!(entry["balance"], "0x3b9aca00");
        assert_eq!(entry["nonce"], "0x0");
        assert_eq!(entry["code"], "0x");
        assert_eq!(entry["storage"]["0x0"], "0x3");
    }

    #[test]
    fn test_alloc_decodes_engine_output() {
        let json = r#"{
            "0x0000000000000000000000000000000000001000": {
                "balance": "0x0",
                "code": "0x600160020160005500",
                "storage": {
                    "0x0000000000000000000000000000000000000000000000000000000000000000":
                    "0x0000000000000000000000000000000000000000000000000000000000000003"
                }
            },
            "0x00000000000000000000000000000000000000aa": { "balance": "0x10", "nonce": "0x1", "storage": null }
        }"#;
        let alloc: Alloc = serde_json::from_str(json).unwrap();
        let contract = alloc.get(&addr(0x1000)).unwrap();
        assert_eq!(contract.storage.get(&U256::zero()), U256::from(3u64));
        assert_eq!(contract.nonce, 0);
        assert_eq!(alloc.get(&addr(0xaa)).unwrap().nonce, 1);
    }

    #[test]
    fn test_verify_partial_expectation() {
        let mut storage = Storage::new();
        storage.set(0u64, 3u64);
        let actual: Alloc = [(
            addr(0x1000),
            Account {
                nonce: 1,
                balance: U256::from(10u64),
                code: Bytes::from(vec![0x00]),
                storage: storage.clone(),
            },
        )]
        .into_iter()
        .collect();

        let mut expected = ExpectedAlloc::new();
        expected.insert(addr(0x1000), ExpectedAccount::exists().storage(storage));
        assert!(expected.verify(&actual).is_empty());

        let mut wrong = ExpectedAlloc::new();
        wrong.insert(
            addr(0x1000),
            ExpectedAccount::exists()
                .nonce(2)
                .storage([(0u64, 4u64)].into_iter().collect()),
        );
        let diff = wrong.verify(&actual);
        assert_eq!(diff.len(), 2);
        assert_eq!(diff[0].field, AccountField::Nonce);
        assert_eq!(diff[1].field, AccountField::Storage(U256::zero()));
        assert_eq!(diff[1].expected, "0x4");
        assert_eq!(diff[1].actual, "0x3");
    }

    #[test]
    fn test_verify_storage_is_exact() {
        let actual: Alloc = [(
            addr(1),
            Account {
                storage: [(0u64, 1u64), (1u64, 2u64)].into_iter().collect(),
                ..Default::default()
            },
        )]
        .into_iter()
        .collect();
        let mut expected = ExpectedAlloc::new();
        expected.insert(
            addr(1),
            ExpectedAccount::exists().storage([(0u64, 1u64)].into_iter().collect()),
        );
        let diff = expected.verify(&actual);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff[0].field, AccountField::Storage(U256::one()));
    }

    #[test]
    fn test_verify_existence() {
        let actual: Alloc = [(addr(1), Account::default())].into_iter().collect();
        let mut expected = ExpectedAlloc::new();
        expected
            .insert(addr(1), ExpectedAccount::NonExistent)
            .insert(addr(2), ExpectedAccount::exists())
            .insert(addr(3), ExpectedAccount::NonExistent);
        let diff = expected.verify(&actual);
        assert_eq!(diff.len(), 2);
        assert!(diff.iter().all(|m| m.field == AccountField::Existence));
        assert_eq!(diff[0].to_string(), format!("{} existence: expected absent, got present", addr(1)));
    }
}
