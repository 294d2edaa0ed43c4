//! Transactions: unsigned body, fluent builder and signed envelope

use crate::error::TxError;
use crate::pre_alloc::Eoa;
use tessera_crypto::{keccak256, recover_address, sign, PrivateKey, Signature};
use tessera_exceptions::ExpectedException;
use tessera_forks::{IntrinsicGasInput, TxType};
use serde::{Deserialize, Serialize};
use tessera_primitives::serde_hex::{self, HexU256};
use tessera_primitives::{Address, Bytes, H256, U256};
use tessera_rlp::{utils, Encodable, RlpStream};

/// Default gas limit: a plain transfer
pub const DEFAULT_GAS_LIMIT: u64 = 21_000;

/// Default legacy gas price, above the default base fee
pub const DEFAULT_GAS_PRICE: u128 = 10;

/// Default EIP-1559 fee cap, equal to the default base fee
pub const DEFAULT_MAX_FEE_PER_GAS: u128 = 7;

/// Default blob fee cap
pub const DEFAULT_MAX_FEE_PER_BLOB_GAS: u128 = 1;

/// Version byte of a KZG versioned hash
pub const VERSIONED_HASH_VERSION_KZG: u8 = 0x01;

/// Magic prefix of an EIP-7702 authorization signing payload
const AUTHORIZATION_MAGIC: u8 = 0x05;

/// Access list item (address + storage keys)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessListItem {
    /// Account address
    pub address: Address,
    /// Storage keys
    pub storage_keys: Vec<H256>,
}

impl Encodable for AccessListItem {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.address);
        utils::append_hash_list(s, &self.storage_keys);
    }
}

/// Signed EIP-7702 authorization tuple
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "AuthorizationJson", from = "AuthorizationJson")]
pub struct Authorization {
    /// Chain the authorization is valid on (zero for any chain)
    pub chain_id: u64,
    /// Delegation target
    pub address: Address,
    /// Authority nonce
    pub nonce: u64,
    /// Signature parity
    pub y_parity: u8,
    /// Signature r
    pub r: U256,
    /// Signature s
    pub s: U256,
    /// Recovered authority
    pub signer: Address,
}

impl Authorization {
    /// `keccak(0x05 || rlp([chain_id, address, nonce]))`
    pub fn signing_hash(chain_id: u64, address: &Address, nonce: u64) -> H256 {
        let mut s = RlpStream::new_list(3);
        s.append(&chain_id);
        s.append(address);
        s.append(&nonce);
        let mut payload = vec![AUTHORIZATION_MAGIC];
        payload.extend_from_slice(&s.out());
        keccak256(&payload)
    }

    /// Sign a delegation to `address` with `key`
    pub fn sign(
        chain_id: u64,
        address: Address,
        nonce: u64,
        key: &PrivateKey,
    ) -> Result<Self, TxError> {
        let hash = Self::signing_hash(chain_id, &address, nonce);
        let sig = sign(&hash, key)?;
        let signer = recover_address(&hash, &sig)?;
        Ok(Authorization {
            chain_id,
            address,
            nonce,
            y_parity: sig.recovery_id(),
            r: U256::from_big_endian(&sig.r),
            s: U256::from_big_endian(&sig.s),
            signer,
        })
    }
}

/// JSON shape of an authorization. Parity is written under both `v` and
/// `yParity` since engines disagree on the name.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizationJson {
    #[serde(with = "serde_hex::quantity")]
    chain_id: u64,
    address: Address,
    #[serde(with = "serde_hex::quantity")]
    nonce: u64,
    #[serde(default, with = "serde_hex::opt_quantity", skip_serializing_if = "Option::is_none")]
    v: Option<u64>,
    #[serde(default, with = "serde_hex::opt_quantity", skip_serializing_if = "Option::is_none")]
    y_parity: Option<u64>,
    r: HexU256,
    s: HexU256,
    #[serde(default)]
    signer: Address,
}

impl From<Authorization> for AuthorizationJson {
    fn from(auth: Authorization) -> Self {
        AuthorizationJson {
            chain_id: auth.chain_id,
            address: auth.address,
            nonce: auth.nonce,
            v: Some(auth.y_parity as u64),
            y_parity: Some(auth.y_parity as u64),
            r: HexU256(auth.r),
            s: HexU256(auth.s),
            signer: auth.signer,
        }
    }
}

impl From<AuthorizationJson> for Authorization {
    fn from(json: AuthorizationJson) -> Self {
        Authorization {
            chain_id: json.chain_id,
            address: json.address,
            nonce: json.nonce,
            y_parity: json.y_parity.or(json.v).unwrap_or_default() as u8,
            r: json.r.0,
            s: json.s.0,
            signer: json.signer,
        }
    }
}

impl Encodable for Authorization {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(6);
        s.append(&self.chain_id);
        s.append(&self.address);
        s.append(&self.nonce);
        s.append(&self.y_parity);
        s.append(&self.r);
        s.append(&self.s);
    }
}

/// Unsigned transaction of any type. Fee fields the type does not use are
/// ignored when encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Envelope type
    pub tx_type: TxType,
    /// Chain id (EIP-155 for legacy, always encoded for typed)
    pub chain_id: u64,
    /// Sender nonce
    pub nonce: u64,
    /// Legacy and access-list gas price
    pub gas_price: u128,
    /// EIP-1559 tip cap
    pub max_priority_fee_per_gas: u128,
    /// EIP-1559 fee cap
    pub max_fee_per_gas: u128,
    /// Gas limit
    pub gas_limit: u64,
    /// Recipient, `None` for contract creation
    pub to: Option<Address>,
    /// Value in wei
    pub value: U256,
    /// Calldata or init code
    pub data: Bytes,
    /// EIP-2930 access list
    pub access_list: Vec<AccessListItem>,
    /// EIP-4844 blob fee cap
    pub max_fee_per_blob_gas: u128,
    /// EIP-4844 versioned hashes
    pub blob_versioned_hashes: Vec<H256>,
    /// EIP-7702 authorizations
    pub authorization_list: Vec<Authorization>,
    /// Legacy only: sign with EIP-155 replay protection
    pub protected: bool,
    /// Failure the author expects the engine to report
    pub error: Option<ExpectedException>,
}

impl Transaction {
    /// Fee cap per gas: `gas_price` for legacy and access-list, `max_fee_per_gas` otherwise
    pub fn max_fee(&self) -> u128 {
        if self.tx_type.has_dynamic_fee() {
            self.max_fee_per_gas
        } else {
            self.gas_price
        }
    }

    /// True if this transaction creates a contract
    pub fn is_create(&self) -> bool {
        self.to.is_none()
    }

    /// Shape fed to the intrinsic gas calculator
    pub fn intrinsic_gas_input(&self) -> IntrinsicGasInput<'_> {
        IntrinsicGasInput {
            calldata: &self.data,
            contract_creation: self.is_create(),
            access_list_addresses: self.access_list.len() as u64,
            access_list_storage_keys: self
                .access_list
                .iter()
                .map(|item| item.storage_keys.len() as u64)
                .sum(),
            authorizations: self.authorization_list.len() as u64,
        }
    }

    /// Hash the sender signs
    pub fn signing_hash(&self) -> H256 {
        keccak256(&self.encode(None))
    }

    /// Sign with `key`
    pub fn sign(self, key: &PrivateKey) -> Result<SignedTransaction, TxError> {
        let hash = self.signing_hash();
        let sig = sign(&hash, key)?;
        let sender = recover_address(&hash, &sig)?;
        let v = match self.tx_type {
            TxType::Legacy if self.protected => sig.recovery_id() as u64 + 35 + 2 * self.chain_id,
            TxType::Legacy => sig.recovery_id() as u64 + 27,
            _ => sig.recovery_id() as u64,
        };
        let r = U256::from_big_endian(&sig.r);
        let s = U256::from_big_endian(&sig.s);
        let encoded = Bytes::from(self.encode(Some((v, r, s))));
        let mut secret_key = [0u8; 32];
        secret_key.copy_from_slice(&key.to_bytes());
        Ok(SignedTransaction {
            hash: keccak256(&encoded),
            tx: self,
            sender,
            secret_key: H256::from_bytes(secret_key),
            v,
            r,
            s,
            encoded,
        })
    }

    fn field_count(&self) -> usize {
        match self.tx_type {
            TxType::Legacy => 6,
            TxType::AccessList => 8,
            TxType::DynamicFee => 9,
            TxType::Blob => 11,
            TxType::SetCode => 10,
        }
    }

    /// Signing payload (`sig = None`) or network envelope
    fn encode(&self, sig: Option<(u64, U256, U256)>) -> Vec<u8> {
        let unsigned_legacy_155 = sig.is_none() && self.tx_type == TxType::Legacy && self.protected;
        let extra = if sig.is_some() || unsigned_legacy_155 { 3 } else { 0 };
        let mut s = RlpStream::new_list(self.field_count() + extra);

        if self.tx_type != TxType::Legacy {
            s.append(&self.chain_id);
        }
        s.append(&self.nonce);
        match self.tx_type {
            TxType::Legacy | TxType::AccessList => {
                s.append(&U256::from(self.gas_price));
            }
            _ => {
                s.append(&U256::from(self.max_priority_fee_per_gas));
                s.append(&U256::from(self.max_fee_per_gas));
            }
        }
        s.append(&self.gas_limit);
        utils::append_opt_address(&mut s, self.to.as_ref());
        s.append(&self.value);
        utils::append_bytes(&mut s, &self.data);
        if self.tx_type != TxType::Legacy {
            s.append_list::<AccessListItem, AccessListItem>(&self.access_list);
        }
        if self.tx_type == TxType::Blob {
            s.append(&U256::from(self.max_fee_per_blob_gas));
            utils::append_hash_list(&mut s, &self.blob_versioned_hashes);
        }
        if self.tx_type == TxType::SetCode {
            s.append_list::<Authorization, Authorization>(&self.authorization_list);
        }

        match sig {
            Some((v, r, sv)) => {
                s.append(&v);
                s.append(&r);
                s.append(&sv);
            }
            None if unsigned_legacy_155 => {
                s.append(&self.chain_id);
                s.append(&0u8);
                s.append(&0u8);
            }
            None => {}
        }

        let body = s.out().to_vec();
        if self.tx_type == TxType::Legacy {
            body
        } else {
            let mut out = Vec::with_capacity(body.len() + 1);
            out.push(self.tx_type.as_u8());
            out.extend_from_slice(&body);
            out
        }
    }
}

/// Signed transaction together with everything fixtures need to carry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Signed body
    pub tx: Transaction,
    /// Recovered sender
    pub sender: Address,
    /// Sender secret key
    pub secret_key: H256,
    /// `v` as encoded: EIP-155 value for legacy, parity for typed
    pub v: u64,
    /// Signature r
    pub r: U256,
    /// Signature s
    pub s: U256,
    /// keccak of the envelope
    pub hash: H256,
    /// EIP-2718 envelope (plain RLP list for legacy)
    pub encoded: Bytes,
}

impl SignedTransaction {
    /// Declared failure, if any
    pub fn expected_error(&self) -> Option<&ExpectedException> {
        self.tx.error.as_ref()
    }

    /// Signature as the crypto layer sees it
    pub fn signature(&self) -> Signature {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        self.r.to_big_endian(&mut r);
        self.s.to_big_endian(&mut s);
        let parity = match self.tx.tx_type {
            TxType::Legacy if self.v >= 35 => ((self.v - 35) % 2) as u8,
            TxType::Legacy => self.v.saturating_sub(27) as u8,
            _ => self.v as u8,
        };
        Signature::new(r, s, parity + 27)
    }

    /// Append as a block body item: legacy as a list, typed as a byte string
    pub fn append_to_block(&self, s: &mut RlpStream) {
        if self.tx.tx_type == TxType::Legacy {
            utils::append_encoded(s, &self.encoded);
        } else {
            utils::append_bytes(s, &self.encoded);
        }
    }
}

/// Fluent transaction builder. Unset fields take the filler defaults, and
/// the type is inferred from the fields set unless given explicitly.
#[derive(Debug, Clone, Default)]
pub struct TxBuilder {
    tx_type: Option<TxType>,
    nonce: Option<u64>,
    gas_limit: Option<u64>,
    gas_price: Option<u128>,
    max_fee_per_gas: Option<u128>,
    max_priority_fee_per_gas: Option<u128>,
    to: Option<Address>,
    value: U256,
    data: Bytes,
    access_list: Option<Vec<AccessListItem>>,
    max_fee_per_blob_gas: Option<u128>,
    blob_versioned_hashes: Option<Vec<H256>>,
    authorization_list: Option<Vec<Authorization>>,
    unprotected: bool,
    error: Option<ExpectedException>,
}

impl TxBuilder {
    /// Create a new transaction builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the envelope type
    pub fn tx_type(mut self, tx_type: TxType) -> Self {
        self.tx_type = Some(tx_type);
        self
    }

    /// Override the nonce; the sender's counter is left untouched
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Set the gas limit
    pub fn gas_limit(mut self, limit: u64) -> Self {
        self.gas_limit = Some(limit);
        self
    }

    /// Set the gas price
    pub fn gas_price(mut self, price: u128) -> Self {
        self.gas_price = Some(price);
        self
    }

    /// Set max fee per gas
    pub fn max_fee_per_gas(mut self, fee: u128) -> Self {
        self.max_fee_per_gas = Some(fee);
        self
    }

    /// Set max priority fee per gas
    pub fn max_priority_fee_per_gas(mut self, fee: u128) -> Self {
        self.max_priority_fee_per_gas = Some(fee);
        self
    }

    /// Set the recipient address; leave unset to create a contract
    pub fn to(mut self, address: Address) -> Self {
        self.to = Some(address);
        self
    }

    /// Set the value to transfer (in wei)
    pub fn value(mut self, value: impl Into<U256>) -> Self {
        self.value = value.into();
        self
    }

    /// Set the calldata or init code
    pub fn data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    /// Set the access list
    pub fn access_list(mut self, list: Vec<AccessListItem>) -> Self {
        self.access_list = Some(list);
        self
    }

    /// Set the blob fee cap
    pub fn max_fee_per_blob_gas(mut self, fee: u128) -> Self {
        self.max_fee_per_blob_gas = Some(fee);
        self
    }

    /// Set the blob versioned hashes
    pub fn blob_versioned_hashes(mut self, hashes: Vec<H256>) -> Self {
        self.blob_versioned_hashes = Some(hashes);
        self
    }

    /// Set the EIP-7702 authorization list
    pub fn authorization_list(mut self, list: Vec<Authorization>) -> Self {
        self.authorization_list = Some(list);
        self
    }

    /// Sign a legacy transaction without EIP-155 replay protection
    pub fn unprotected(mut self) -> Self {
        self.unprotected = true;
        self
    }

    /// Declare the failure the engine must report
    pub fn expect_error(mut self, error: impl Into<ExpectedException>) -> Self {
        self.error = Some(error.into());
        self
    }

    fn inferred_type(&self) -> TxType {
        if let Some(t) = self.tx_type {
            t
        } else if self.authorization_list.is_some() {
            TxType::SetCode
        } else if self.blob_versioned_hashes.is_some() || self.max_fee_per_blob_gas.is_some() {
            TxType::Blob
        } else if self.max_fee_per_gas.is_some() || self.max_priority_fee_per_gas.is_some() {
            TxType::DynamicFee
        } else if self.access_list.is_some() {
            TxType::AccessList
        } else {
            TxType::Legacy
        }
    }

    /// Assemble the unsigned transaction
    pub fn build_unsigned(self, nonce: u64, chain_id: u64) -> Result<Transaction, TxError> {
        let tx_type = self.inferred_type();
        let reject = |field| Err(TxError::UnsupportedField { tx_type, field });
        if tx_type != TxType::Legacy && self.unprotected {
            return reject("an unprotected signature");
        }
        if tx_type.has_dynamic_fee() && self.gas_price.is_some() {
            return reject("gas_price");
        }
        if !tx_type.has_dynamic_fee()
            && (self.max_fee_per_gas.is_some() || self.max_priority_fee_per_gas.is_some())
        {
            return reject("max_fee_per_gas");
        }
        if tx_type == TxType::Legacy && self.access_list.is_some() {
            return reject("access_list");
        }
        if tx_type != TxType::Blob
            && (self.blob_versioned_hashes.is_some() || self.max_fee_per_blob_gas.is_some())
        {
            return reject("blob fields");
        }
        if tx_type != TxType::SetCode && self.authorization_list.is_some() {
            return reject("authorization_list");
        }

        Ok(Transaction {
            tx_type,
            chain_id,
            nonce,
            gas_price: self.gas_price.unwrap_or(DEFAULT_GAS_PRICE),
            max_priority_fee_per_gas: self.max_priority_fee_per_gas.unwrap_or(0),
            max_fee_per_gas: self.max_fee_per_gas.unwrap_or(DEFAULT_MAX_FEE_PER_GAS),
            gas_limit: self.gas_limit.unwrap_or(DEFAULT_GAS_LIMIT),
            to: self.to,
            value: self.value,
            data: self.data,
            access_list: self.access_list.unwrap_or_default(),
            max_fee_per_blob_gas: self
                .max_fee_per_blob_gas
                .unwrap_or(DEFAULT_MAX_FEE_PER_BLOB_GAS),
            blob_versioned_hashes: self.blob_versioned_hashes.unwrap_or_default(),
            authorization_list: self.authorization_list.unwrap_or_default(),
            protected: !self.unprotected,
            error: self.error,
        })
    }

    /// Build and sign from `sender`, taking its next nonce unless one was
    /// set explicitly
    pub fn build(self, sender: &mut Eoa, chain_id: u64) -> Result<SignedTransaction, TxError> {
        let nonce = match self.nonce {
            Some(n) => n,
            None => sender
                .next_nonce()
                .ok_or(TxError::NonceOverflow(sender.address()))?,
        };
        self.build_unsigned(nonce, chain_id)?
            .sign(sender.private_key())
    }
}

/// Versioned hash with the KZG version byte and a deterministic body
pub fn versioned_hash(seed: u64) -> H256 {
    let mut bytes = *H256::from_low_u64(seed).as_bytes();
    bytes[0] = VERSIONED_HASH_VERSION_KZG;
    H256::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pre_alloc::PreAlloc;
    use tessera_crypto::private_key_from_bytes;
    use tessera_exceptions::TransactionException;

    fn sender() -> Eoa {
        PreAlloc::new().fund_eoa(None).unwrap()
    }

    #[test]
    fn test_builder_assigns_sequential_nonces() {
        let mut eoa = sender();
        let a = TxBuilder::new().to(Address::from_low_u64(1)).build(&mut eoa, 1).unwrap();
        let b = TxBuilder::new().to(Address::from_low_u64(1)).build(&mut eoa, 1).unwrap();
        assert_eq!(a.tx.nonce, 0);
        assert_eq!(b.tx.nonce, 1);
        assert_eq!(eoa.nonce(), 2);
    }

    #[test]
    fn test_explicit_nonce_leaves_counter() {
        let mut eoa = sender();
        let tx = TxBuilder::new().nonce(5).build(&mut eoa, 1).unwrap();
        assert_eq!(tx.tx.nonce, 5);
        assert_eq!(eoa.nonce(), 0);
    }

    #[test]
    fn test_type_inference() {
        let t = |b: TxBuilder| b.build_unsigned(0, 1).unwrap().tx_type;
        assert_eq!(t(TxBuilder::new()), TxType::Legacy);
        assert_eq!(t(TxBuilder::new().access_list(vec![])), TxType::AccessList);
        assert_eq!(t(TxBuilder::new().max_fee_per_gas(10)), TxType::DynamicFee);
        assert_eq!(t(TxBuilder::new().blob_versioned_hashes(vec![versioned_hash(1)])), TxType::Blob);
        assert_eq!(t(TxBuilder::new().authorization_list(vec![])), TxType::SetCode);
    }

    #[test]
    fn test_rejects_fields_the_type_cannot_carry() {
        let err = TxBuilder::new()
            .tx_type(TxType::Legacy)
            .max_fee_per_gas(1)
            .build_unsigned(0, 1)
            .unwrap_err();
        assert!(matches!(err, TxError::UnsupportedField { tx_type: TxType::Legacy, .. }));
        assert!(TxBuilder::new()
            .max_fee_per_gas(1)
            .gas_price(1)
            .build_unsigned(0, 1)
            .is_err());
    }

    #[test]
    fn test_sender_recovered_for_every_type() {
        let mut eoa = sender();
        let to = Address::from_low_u64(0x1000);
        let builders = vec![
            TxBuilder::new().to(to),
            TxBuilder::new().to(to).unprotected(),
            TxBuilder::new().to(to).access_list(vec![AccessListItem {
                address: to,
                storage_keys: vec![H256::ZERO],
            }]),
            TxBuilder::new().to(to).max_fee_per_gas(100).max_priority_fee_per_gas(1),
            TxBuilder::new().to(to).blob_versioned_hashes(vec![versioned_hash(1)]),
            TxBuilder::new().to(to).authorization_list(vec![Authorization::sign(
                1,
                to,
                0,
                eoa.private_key(),
            )
            .unwrap()]),
        ];
        for b in builders {
            let signed = b.build(&mut eoa, 1).unwrap();
            assert_eq!(signed.sender, eoa.address());
            let recovered = recover_address(&signed.tx.signing_hash(), &signed.signature()).unwrap();
            assert_eq!(recovered, eoa.address());
            assert_eq!(signed.hash, keccak256(&signed.encoded));
            if signed.tx.tx_type != TxType::Legacy {
                assert_eq!(signed.encoded[0], signed.tx.tx_type.as_u8());
            }
        }
    }

    #[test]
    fn test_legacy_v_values() {
        let mut eoa = sender();
        let protected = TxBuilder::new().build(&mut eoa, 1).unwrap();
        assert!(protected.v == 37 || protected.v == 38);
        let plain = TxBuilder::new().unprotected().build(&mut eoa, 1).unwrap();
        assert!(plain.v == 27 || plain.v == 28);
        let typed = TxBuilder::new().max_fee_per_gas(7).build(&mut eoa, 1).unwrap();
        assert!(typed.v <= 1);
    }

    #[test]
    fn test_eip155_example() {
        // Worked example from EIP-155
        let key = private_key_from_bytes(&[0x46; 32]).unwrap();
        let tx = Transaction {
            tx_type: TxType::Legacy,
            chain_id: 1,
            nonce: 9,
            gas_price: 20_000_000_000,
            max_priority_fee_per_gas: 0,
            max_fee_per_gas: 0,
            gas_limit: 21_000,
            to: Some(Address::from_hex("0x3535353535353535353535353535353535353535").unwrap()),
            value: U256::from(1_000_000_000_000_000_000u64),
            data: Bytes::new(),
            access_list: vec![],
            max_fee_per_blob_gas: 0,
            blob_versioned_hashes: vec![],
            authorization_list: vec![],
            protected: true,
            error: None,
        };
        assert_eq!(
            tx.signing_hash(),
            H256::from_hex("0xdaf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53").unwrap()
        );
        let signed = tx.sign(&key).unwrap();
        assert_eq!(signed.v, 37);
        assert_eq!(
            signed.encoded.to_hex(),
            "0xf86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
        );
    }

    #[test]
    fn test_declared_error_travels_with_tx() {
        let mut eoa = sender();
        let tx = TxBuilder::new()
            .gas_limit(20_999)
            .expect_error(TransactionException::IntrinsicGasTooLow)
            .build(&mut eoa, 1)
            .unwrap();
        assert!(tx
            .expected_error()
            .unwrap()
            .contains(&TransactionException::IntrinsicGasTooLow.into()));
    }

    #[test]
    fn test_intrinsic_input() {
        let tx = TxBuilder::new()
            .data(vec![0, 1, 2])
            .access_list(vec![AccessListItem {
                address: Address::ZERO,
                storage_keys: vec![H256::ZERO, H256::ZERO],
            }])
            .build_unsigned(0, 1)
            .unwrap();
        let input = tx.intrinsic_gas_input();
        assert!(input.contract_creation);
        assert_eq!(input.calldata.len(), 3);
        assert_eq!(input.access_list_addresses, 1);
        assert_eq!(input.access_list_storage_keys, 2);
    }

    #[test]
    fn test_authorization_signer() {
        let key = private_key_from_bytes(H256::from_low_u64(2).as_bytes()).unwrap();
        let auth = Authorization::sign(1, Address::from_low_u64(0x1000), 0, &key).unwrap();
        assert_eq!(auth.signer, tessera_crypto::address_of(&key));
        assert!(auth.y_parity <= 1);
    }
}
