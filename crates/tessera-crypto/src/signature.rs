//! secp256k1 transaction signatures
//!
//! Signatures leave [`sign`] in low-s form with `v` of 27 or 28. Recovery
//! accepts any `v` whose low bit carries the parity, so callers can feed it
//! the raw `yParity` of a typed transaction as well.

use crate::{keccak256, CryptoError};
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use tessera_primitives::{Address, H256};

/// Public key
pub type PublicKey = VerifyingKey;

/// Private key
pub type PrivateKey = SigningKey;

/// Recoverable signature
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// r, big-endian
    pub r: [u8; 32],
    /// s, big-endian
    pub s: [u8; 32],
    /// 27 or 28
    pub v: u8,
}

impl Signature {
    /// Assemble from components
    pub fn new(r: [u8; 32], s: [u8; 32], v: u8) -> Self {
        Signature { r, s, v }
    }

    /// Parity bit, the `yParity` of typed transactions
    pub fn recovery_id(&self) -> u8 {
        self.v.checked_sub(27).unwrap_or(self.v)
    }

    /// r and s both lie in `[1, n)`
    pub fn is_in_range(&self) -> bool {
        self.to_ecdsa().is_ok()
    }

    /// s is at most `n / 2`
    pub fn is_low_s(&self) -> bool {
        self.to_ecdsa()
            .map(|sig| sig.normalize_s().is_none())
            .unwrap_or(false)
    }

    fn to_ecdsa(&self) -> Result<EcdsaSignature, CryptoError> {
        EcdsaSignature::from_scalars(self.r, self.s).map_err(|e| CryptoError::Recovery(e.to_string()))
    }
}

/// Load a private key from its 32 raw bytes
pub fn private_key_from_bytes(bytes: &[u8; 32]) -> Result<PrivateKey, CryptoError> {
    SigningKey::from_slice(bytes).map_err(|_| CryptoError::InvalidPrivateKey)
}

/// Sign a 32-byte digest
pub fn sign(digest: &H256, key: &PrivateKey) -> Result<Signature, CryptoError> {
    let (sig, parity) = key
        .sign_prehash_recoverable(digest.as_bytes())
        .map_err(|e| CryptoError::Signing(e.to_string()))?;
    // flipping s to n - s mirrors R, so the parity flips with it
    let (sig, parity) = match sig.normalize_s() {
        Some(low) => (low, RecoveryId::new(!parity.is_y_odd(), parity.is_x_reduced())),
        None => (sig, parity),
    };
    let (r, s) = sig.split_bytes();
    Ok(Signature {
        r: r.into(),
        s: s.into(),
        v: 27 + parity.to_byte(),
    })
}

/// Public key that produced `signature` over `digest`
pub fn recover_public_key(digest: &H256, signature: &Signature) -> Result<PublicKey, CryptoError> {
    let sig = signature.to_ecdsa()?;
    let parity = RecoveryId::from_byte(signature.recovery_id() & 1)
        .ok_or_else(|| CryptoError::Recovery(format!("parity {}", signature.v)))?;
    VerifyingKey::recover_from_prehash(digest.as_bytes(), &sig, parity)
        .map_err(|e| CryptoError::Recovery(e.to_string()))
}

/// Address that produced `signature` over `digest`
pub fn recover_address(digest: &H256, signature: &Signature) -> Result<Address, CryptoError> {
    recover_public_key(digest, signature).map(|key| public_key_to_address(&key))
}

/// Last 20 bytes of the keccak of the uncompressed point, tag byte dropped
pub fn public_key_to_address(key: &PublicKey) -> Address {
    let point = key.to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&digest.as_bytes()[12..]);
    Address::from_bytes(address)
}

/// Address controlled by `key`
pub fn address_of(key: &PrivateKey) -> Address {
    public_key_to_address(key.verifying_key())
}
