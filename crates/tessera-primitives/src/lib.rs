//! # tessera-primitives
//!
//! Value types every Tessera crate speaks in: 20-byte addresses,
//! 32-byte hashes, `U256` quantities and hex-encoded byte strings.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod bytes;
mod error;
mod fixed;
#[cfg(feature = "serde")]
pub mod serde_hex;

pub use bytes::Bytes;
pub use error::PrimitiveError;
pub use fixed::{Address, FixedBytesError, H256};
pub use primitive_types::U256;

/// Parse a hex quantity, `0x` optional. An empty quantity is zero.
pub fn u256_from_hex(s: &str) -> Result<U256, PrimitiveError> {
    match s.strip_prefix("0x").unwrap_or(s) {
        "" => Ok(U256::zero()),
        digits => U256::from_str_radix(digits, 16).map_err(|e| PrimitiveError::Quantity(e.to_string())),
    }
}

/// 32-byte big-endian storage word for `value`
pub fn u256_to_word(value: &U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantities() {
        assert_eq!(u256_from_hex("0x").unwrap(), U256::zero());
        assert_eq!(u256_from_hex("0x0").unwrap(), U256::zero());
        assert_eq!(
            u256_from_hex("0x3635c9adc5dea00000").unwrap(),
            U256::from(1_000_000_000_000_000_000_000u128)
        );
        assert_eq!(u256_from_hex("ff").unwrap(), U256::from(255u64));
        assert!(matches!(u256_from_hex("0xzz"), Err(PrimitiveError::Quantity(_))));
    }

    #[test]
    fn test_storage_word_is_left_padded() {
        let word = u256_to_word(&U256::from(0x0102u64));
        assert_eq!(&word[30..], &[0x01, 0x02]);
        assert!(word[..30].iter().all(|b| *b == 0));
    }
}
