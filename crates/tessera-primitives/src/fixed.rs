//! Fixed-width byte strings: 20-byte addresses and 32-byte hashes.
//!
//! Both render as lowercase `0x` hex and order byte-wise, so maps keyed
//! by them iterate the same way on every run.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A fixed-width value could not be parsed
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FixedBytesError {
    /// Not hex
    #[error("invalid hex string: {0}")]
    InvalidHex(String),
    /// Wrong number of bytes
    #[error("expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Required length
        expected: usize,
        /// Supplied length
        got: usize,
    },
}

fn decode_exact<const N: usize>(s: &str) -> Result<[u8; N], FixedBytesError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(digits).map_err(|e| FixedBytesError::InvalidHex(e.to_string()))?;
    copy_exact(&bytes)
}

fn copy_exact<const N: usize>(slice: &[u8]) -> Result<[u8; N], FixedBytesError> {
    <[u8; N]>::try_from(slice).map_err(|_| FixedBytesError::InvalidLength {
        expected: N,
        got: slice.len(),
    })
}

macro_rules! fixed_bytes {
    ($(#[$doc:meta])* $name:ident, $len:expr) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
        pub struct $name([u8; $len]);

        impl $name {
            /// Width in bytes
            pub const LEN: usize = $len;

            /// All zeros
            pub const ZERO: $name = $name([0u8; $len]);

            /// Wrap raw bytes
            pub const fn from_bytes(bytes: [u8; $len]) -> Self {
                $name(bytes)
            }

            /// Copy from a slice of exactly [`Self::LEN`] bytes
            pub fn from_slice(slice: &[u8]) -> Result<Self, FixedBytesError> {
                copy_exact(slice).map($name)
            }

            /// Parse hex, with or without `0x`
            pub fn from_hex(s: &str) -> Result<Self, FixedBytesError> {
                decode_exact(s).map($name)
            }

            /// Value whose trailing 8 bytes hold `value` big-endian
            pub fn from_low_u64(value: u64) -> Self {
                let mut bytes = [0u8; $len];
                bytes[$len - 8..].copy_from_slice(&value.to_be_bytes());
                $name(bytes)
            }

            /// Raw bytes
            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// True if every byte is zero
            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; $len]
            }

            /// Lowercase `0x` hex
            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl FromStr for $name {
            type Err = FixedBytesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                $name(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        #[cfg(feature = "rlp")]
        impl rlp::Encodable for $name {
            fn rlp_append(&self, s: &mut rlp::RlpStream) {
                s.encoder().encode_value(&self.0);
            }
        }

        #[cfg(feature = "rlp")]
        impl rlp::Decodable for $name {
            fn decode(rlp: &rlp::Rlp) -> Result<Self, rlp::DecoderError> {
                rlp.decoder().decode_value(|bytes| {
                    copy_exact(bytes)
                        .map($name)
                        .map_err(|_| rlp::DecoderError::RlpInvalidLength)
                })
            }
        }

        #[cfg(feature = "serde")]
        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        #[cfg(feature = "serde")]
        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                $name::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

fixed_bytes!(
    /// 20-byte account address
    Address,
    20
);

fixed_bytes!(
    /// 32-byte hash or storage word
    H256,
    32
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_and_without_prefix() {
        let a = Address::from_hex("0x742d35Cc6634C0532925a3b844Bc9e7595f0aB3d").unwrap();
        let b: Address = "742d35cc6634c0532925a3b844bc9e7595f0ab3d".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "0x742d35cc6634c0532925a3b844bc9e7595f0ab3d");
        assert_eq!(
            format!("{:?}", a),
            "Address(0x742d35cc6634c0532925a3b844bc9e7595f0ab3d)"
        );
    }

    #[test]
    fn test_low_u64_fills_the_tail() {
        assert_eq!(
            Address::from_low_u64(0x1000).to_hex(),
            "0x0000000000000000000000000000000000001000"
        );
        let h = H256::from_low_u64(1);
        assert_eq!(h.as_bytes()[31], 1);
        assert!(!h.is_zero());
        assert!(H256::ZERO.is_zero());
        assert_eq!(H256::default(), H256::ZERO);
    }

    #[test]
    fn test_length_and_hex_errors() {
        assert_eq!(
            Address::from_hex("0x"),
            Err(FixedBytesError::InvalidLength { expected: 20, got: 0 })
        );
        assert_eq!(
            H256::from_slice(&[0u8; 31]),
            Err(FixedBytesError::InvalidLength { expected: 32, got: 31 })
        );
        assert!(matches!(
            H256::from_hex("0xzz"),
            Err(FixedBytesError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_ordering_is_bytewise() {
        let a = Address::from_low_u64(0x1000);
        let b = Address::from_low_u64(0x1100);
        let c = Address::from_bytes([0xff; 20]);
        assert!(a < b && b < c);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_as_hex_string() {
        let addr = Address::from_low_u64(0xabc);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x0000000000000000000000000000000000000abc\"");
        assert_eq!(serde_json::from_str::<Address>(&json).unwrap(), addr);
        assert!(serde_json::from_str::<H256>(&json).is_err());
    }

    #[cfg(feature = "rlp")]
    #[test]
    fn test_rlp_rejects_wrong_width() {
        let encoded = rlp::encode(&Address::from_low_u64(7));
        assert_eq!(encoded.len(), 21);
        assert!(rlp::decode::<H256>(&encoded).is_err());
        assert_eq!(rlp::decode::<Address>(&encoded).unwrap(), Address::from_low_u64(7));
    }
}
