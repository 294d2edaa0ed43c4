//! Serde adapters for Ethereum JSON quantities.
//!
//! Quantities are rendered as minimal `0x` hex (`0x0` for zero). Decoding
//! accepts hex strings, decimal strings and plain JSON numbers, since
//! engines are not consistent about which they emit.

use serde::{de, Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    Str(String),
}

fn parse_u64(s: &str) -> Result<u64, String> {
    match s.strip_prefix("0x") {
        Some("") => Ok(0),
        Some(hex) => u64::from_str_radix(hex, 16).map_err(|e| e.to_string()),
        None => s.parse::<u64>().map_err(|e| e.to_string()),
    }
}

/// `u64` as a hex quantity.
pub mod quantity {
    use super::*;

    /// Serialize as `0x…`
    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{:x}", value))
    }

    /// Deserialize from hex, decimal string or number
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::Str(s) => parse_u64(&s).map_err(de::Error::custom),
        }
    }
}

/// `Option<u64>` as a hex quantity; `None` must be paired with
/// `skip_serializing_if = "Option::is_none"` and `default`.
pub mod opt_quantity {
    use super::*;

    /// Serialize `Some` as `0x…`
    pub fn serialize<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_str(&format!("0x{:x}", v)),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional quantity
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u64>, D::Error> {
        match Option::<NumberOrString>::deserialize(deserializer)? {
            None => Ok(None),
            Some(NumberOrString::Number(n)) => Ok(Some(n)),
            Some(NumberOrString::Str(s)) => parse_u64(&s).map(Some).map_err(de::Error::custom),
        }
    }
}

/// `U256` as a hex quantity. Leading zeros and 32-byte padded words are
/// both accepted on input.
pub mod u256 {
    use super::*;
    use crate::{u256_from_hex, U256};

    /// Serialize as minimal `0x…`
    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{:x}", value))
    }

    /// Deserialize from hex string or number
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(n) => Ok(U256::from(n)),
            NumberOrString::Str(s) if s.starts_with("0x") => {
                u256_from_hex(&s).map_err(de::Error::custom)
            }
            NumberOrString::Str(s) => U256::from_dec_str(&s).map_err(de::Error::custom),
        }
    }
}

/// `u128` fee values as hex quantities
pub mod u128_quantity {
    use super::*;

    /// Serialize as minimal `0x…`
    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{:x}", value))
    }

    /// Deserialize from hex string or number
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(n) => Ok(n as u128),
            NumberOrString::Str(s) => match s.strip_prefix("0x") {
                Some("") => Ok(0),
                Some(hex) => u128::from_str_radix(hex, 16).map_err(de::Error::custom),
                None => s.parse::<u128>().map_err(de::Error::custom),
            },
        }
    }
}

/// Fee or gas quantity that serializes as minimal hex, for use inside
/// `Option` and `Vec` where a `with` module cannot reach
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HexQuantity(pub u128);

impl serde::Serialize for HexQuantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        u128_quantity::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for HexQuantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u128_quantity::deserialize(deserializer).map(HexQuantity)
    }
}

impl From<u64> for HexQuantity {
    fn from(value: u64) -> Self {
        HexQuantity(value as u128)
    }
}

/// `U256` that serializes as minimal hex
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HexU256(pub crate::U256);

impl serde::Serialize for HexU256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        u256::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for HexU256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u256::deserialize(deserializer).map(HexU256)
    }
}

impl From<crate::U256> for HexU256 {
    fn from(value: crate::U256) -> Self {
        HexU256(value)
    }
}
