//! EIP-2718 transaction types

use std::fmt;

/// Transaction envelope type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TxType {
    /// Untyped legacy transaction
    Legacy = 0,
    /// EIP-2930 access list transaction
    AccessList = 1,
    /// EIP-1559 dynamic fee transaction
    DynamicFee = 2,
    /// EIP-4844 blob transaction
    Blob = 3,
    /// EIP-7702 set-code transaction
    SetCode = 4,
}

impl TxType {
    /// Every known type
    pub const ALL: [TxType; 5] = [
        TxType::Legacy,
        TxType::AccessList,
        TxType::DynamicFee,
        TxType::Blob,
        TxType::SetCode,
    ];

    /// Type byte
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether the envelope carries EIP-1559 fee fields
    pub fn has_dynamic_fee(self) -> bool {
        self >= TxType::DynamicFee
    }
}

impl TryFrom<u8> for TxType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        TxType::ALL
            .iter()
            .copied()
            .find(|t| t.as_u8() == value)
            .ok_or(value)
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type {}", self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from() {
        assert_eq!(TxType::try_from(2), Ok(TxType::DynamicFee));
        assert_eq!(TxType::try_from(5), Err(5));
    }

    #[test]
    fn test_dynamic_fee() {
        assert!(!TxType::AccessList.has_dynamic_fee());
        assert!(TxType::Blob.has_dynamic_fee());
    }
}
