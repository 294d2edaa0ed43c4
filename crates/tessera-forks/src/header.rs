//! Optional block header fields

use std::fmt;

/// A header field that only exists from some fork onward.
///
/// A fork's [`crate::Fork::header_fields`] set is exact: every field in
/// it is required, every other optional field is forbidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HeaderField {
    /// EIP-1559 (London)
    BaseFeePerGas,
    /// EIP-4895 (Shanghai)
    WithdrawalsRoot,
    /// EIP-4844 (Cancun)
    BlobGasUsed,
    /// EIP-4844 (Cancun)
    ExcessBlobGas,
    /// EIP-4788 (Cancun)
    ParentBeaconBlockRoot,
    /// EIP-7685 (Prague)
    RequestsHash,
}

impl HeaderField {
    /// Every optional field in RLP order
    pub const ALL: [HeaderField; 6] = [
        HeaderField::BaseFeePerGas,
        HeaderField::WithdrawalsRoot,
        HeaderField::BlobGasUsed,
        HeaderField::ExcessBlobGas,
        HeaderField::ParentBeaconBlockRoot,
        HeaderField::RequestsHash,
    ];

    /// JSON field name used in fixtures
    pub fn json_name(self) -> &'static str {
        match self {
            HeaderField::BaseFeePerGas => "baseFeePerGas",
            HeaderField::WithdrawalsRoot => "withdrawalsRoot",
            HeaderField::BlobGasUsed => "blobGasUsed",
            HeaderField::ExcessBlobGas => "excessBlobGas",
            HeaderField::ParentBeaconBlockRoot => "parentBeaconBlockRoot",
            HeaderField::RequestsHash => "requestsHash",
        }
    }
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.json_name())
    }
}
