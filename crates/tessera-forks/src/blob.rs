//! EIP-4844 blob gas economics

use tessera_primitives::U256;

/// Blob gas parameters of one fork
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobSchedule {
    /// Target blobs per block
    pub target_blobs_per_block: u64,
    /// Maximum blobs per block
    pub max_blobs_per_block: u64,
    /// Denominator of the blob base fee exponent
    pub base_fee_update_fraction: u64,
    /// Gas consumed per blob
    pub gas_per_blob: u64,
    /// Minimum blob base fee
    pub min_base_fee_per_blob_gas: u64,
}

impl BlobSchedule {
    /// EIP-4844 (Cancun)
    pub const CANCUN: BlobSchedule = BlobSchedule {
        target_blobs_per_block: 3,
        max_blobs_per_block: 6,
        base_fee_update_fraction: 3_338_477,
        gas_per_blob: 1 << 17,
        min_base_fee_per_blob_gas: 1,
    };

    /// EIP-7691 (Prague)
    pub const PRAGUE: BlobSchedule = BlobSchedule {
        target_blobs_per_block: 6,
        max_blobs_per_block: 9,
        base_fee_update_fraction: 5_007_716,
        gas_per_blob: 1 << 17,
        min_base_fee_per_blob_gas: 1,
    };

    /// Target blob gas per block
    pub fn target_blob_gas_per_block(&self) -> u64 {
        self.target_blobs_per_block * self.gas_per_blob
    }

    /// Maximum blob gas per block
    pub fn max_blob_gas_per_block(&self) -> u64 {
        self.max_blobs_per_block * self.gas_per_blob
    }

    /// Blob gas consumed by `blob_count` blobs
    pub fn blob_gas(&self, blob_count: u64) -> u64 {
        blob_count * self.gas_per_blob
    }

    /// Blob base fee for a block carrying `excess_blob_gas`
    pub fn blob_gas_price(&self, excess_blob_gas: u64) -> U256 {
        fake_exponential(
            U256::from(self.min_base_fee_per_blob_gas),
            U256::from(excess_blob_gas),
            U256::from(self.base_fee_update_fraction),
        )
    }

    /// Excess blob gas of a child block from its parent's header values
    pub fn excess_blob_gas(&self, parent_excess_blob_gas: u64, parent_blob_gas_used: u64) -> u64 {
        (parent_excess_blob_gas + parent_blob_gas_used)
            .saturating_sub(self.target_blob_gas_per_block())
    }
}

/// `factor * e ** (numerator / denominator)` by Taylor expansion, as
/// defined in EIP-4844
pub fn fake_exponential(factor: U256, numerator: U256, denominator: U256) -> U256 {
    if denominator.is_zero() {
        return U256::zero();
    }
    let mut i = U256::one();
    let mut output = U256::zero();
    let mut accum = factor.saturating_mul(denominator);
    while !accum.is_zero() {
        output = output.saturating_add(accum);
        accum = accum.saturating_mul(numerator) / denominator.saturating_mul(i);
        i += U256::one();
    }
    output / denominator
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_gas_limits() {
        assert_eq!(BlobSchedule::CANCUN.gas_per_blob, 131_072);
        assert_eq!(BlobSchedule::CANCUN.target_blob_gas_per_block(), 393_216);
        assert_eq!(BlobSchedule::CANCUN.max_blob_gas_per_block(), 786_432);
        assert_eq!(BlobSchedule::PRAGUE.max_blob_gas_per_block(), 1_179_648);
    }

    #[test]
    fn test_blob_gas_price() {
        let s = BlobSchedule::CANCUN;
        assert_eq!(s.blob_gas_price(0), U256::one());
        // e^1 rounds down to 2
        assert_eq!(s.blob_gas_price(3_338_477), U256::from(2u64));
        assert!(s.blob_gas_price(10 * 3_338_477) > U256::from(20_000u64));
    }

    #[test]
    fn test_excess_blob_gas() {
        let s = BlobSchedule::CANCUN;
        assert_eq!(s.excess_blob_gas(0, 0), 0);
        assert_eq!(s.excess_blob_gas(0, s.blob_gas(3)), 0);
        assert_eq!(s.excess_blob_gas(0, s.blob_gas(6)), s.blob_gas(3));
        assert_eq!(s.excess_blob_gas(s.blob_gas(1), 0), 0);
    }

    #[test]
    fn test_fake_exponential_identity() {
        assert_eq!(
            fake_exponential(U256::from(7u64), U256::zero(), U256::from(5u64)),
            U256::from(7u64)
        );
        assert_eq!(
            fake_exponential(U256::one(), U256::one(), U256::zero()),
            U256::zero()
        );
    }
}
