//! EIP-1559 base fee

/// Base fee market parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseFeeParams {
    /// Gas limit / gas target
    pub elasticity_multiplier: u64,
    /// Bounds the per-block base fee change to 1/denominator
    pub max_change_denominator: u64,
    /// Base fee of the first block of the fork
    pub initial_base_fee: u64,
}

impl BaseFeeParams {
    /// EIP-1559 (London)
    pub const LONDON: BaseFeeParams = BaseFeeParams {
        elasticity_multiplier: 2,
        max_change_denominator: 8,
        initial_base_fee: 1_000_000_000,
    };

    /// Base fee of the child of a block with the given values
    pub fn next_base_fee(
        &self,
        parent_gas_used: u64,
        parent_gas_limit: u64,
        parent_base_fee: u64,
    ) -> u64 {
        let target = parent_gas_limit / self.elasticity_multiplier;
        if target == 0 || parent_gas_used == target {
            return parent_base_fee;
        }
        let base = parent_base_fee as u128;
        let denom = self.max_change_denominator as u128;
        if parent_gas_used > target {
            let used_delta = (parent_gas_used - target) as u128;
            let delta = (base * used_delta / target as u128 / denom).max(1);
            u64::try_from(base + delta).unwrap_or(u64::MAX)
        } else {
            let used_delta = (target - parent_gas_used) as u128;
            let delta = base * used_delta / target as u128 / denom;
            (base - delta) as u64
        }
    }
}
