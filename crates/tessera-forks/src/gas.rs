//! Gas schedule and intrinsic gas

/// Named gas costs of one fork.
///
/// Costs introduced after Frontier are `Option`s: `None` means the fork
/// predates the rule, which is different from a zero cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasCosts {
    /// Base cost of every transaction
    pub tx_base: u64,
    /// Surcharge for contract creation transactions
    pub tx_create: u64,
    /// Per zero calldata byte
    pub tx_data_zero: u64,
    /// Per non-zero calldata byte
    pub tx_data_nonzero: u64,
    /// EIP-2930 per access list address
    pub tx_access_list_address: Option<u64>,
    /// EIP-2930 per access list storage key
    pub tx_access_list_storage_key: Option<u64>,
    /// EIP-3860 per 32-byte word of init code
    pub tx_initcode_word: Option<u64>,
    /// EIP-7623 standard cost per calldata token
    pub tx_data_standard_token: Option<u64>,
    /// EIP-7623 floor cost per calldata token
    pub tx_data_floor_token: Option<u64>,
    /// EIP-7702 cost per authorization tuple
    pub tx_authorization: Option<u64>,
    /// EIP-7702 refund when the authority already exists
    pub authorization_existing_refund: Option<u64>,

    /// Per word of memory expansion (linear part)
    pub memory: u64,
    /// Per word copied
    pub copy: u64,
    /// KECCAK256 base
    pub keccak: u64,
    /// KECCAK256 per word
    pub keccak_word: u64,
    /// EXP base
    pub exp: u64,
    /// EXP per exponent byte
    pub exp_byte: u64,
    /// SLOAD (pre-Berlin flat cost)
    pub sload: u64,
    /// BALANCE (pre-Berlin flat cost)
    pub balance: u64,
    /// EXTCODESIZE and EXTCODECOPY (pre-Berlin flat cost)
    pub extcode: u64,
    /// EXTCODEHASH (pre-Berlin flat cost)
    pub extcodehash: Option<u64>,
    /// CALL family base (pre-Berlin flat cost)
    pub call: u64,
    /// SELFDESTRUCT base
    pub selfdestruct: u64,
    /// SSTORE zero to non-zero
    pub sstore_set: u64,
    /// SSTORE non-zero to non-zero
    pub sstore_reset: u64,
    /// Refund for clearing a slot
    pub sstore_clear_refund: u64,
    /// CREATE and CREATE2 base
    pub create: u64,
    /// Per byte of deployed code
    pub code_deposit_byte: u64,
    /// LOG base
    pub log: u64,
    /// LOG per topic
    pub log_topic: u64,
    /// LOG per data byte
    pub log_data: u64,
    /// BLOCKHASH
    pub blockhash: u64,
    /// Value transfer surcharge on CALL
    pub call_value: u64,
    /// Stipend passed with a value transfer
    pub call_stipend: u64,
    /// New account surcharge
    pub new_account: u64,
    /// EIP-2929 warm storage/account access
    pub warm_access: Option<u64>,
    /// EIP-2929 cold account access
    pub cold_account_access: Option<u64>,
    /// EIP-2929 cold SLOAD
    pub cold_sload: Option<u64>,
}

impl GasCosts {
    /// Frontier schedule, the root every later fork patches
    pub const FRONTIER: GasCosts = GasCosts {
        tx_base: 21_000,
        tx_create: 0,
        tx_data_zero: 4,
        tx_data_nonzero: 68,
        tx_access_list_address: None,
        tx_access_list_storage_key: None,
        tx_initcode_word: None,
        tx_data_standard_token: None,
        tx_data_floor_token: None,
        tx_authorization: None,
        authorization_existing_refund: None,
        memory: 3,
        copy: 3,
        keccak: 30,
        keccak_word: 6,
        exp: 10,
        exp_byte: 10,
        sload: 50,
        balance: 20,
        extcode: 20,
        extcodehash: None,
        call: 40,
        selfdestruct: 0,
        sstore_set: 20_000,
        sstore_reset: 5_000,
        sstore_clear_refund: 15_000,
        create: 32_000,
        code_deposit_byte: 200,
        log: 375,
        log_topic: 375,
        log_data: 8,
        blockhash: 20,
        call_value: 9_000,
        call_stipend: 2_300,
        new_account: 25_000,
        warm_access: None,
        cold_account_access: None,
        cold_sload: None,
    };

    /// Memory expansion cost from `current_bytes` to `new_bytes`:
    /// `3·words + words²/512`, charged on the difference.
    pub fn memory_expansion(&self, current_bytes: u64, new_bytes: u64) -> u64 {
        if new_bytes <= current_bytes {
            return 0;
        }
        let cost = |bytes: u64| {
            let words = bytes.div_ceil(32) as u128;
            self.memory as u128 * words + words * words / 512
        };
        let delta = cost(new_bytes) - cost(current_bytes);
        u64::try_from(delta).unwrap_or(u64::MAX)
    }
}

/// Shape of a transaction, as far as intrinsic gas is concerned
#[derive(Debug, Clone, Copy, Default)]
pub struct IntrinsicGasInput<'a> {
    /// Calldata or init code
    pub calldata: &'a [u8],
    /// `to` is empty
    pub contract_creation: bool,
    /// Number of access list entries
    pub access_list_addresses: u64,
    /// Total storage keys over all access list entries
    pub access_list_storage_keys: u64,
    /// Number of EIP-7702 authorizations
    pub authorizations: u64,
}

/// Intrinsic gas split into the execution-independent cost and the
/// EIP-7623 calldata floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntrinsicGas {
    /// Cost charged before execution
    pub regular: u64,
    /// Minimum total gas the transaction is billed, if the fork has a floor
    pub floor: Option<u64>,
}

impl IntrinsicGas {
    /// Minimum gas limit a valid transaction must carry
    pub fn required(&self) -> u64 {
        self.floor.map_or(self.regular, |f| f.max(self.regular))
    }
}

impl GasCosts {
    /// Intrinsic gas of a transaction under this schedule
    pub fn intrinsic_gas(&self, input: &IntrinsicGasInput<'_>) -> IntrinsicGas {
        let zero_bytes = input.calldata.iter().filter(|b| **b == 0).count() as u64;
        let nonzero_bytes = input.calldata.len() as u64 - zero_bytes;

        let data_cost = match self.tx_data_standard_token {
            Some(per_token) => calldata_tokens(zero_bytes, nonzero_bytes) * per_token,
            None => zero_bytes * self.tx_data_zero + nonzero_bytes * self.tx_data_nonzero,
        };

        let mut regular = self.tx_base + data_cost;
        if input.contract_creation {
            regular += self.tx_create;
            if let Some(per_word) = self.tx_initcode_word {
                regular += per_word * (input.calldata.len() as u64).div_ceil(32);
            }
        }
        if let Some(per_address) = self.tx_access_list_address {
            regular += per_address * input.access_list_addresses;
        }
        if let Some(per_key) = self.tx_access_list_storage_key {
            regular += per_key * input.access_list_storage_keys;
        }
        if let Some(per_auth) = self.tx_authorization {
            regular += per_auth * input.authorizations;
        }

        let floor = self
            .tx_data_floor_token
            .map(|per_token| self.tx_base + calldata_tokens(zero_bytes, nonzero_bytes) * per_token);

        IntrinsicGas { regular, floor }
    }
}

/// EIP-7623 token count: zero bytes count once, non-zero bytes four times
fn calldata_tokens(zero_bytes: u64, nonzero_bytes: u64) -> u64 {
    zero_bytes + nonzero_bytes * 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_expansion() {
        let g = GasCosts::FRONTIER;
        assert_eq!(g.memory_expansion(32, 32), 0);
        assert_eq!(g.memory_expansion(64, 32), 0);
        assert_eq!(g.memory_expansion(0, 32), 3);
        assert_eq!(g.memory_expansion(0, 33), 6);
        // 1024 words: 3*1024 + 1024*1024/512
        assert_eq!(g.memory_expansion(0, 32 * 1024), 3 * 1024 + 2048);
        assert_eq!(
            g.memory_expansion(32, 64),
            g.memory_expansion(0, 64) - g.memory_expansion(0, 32)
        );
    }

    #[test]
    fn test_frontier_intrinsic() {
        let g = GasCosts::FRONTIER;
        let data = [0u8, 1, 0, 2];
        let ig = g.intrinsic_gas(&IntrinsicGasInput {
            calldata: &data,
            ..Default::default()
        });
        assert_eq!(ig.regular, 21_000 + 2 * 4 + 2 * 68);
        assert_eq!(ig.floor, None);
        assert_eq!(ig.required(), ig.regular);
    }

    #[test]
    fn test_required_is_max_of_floor_and_regular() {
        let ig = IntrinsicGas { regular: 30_000, floor: Some(40_000) };
        assert_eq!(ig.required(), 40_000);
        let ig = IntrinsicGas { regular: 50_000, floor: Some(40_000) };
        assert_eq!(ig.required(), 50_000);
    }
}
