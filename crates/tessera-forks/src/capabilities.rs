//! Capability queries.
//!
//! Every query starts from the parent fork's answer and applies only the
//! changes the fork itself introduced. Frontier is the root.

use std::collections::BTreeSet;

use tessera_primitives::Address;

use crate::{
    BaseFeeParams, BlobSchedule, Fork, GasCosts, HeaderField, IntrinsicGas, IntrinsicGasInput,
    Opcode, SystemContract, TxType, UnsupportedCapability,
};

/// Maximum deployed code size (EIP-170)
const MAX_CODE_SIZE: usize = 0x6000;

/// Maximum init code size (EIP-3860)
const MAX_INITCODE_SIZE: usize = 2 * MAX_CODE_SIZE;

/// Maximum header extra data
const MAX_EXTRA_DATA_SIZE: usize = 32;

impl Fork {
    fn unsupported(self, capability: &'static str) -> UnsupportedCapability {
        UnsupportedCapability {
            fork: self,
            capability,
        }
    }

    /// Opcodes this fork introduces
    fn introduced_opcodes(self) -> &'static [Opcode] {
        use Opcode::*;
        match self {
            Fork::Homestead => &[DELEGATECALL],
            Fork::Byzantium => &[REVERT, RETURNDATASIZE, RETURNDATACOPY, STATICCALL],
            Fork::Constantinople => &[SHL, SHR, SAR, EXTCODEHASH, CREATE2],
            Fork::Istanbul => &[CHAINID, SELFBALANCE],
            Fork::London => &[BASEFEE],
            Fork::Shanghai => &[PUSH0],
            Fork::Cancun => &[TLOAD, TSTORE, MCOPY, BLOBHASH, BLOBBASEFEE],
            _ => &[],
        }
    }

    /// Opcodes this fork removes relative to its parent. Removal is only
    /// ever expressed here, never by omission.
    pub fn deprecated_opcodes(self) -> &'static [Opcode] {
        &[]
    }

    /// Valid opcode set
    pub fn valid_opcodes(self) -> BTreeSet<Opcode> {
        let mut set = match self.parent() {
            Some(parent) => parent.valid_opcodes(),
            None => {
                let later: BTreeSet<Opcode> = Fork::ALL
                    .iter()
                    .flat_map(|f| f.introduced_opcodes().iter().copied())
                    .collect();
                Opcode::ALL
                    .iter()
                    .copied()
                    .filter(|op| !later.contains(op))
                    .collect()
            }
        };
        set.extend(self.introduced_opcodes().iter().copied());
        for op in self.deprecated_opcodes() {
            set.remove(op);
        }
        set
    }

    /// Whether `op` may appear in executed code
    pub fn is_opcode_valid(self, op: Opcode) -> bool {
        self.valid_opcodes().contains(&op)
    }

    /// Supported transaction types
    pub fn tx_types(self) -> BTreeSet<TxType> {
        let mut set = match self.parent() {
            Some(parent) => parent.tx_types(),
            None => BTreeSet::from([TxType::Legacy]),
        };
        match self {
            Fork::Berlin => {
                set.insert(TxType::AccessList);
            }
            Fork::London => {
                set.insert(TxType::DynamicFee);
            }
            Fork::Cancun => {
                set.insert(TxType::Blob);
            }
            Fork::Prague => {
                set.insert(TxType::SetCode);
            }
            _ => {}
        }
        set
    }

    /// Transaction types that may have an empty `to`
    pub fn contract_creating_tx_types(self) -> BTreeSet<TxType> {
        self.tx_types()
            .into_iter()
            .filter(|t| matches!(t, TxType::Legacy | TxType::AccessList | TxType::DynamicFee))
            .collect()
    }

    /// Gas schedule
    pub fn gas_costs(self) -> GasCosts {
        let mut g = match self.parent() {
            Some(parent) => parent.gas_costs(),
            None => return GasCosts::FRONTIER,
        };
        match self {
            Fork::Homestead => {
                g.tx_create = 32_000;
            }
            Fork::TangerineWhistle => {
                g.sload = 200;
                g.balance = 400;
                g.extcode = 700;
                g.call = 700;
                g.selfdestruct = 5_000;
            }
            Fork::SpuriousDragon => {
                g.exp_byte = 50;
            }
            Fork::Constantinople => {
                g.extcodehash = Some(400);
            }
            Fork::Istanbul => {
                g.tx_data_nonzero = 16;
                g.sload = 800;
                g.balance = 700;
                g.extcodehash = Some(700);
            }
            Fork::Berlin => {
                g.warm_access = Some(100);
                g.cold_account_access = Some(2_600);
                g.cold_sload = Some(2_100);
                g.tx_access_list_address = Some(2_400);
                g.tx_access_list_storage_key = Some(1_900);
                g.sstore_reset = 5_000 - 2_100;
            }
            Fork::London => {
                g.sstore_clear_refund = 4_800;
            }
            Fork::Shanghai => {
                g.tx_initcode_word = Some(2);
            }
            Fork::Prague => {
                g.tx_data_standard_token = Some(4);
                g.tx_data_floor_token = Some(10);
                g.tx_authorization = Some(25_000);
                g.authorization_existing_refund = Some(12_500);
            }
            _ => {}
        }
        g
    }

    /// Intrinsic gas of a transaction of the given shape
    pub fn intrinsic_gas(self, input: &IntrinsicGasInput<'_>) -> IntrinsicGas {
        self.gas_costs().intrinsic_gas(input)
    }

    /// Memory expansion gas from `current_bytes` to `new_bytes`
    pub fn memory_expansion_gas(self, current_bytes: u64, new_bytes: u64) -> u64 {
        self.gas_costs().memory_expansion(current_bytes, new_bytes)
    }

    /// Blob gas parameters
    pub fn blob_schedule(self) -> Result<BlobSchedule, UnsupportedCapability> {
        match self {
            Fork::Cancun => Ok(BlobSchedule::CANCUN),
            Fork::Prague => Ok(BlobSchedule::PRAGUE),
            other => match other.parent() {
                Some(parent) if other > Fork::Cancun => parent.blob_schedule(),
                _ => Err(other.unsupported("blob gas")),
            },
        }
    }

    /// EIP-1559 parameters
    pub fn base_fee_params(self) -> Result<BaseFeeParams, UnsupportedCapability> {
        if self >= Fork::London {
            Ok(BaseFeeParams::LONDON)
        } else {
            Err(self.unsupported("base fee"))
        }
    }

    /// Optional header fields this fork requires; the rest are forbidden
    pub fn header_fields(self) -> BTreeSet<HeaderField> {
        let mut set = match self.parent() {
            Some(parent) => parent.header_fields(),
            None => BTreeSet::new(),
        };
        match self {
            Fork::London => {
                set.insert(HeaderField::BaseFeePerGas);
            }
            Fork::Shanghai => {
                set.insert(HeaderField::WithdrawalsRoot);
            }
            Fork::Cancun => {
                set.extend([
                    HeaderField::BlobGasUsed,
                    HeaderField::ExcessBlobGas,
                    HeaderField::ParentBeaconBlockRoot,
                ]);
            }
            Fork::Prague => {
                set.insert(HeaderField::RequestsHash);
            }
            _ => {}
        }
        set
    }

    /// Whether headers must carry zero difficulty and a prevrandao value
    pub fn requires_zero_difficulty(self) -> bool {
        self >= Fork::Paris
    }

    /// Whether the miner is rewarded by the protocol
    pub fn block_reward(self) -> Option<u64> {
        const ETHER: u64 = 1_000_000_000_000_000_000;
        match self {
            f if f >= Fork::Paris => None,
            f if f >= Fork::Constantinople => Some(2 * ETHER),
            f if f >= Fork::Byzantium => Some(3 * ETHER),
            _ => Some(5 * ETHER),
        }
    }

    /// Precompile addresses
    pub fn precompiles(self) -> BTreeSet<Address> {
        let mut set = match self.parent() {
            Some(parent) => parent.precompiles(),
            None => (0x01..=0x04).map(Address::from_low_u64).collect(),
        };
        let added: std::ops::RangeInclusive<u64> = match self {
            // modexp, bn254 add/mul/pairing
            Fork::Byzantium => 0x05..=0x08,
            // blake2f
            Fork::Istanbul => 0x09..=0x09,
            // point evaluation
            Fork::Cancun => 0x0a..=0x0a,
            // BLS12-381
            Fork::Prague => 0x0b..=0x11,
            _ => return set,
        };
        set.extend(added.map(Address::from_low_u64));
        set
    }

    /// System contracts that must be deployed for this fork
    pub fn system_contracts(self) -> Vec<SystemContract> {
        let mut list = match self.parent() {
            Some(parent) => parent.system_contracts(),
            None => Vec::new(),
        };
        match self {
            Fork::Cancun => list.push(SystemContract::BEACON_ROOTS),
            Fork::Prague => list.push(SystemContract::HISTORY_STORAGE),
            _ => {}
        }
        list
    }

    /// Maximum deployed code size
    pub fn max_code_size(self) -> Result<usize, UnsupportedCapability> {
        if self >= Fork::SpuriousDragon {
            Ok(MAX_CODE_SIZE)
        } else {
            Err(self.unsupported("code size limit"))
        }
    }

    /// Maximum init code size
    pub fn max_initcode_size(self) -> Result<usize, UnsupportedCapability> {
        if self >= Fork::Shanghai {
            Ok(MAX_INITCODE_SIZE)
        } else {
            Err(self.unsupported("init code size limit"))
        }
    }

    /// Maximum header extra data length
    pub fn max_extra_data_size(self) -> usize {
        MAX_EXTRA_DATA_SIZE
    }

    /// Whether EIP-155 replay protection is available
    pub fn supports_chain_id(self) -> bool {
        self >= Fork::SpuriousDragon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Opcodes ====================

    #[test]
    fn test_opcode_introductions() {
        assert!(!Fork::Frontier.is_opcode_valid(Opcode::DELEGATECALL));
        assert!(Fork::Homestead.is_opcode_valid(Opcode::DELEGATECALL));
        assert!(!Fork::Petersburg.is_opcode_valid(Opcode::CHAINID));
        assert!(Fork::Istanbul.is_opcode_valid(Opcode::CHAINID));
        assert!(!Fork::Paris.is_opcode_valid(Opcode::PUSH0));
        assert!(Fork::Shanghai.is_opcode_valid(Opcode::PUSH0));
        assert!(!Fork::Shanghai.is_opcode_valid(Opcode::BLOBHASH));
        assert!(Fork::Cancun.is_opcode_valid(Opcode::MCOPY));
        assert!(Fork::Frontier.is_opcode_valid(Opcode::PREVRANDAO));
        assert!(Fork::Frontier.is_opcode_valid(Opcode::SELFDESTRUCT));
    }

    #[test]
    fn test_prague_adds_no_opcodes() {
        assert_eq!(Fork::Prague.valid_opcodes(), Fork::Cancun.valid_opcodes());
    }

    #[test]
    fn test_frontier_excludes_every_later_opcode() {
        let frontier = Fork::Frontier.valid_opcodes();
        for f in Fork::ALL {
            for op in f.introduced_opcodes() {
                assert!(!frontier.contains(op), "{:?} valid in Frontier", op);
            }
        }
    }

    // ==================== Transaction types ====================

    #[test]
    fn test_tx_types() {
        assert_eq!(Fork::Istanbul.tx_types(), BTreeSet::from([TxType::Legacy]));
        assert!(Fork::Berlin.tx_types().contains(&TxType::AccessList));
        assert!(!Fork::Berlin.tx_types().contains(&TxType::DynamicFee));
        assert!(Fork::Cancun.tx_types().contains(&TxType::Blob));
        assert_eq!(Fork::Prague.tx_types().len(), 5);
    }

    #[test]
    fn test_contract_creating_tx_types() {
        assert_eq!(
            Fork::Prague.contract_creating_tx_types(),
            BTreeSet::from([TxType::Legacy, TxType::AccessList, TxType::DynamicFee])
        );
        assert_eq!(
            Fork::Frontier.contract_creating_tx_types(),
            BTreeSet::from([TxType::Legacy])
        );
    }

    // ==================== Gas ====================

    #[test]
    fn test_gas_deltas() {
        assert_eq!(Fork::Frontier.gas_costs().tx_data_nonzero, 68);
        assert_eq!(Fork::Istanbul.gas_costs().tx_data_nonzero, 16);
        assert_eq!(Fork::Berlin.gas_costs().sstore_reset, 2_900);
        assert_eq!(Fork::London.gas_costs().sstore_clear_refund, 4_800);
        assert_eq!(Fork::Berlin.gas_costs().cold_sload, Some(2_100));
        assert_eq!(Fork::Istanbul.gas_costs().cold_sload, None);
        assert_eq!(Fork::Prague.gas_costs().tx_initcode_word, Some(2));
    }

    #[test]
    fn test_intrinsic_gas_simple_transfer() {
        for f in Fork::ALL {
            let ig = f.intrinsic_gas(&IntrinsicGasInput::default());
            assert_eq!(ig.required(), 21_000, "{}", f);
        }
    }

    #[test]
    fn test_intrinsic_gas_creation() {
        let code = [0x60u8; 33];
        let input = IntrinsicGasInput {
            calldata: &code,
            contract_creation: true,
            ..Default::default()
        };
        assert_eq!(Fork::Frontier.intrinsic_gas(&input).regular, 21_000 + 33 * 68);
        assert_eq!(Fork::Homestead.intrinsic_gas(&input).regular, 53_000 + 33 * 68);
        assert_eq!(Fork::Paris.intrinsic_gas(&input).regular, 53_000 + 33 * 16);
        assert_eq!(
            Fork::Shanghai.intrinsic_gas(&input).regular,
            53_000 + 33 * 16 + 2 * 2
        );
    }

    #[test]
    fn test_intrinsic_gas_access_list_and_auth() {
        let input = IntrinsicGasInput {
            access_list_addresses: 2,
            access_list_storage_keys: 3,
            authorizations: 1,
            ..Default::default()
        };
        assert_eq!(Fork::Istanbul.intrinsic_gas(&input).regular, 21_000);
        assert_eq!(
            Fork::Berlin.intrinsic_gas(&input).regular,
            21_000 + 2 * 2_400 + 3 * 1_900
        );
        assert_eq!(
            Fork::Prague.intrinsic_gas(&input).regular,
            21_000 + 2 * 2_400 + 3 * 1_900 + 25_000
        );
    }

    #[test]
    fn test_calldata_floor() {
        let data = vec![0xffu8; 1_000];
        let input = IntrinsicGasInput {
            calldata: &data,
            ..Default::default()
        };
        let cancun = Fork::Cancun.intrinsic_gas(&input);
        let prague = Fork::Prague.intrinsic_gas(&input);
        assert_eq!(cancun.floor, None);
        assert_eq!(prague.regular, cancun.regular);
        assert_eq!(prague.floor, Some(21_000 + 4_000 * 10));
        assert_eq!(prague.required(), 61_000);
    }

    #[test]
    fn test_memory_expansion_gas() {
        assert_eq!(Fork::Cancun.memory_expansion_gas(0, 32), 3);
    }

    // ==================== Blobs, fees, headers ====================

    #[test]
    fn test_blob_schedule_unsupported_before_cancun() {
        assert_eq!(
            Fork::Shanghai.blob_schedule(),
            Err(UnsupportedCapability {
                fork: Fork::Shanghai,
                capability: "blob gas"
            })
        );
        assert_eq!(Fork::Cancun.blob_schedule(), Ok(BlobSchedule::CANCUN));
        assert_eq!(Fork::Prague.blob_schedule().unwrap().max_blobs_per_block, 9);
    }

    #[test]
    fn test_base_fee_params() {
        assert!(Fork::Berlin.base_fee_params().is_err());
        assert_eq!(Fork::London.base_fee_params().unwrap().initial_base_fee, 1_000_000_000);
    }

    #[test]
    fn test_header_fields() {
        assert!(Fork::Berlin.header_fields().is_empty());
        assert_eq!(
            Fork::London.header_fields(),
            BTreeSet::from([HeaderField::BaseFeePerGas])
        );
        assert!(Fork::Shanghai.header_fields().contains(&HeaderField::WithdrawalsRoot));
        assert_eq!(Fork::Cancun.header_fields().len(), 5);
        assert_eq!(Fork::Prague.header_fields().len(), HeaderField::ALL.len());
        assert!(Fork::Paris.requires_zero_difficulty());
        assert!(!Fork::London.requires_zero_difficulty());
    }

    // ==================== Precompiles and system contracts ====================

    #[test]
    fn test_precompiles() {
        assert_eq!(Fork::Frontier.precompiles().len(), 4);
        assert_eq!(Fork::Byzantium.precompiles().len(), 8);
        assert_eq!(Fork::Istanbul.precompiles().len(), 9);
        assert_eq!(Fork::Cancun.precompiles().len(), 10);
        assert_eq!(Fork::Prague.precompiles().len(), 17);
        assert!(Fork::Prague.precompiles().contains(&Address::from_low_u64(0x11)));
    }

    #[test]
    fn test_system_contracts() {
        assert!(Fork::Shanghai.system_contracts().is_empty());
        assert_eq!(Fork::Cancun.system_contracts(), vec![SystemContract::BEACON_ROOTS]);
        assert_eq!(
            Fork::Prague.system_contracts(),
            vec![SystemContract::BEACON_ROOTS, SystemContract::HISTORY_STORAGE]
        );
    }

    #[test]
    fn test_size_limits() {
        assert!(Fork::Homestead.max_code_size().is_err());
        assert_eq!(Fork::SpuriousDragon.max_code_size(), Ok(24_576));
        assert!(Fork::Paris.max_initcode_size().is_err());
        assert_eq!(Fork::Shanghai.max_initcode_size(), Ok(49_152));
    }

    #[test]
    fn test_block_reward() {
        assert_eq!(Fork::Frontier.block_reward(), Some(5_000_000_000_000_000_000));
        assert_eq!(Fork::London.block_reward(), Some(2_000_000_000_000_000_000));
        assert_eq!(Fork::Paris.block_reward(), None);
    }
}
