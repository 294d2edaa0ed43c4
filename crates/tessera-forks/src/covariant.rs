//! Fork-covariant parameter generation.
//!
//! Test authors that want one scenario per transaction type, opcode or
//! precompile ask the fork for the values valid under it instead of
//! hard-coding lists.

use tessera_primitives::Address;

use crate::{Fork, Opcode, TxType};

/// Axis a scenario family is expanded over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CovariantDimension {
    /// Every supported transaction type
    TxTypes,
    /// Transaction types that may create contracts
    ContractCreatingTxTypes,
    /// Every valid opcode
    Opcodes,
    /// Every precompile address
    Precompiles,
    /// Every system contract address
    SystemContracts,
}

/// One generated parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CovariantValue {
    /// A transaction type
    TxType(TxType),
    /// An opcode
    Opcode(Opcode),
    /// A precompile or system contract address
    Address(Address),
}

impl Fork {
    /// Values valid under this fork along `dimension`, in a stable order
    pub fn covariant_values(self, dimension: CovariantDimension) -> Vec<CovariantValue> {
        match dimension {
            CovariantDimension::TxTypes => {
                self.tx_types().into_iter().map(CovariantValue::TxType).collect()
            }
            CovariantDimension::ContractCreatingTxTypes => self
                .contract_creating_tx_types()
                .into_iter()
                .map(CovariantValue::TxType)
                .collect(),
            CovariantDimension::Opcodes => self
                .valid_opcodes()
                .into_iter()
                .map(CovariantValue::Opcode)
                .collect(),
            CovariantDimension::Precompiles => self
                .precompiles()
                .into_iter()
                .map(CovariantValue::Address)
                .collect(),
            CovariantDimension::SystemContracts => self
                .system_contracts()
                .into_iter()
                .map(|c| CovariantValue::Address(c.address))
                .collect(),
        }
    }
}
