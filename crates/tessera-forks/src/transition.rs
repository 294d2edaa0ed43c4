//! Forks that switch rules at a block number or timestamp

use std::collections::BTreeSet;
use std::fmt;

use tessera_primitives::Address;

use crate::{
    BaseFeeParams, BlobSchedule, Fork, ForkError, GasCosts, HeaderField, IntrinsicGas,
    IntrinsicGasInput, Opcode, SystemContract, TxType, UnsupportedCapability,
};

/// Activation threshold of a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activation {
    /// Active from this block number on
    Block(u64),
    /// Active from this timestamp on
    Timestamp(u64),
}

/// Two forks and the point where the second takes over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransitionFork {
    from: Fork,
    to: Fork,
    activation: Activation,
}

impl TransitionFork {
    /// Create a transition. `to` must be later than `from`, and the
    /// activation kind must be the one `to` is scheduled by.
    pub fn new(from: Fork, to: Fork, activation: Activation) -> Result<Self, ForkError> {
        if to <= from {
            return Err(ForkError::NonIncreasingTransition { from, to });
        }
        match (to.activates_by_timestamp(), activation) {
            (true, Activation::Block(_)) => Err(ForkError::ActivationKindMismatch {
                to,
                expected: "timestamp",
            }),
            (false, Activation::Timestamp(_)) => Err(ForkError::ActivationKindMismatch {
                to,
                expected: "block number",
            }),
            _ => Ok(TransitionFork {
                from,
                to,
                activation,
            }),
        }
    }

    /// Fork before activation
    pub fn from(&self) -> Fork {
        self.from
    }

    /// Fork at and after activation
    pub fn to(&self) -> Fork {
        self.to
    }

    /// Activation threshold
    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Fork in effect at a block position
    pub fn resolve(&self, block_number: u64, timestamp: u64) -> Fork {
        let active = match self.activation {
            Activation::Block(n) => block_number >= n,
            Activation::Timestamp(t) => timestamp >= t,
        };
        if active {
            self.to
        } else {
            self.from
        }
    }

    /// Conventional name, e.g. `BerlinToLondonAt5` or
    /// `ShanghaiToCancunAtTime15k`
    pub fn name(&self) -> String {
        match self.activation {
            Activation::Block(n) => format!("{}To{}At{}", self.from, self.to, n),
            Activation::Timestamp(t) if t % 1000 == 0 && t > 0 => {
                format!("{}To{}AtTime{}k", self.from, self.to, t / 1000)
            }
            Activation::Timestamp(t) => format!("{}To{}AtTime{}", self.from, self.to, t),
        }
    }
}

impl fmt::Display for TransitionFork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// The fork a scenario is filled for: a single fork, or a transition.
///
/// Every capability query takes the block position it is asked for, so
/// a chain that crosses a transition sees each block under its own rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForkSpec {
    /// One fork for every block
    Single(Fork),
    /// Rules switch at the activation threshold
    Transition(TransitionFork),
}

impl ForkSpec {
    /// Fork in effect at a block position
    pub fn resolve(&self, block_number: u64, timestamp: u64) -> Fork {
        match self {
            ForkSpec::Single(f) => *f,
            ForkSpec::Transition(t) => t.resolve(block_number, timestamp),
        }
    }

    /// Name used for the fixture `network` field and file keys
    pub fn name(&self) -> String {
        match self {
            ForkSpec::Single(f) => f.name().to_string(),
            ForkSpec::Transition(t) => t.name(),
        }
    }

    /// Fork in effect at genesis
    pub fn genesis_fork(&self) -> Fork {
        self.resolve(0, 0)
    }

    /// Latest fork this fork spec can resolve to
    pub fn latest(&self) -> Fork {
        match self {
            ForkSpec::Single(f) => *f,
            ForkSpec::Transition(t) => t.to(),
        }
    }

    /// Valid opcodes at a position
    pub fn valid_opcodes(&self, block_number: u64, timestamp: u64) -> BTreeSet<Opcode> {
        self.resolve(block_number, timestamp).valid_opcodes()
    }

    /// Transaction types at a position
    pub fn tx_types(&self, block_number: u64, timestamp: u64) -> BTreeSet<TxType> {
        self.resolve(block_number, timestamp).tx_types()
    }

    /// Contract-creating transaction types at a position
    pub fn contract_creating_tx_types(&self, block_number: u64, timestamp: u64) -> BTreeSet<TxType> {
        self.resolve(block_number, timestamp).contract_creating_tx_types()
    }

    /// Gas schedule at a position
    pub fn gas_costs(&self, block_number: u64, timestamp: u64) -> GasCosts {
        self.resolve(block_number, timestamp).gas_costs()
    }

    /// Intrinsic gas at a position
    pub fn intrinsic_gas(
        &self,
        block_number: u64,
        timestamp: u64,
        input: &IntrinsicGasInput<'_>,
    ) -> IntrinsicGas {
        self.resolve(block_number, timestamp).intrinsic_gas(input)
    }

    /// Memory expansion gas at a position
    pub fn memory_expansion_gas(
        &self,
        block_number: u64,
        timestamp: u64,
        current_bytes: u64,
        new_bytes: u64,
    ) -> u64 {
        self.resolve(block_number, timestamp)
            .memory_expansion_gas(current_bytes, new_bytes)
    }

    /// Blob gas parameters at a position
    pub fn blob_schedule(
        &self,
        block_number: u64,
        timestamp: u64,
    ) -> Result<BlobSchedule, UnsupportedCapability> {
        self.resolve(block_number, timestamp).blob_schedule()
    }

    /// Base fee parameters at a position
    pub fn base_fee_params(
        &self,
        block_number: u64,
        timestamp: u64,
    ) -> Result<BaseFeeParams, UnsupportedCapability> {
        self.resolve(block_number, timestamp).base_fee_params()
    }

    /// Required header fields at a position
    pub fn header_fields(&self, block_number: u64, timestamp: u64) -> BTreeSet<HeaderField> {
        self.resolve(block_number, timestamp).header_fields()
    }

    /// Precompiles at a position
    pub fn precompiles(&self, block_number: u64, timestamp: u64) -> BTreeSet<Address> {
        self.resolve(block_number, timestamp).precompiles()
    }

    /// Deployed code size limit at a position
    pub fn max_code_size(
        &self,
        block_number: u64,
        timestamp: u64,
    ) -> Result<usize, UnsupportedCapability> {
        self.resolve(block_number, timestamp).max_code_size()
    }

    /// Init code size limit at a position
    pub fn max_initcode_size(
        &self,
        block_number: u64,
        timestamp: u64,
    ) -> Result<usize, UnsupportedCapability> {
        self.resolve(block_number, timestamp).max_initcode_size()
    }

    /// Header extra data limit at a position
    pub fn max_extra_data_size(&self, block_number: u64, timestamp: u64) -> usize {
        self.resolve(block_number, timestamp).max_extra_data_size()
    }

    /// Whether headers at a position must carry zero difficulty
    pub fn requires_zero_difficulty(&self, block_number: u64, timestamp: u64) -> bool {
        self.resolve(block_number, timestamp).requires_zero_difficulty()
    }

    /// System contracts at a position
    pub fn system_contracts(&self, block_number: u64, timestamp: u64) -> Vec<SystemContract> {
        self.resolve(block_number, timestamp).system_contracts()
    }

    /// System contracts that must exist in genesis: those of every fork
    /// the fork spec can reach, so a transition finds them already deployed.
    pub fn genesis_system_contracts(&self) -> Vec<SystemContract> {
        self.latest().system_contracts()
    }
}

impl From<Fork> for ForkSpec {
    fn from(f: Fork) -> Self {
        ForkSpec::Single(f)
    }
}

impl From<TransitionFork> for ForkSpec {
    fn from(t: TransitionFork) -> Self {
        ForkSpec::Transition(t)
    }
}

impl fmt::Display for ForkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
