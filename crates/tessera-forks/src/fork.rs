//! Fork identities in activation order

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::ForkError;

/// A named protocol version. Ordering follows mainnet activation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Fork {
    /// Genesis rules
    Frontier,
    /// EIP-2, EIP-7, EIP-8
    Homestead,
    /// EIP-150 gas repricing
    TangerineWhistle,
    /// EIP-155, EIP-158, EIP-160, EIP-170
    SpuriousDragon,
    /// EIP-140, EIP-196..198, EIP-211, EIP-214, EIP-658
    Byzantium,
    /// EIP-145, EIP-1014, EIP-1052, EIP-1283
    Constantinople,
    /// Constantinople without EIP-1283
    Petersburg,
    /// EIP-152, EIP-1344, EIP-1884, EIP-2028, EIP-2200
    Istanbul,
    /// EIP-2565, EIP-2718, EIP-2929, EIP-2930
    Berlin,
    /// EIP-1559, EIP-3198, EIP-3529, EIP-3541
    London,
    /// The merge: EIP-3675, EIP-4399
    Paris,
    /// EIP-3651, EIP-3855, EIP-3860, EIP-4895
    Shanghai,
    /// EIP-1153, EIP-4788, EIP-4844, EIP-5656, EIP-6780, EIP-7516
    Cancun,
    /// EIP-2537, EIP-2935, EIP-7623, EIP-7691, EIP-7702
    Prague,
}

impl Fork {
    /// Every fork in activation order
    pub const ALL: [Fork; 14] = [
        Fork::Frontier,
        Fork::Homestead,
        Fork::TangerineWhistle,
        Fork::SpuriousDragon,
        Fork::Byzantium,
        Fork::Constantinople,
        Fork::Petersburg,
        Fork::Istanbul,
        Fork::Berlin,
        Fork::London,
        Fork::Paris,
        Fork::Shanghai,
        Fork::Cancun,
        Fork::Prague,
    ];

    /// Immediate predecessor, `None` for Frontier
    pub fn parent(self) -> Option<Fork> {
        let idx = self as usize;
        if idx == 0 {
            None
        } else {
            Some(Fork::ALL[idx - 1])
        }
    }

    /// Immediate successor, `None` for the latest fork
    pub fn successor(self) -> Option<Fork> {
        Fork::ALL.get(self as usize + 1).copied()
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            Fork::Frontier => "Frontier",
            Fork::Homestead => "Homestead",
            Fork::TangerineWhistle => "TangerineWhistle",
            Fork::SpuriousDragon => "SpuriousDragon",
            Fork::Byzantium => "Byzantium",
            Fork::Constantinople => "Constantinople",
            Fork::Petersburg => "Petersburg",
            Fork::Istanbul => "Istanbul",
            Fork::Berlin => "Berlin",
            Fork::London => "London",
            Fork::Paris => "Paris",
            Fork::Shanghai => "Shanghai",
            Fork::Cancun => "Cancun",
            Fork::Prague => "Prague",
        }
    }

    /// Fork selector understood by transition tools (`--state.fork`)
    pub fn t8n_name(self) -> &'static str {
        match self {
            Fork::TangerineWhistle => "EIP150",
            Fork::SpuriousDragon => "EIP158",
            Fork::Petersburg => "ConstantinopleFix",
            Fork::Paris => "Merge",
            other => other.name(),
        }
    }

    /// Shanghai and later are scheduled by timestamp, earlier forks by block
    pub fn activates_by_timestamp(self) -> bool {
        self >= Fork::Shanghai
    }

    /// Whether `self` is at or after `other`
    pub fn is_at_least(self, other: Fork) -> bool {
        self >= other
    }
}

impl fmt::Display for Fork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Fork {
    type Err = ForkError;

    /// Accepts display names and transition-tool aliases
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Fork::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s || f.t8n_name() == s)
            .ok_or_else(|| ForkError::UnknownFork(s.to_string()))
    }
}

impl Serialize for Fork {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Fork {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
