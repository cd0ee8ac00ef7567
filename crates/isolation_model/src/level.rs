use {
    crate::Tap,
    isocheck_core::Error,
    std::{
        fmt::{self, Display, Formatter},
        str::FromStr,
    },
};

const READ_COMMITTED: &[Tap] = &[
    Tap::ThinAirRead,
    Tap::AbortedRead,
    Tap::FutureRead,
    Tap::NotMyOwnWrite,
    Tap::NotMyLastWrite,
    Tap::IntermediateRead,
    Tap::CyclicCO,
    Tap::NonMonoReadCO,
    Tap::NonMonoReadCM,
];

const REPEATABLE_READ: &[Tap] = &[
    Tap::ThinAirRead,
    Tap::AbortedRead,
    Tap::FutureRead,
    Tap::NotMyOwnWrite,
    Tap::NotMyLastWrite,
    Tap::IntermediateRead,
    Tap::CyclicCO,
    Tap::NonMonoReadCO,
    Tap::NonMonoReadCM,
    Tap::NonRepeatableRead,
];

const READ_ATOMICITY: &[Tap] = &[
    Tap::ThinAirRead,
    Tap::AbortedRead,
    Tap::FutureRead,
    Tap::NotMyOwnWrite,
    Tap::NotMyLastWrite,
    Tap::IntermediateRead,
    Tap::CyclicCO,
    Tap::NonMonoReadCO,
    Tap::NonMonoReadCM,
    Tap::NonRepeatableRead,
    Tap::FracturedReadCO,
    Tap::FracturedReadCM,
];

const CAUSAL_CONSISTENCY: &[Tap] = &[
    Tap::ThinAirRead,
    Tap::AbortedRead,
    Tap::FutureRead,
    Tap::NotMyOwnWrite,
    Tap::NotMyLastWrite,
    Tap::IntermediateRead,
    Tap::CyclicCO,
    Tap::NonMonoReadCO,
    Tap::NonMonoReadCM,
    Tap::NonRepeatableRead,
    Tap::FracturedReadCO,
    Tap::FracturedReadCM,
    Tap::COConflictCM,
    Tap::ConflictCM,
];

/// An isolation level, ordered from weakest to strongest. Each level forbids every pattern
/// the weaker levels forbid.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum IsolationLevel {
    ReadCommitted,
    RepeatableRead,
    ReadAtomicity,
    /// Transactional causal consistency.
    CausalConsistency,
}

impl IsolationLevel {
    pub const ALL: [IsolationLevel; 4] = [
        IsolationLevel::ReadCommitted,
        IsolationLevel::RepeatableRead,
        IsolationLevel::ReadAtomicity,
        IsolationLevel::CausalConsistency,
    ];

    /// Patterns whose presence falsifies this level.
    pub fn prohibited(self) -> &'static [Tap] {
        match self {
            IsolationLevel::ReadCommitted => READ_COMMITTED,
            IsolationLevel::RepeatableRead => REPEATABLE_READ,
            IsolationLevel::ReadAtomicity => READ_ATOMICITY,
            IsolationLevel::CausalConsistency => CAUSAL_CONSISTENCY,
        }
    }

    pub fn prohibits(self, tap: Tap) -> bool {
        self.prohibited().contains(&tap)
    }

    /// Whether checking this level derives the commit order. Repeatable read is decided from
    /// the coordination order alone.
    pub fn checks_commit_order(self) -> bool {
        self != IsolationLevel::RepeatableRead
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "READ_COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE_READ",
            IsolationLevel::ReadAtomicity => "READ_ATOMICITY",
            IsolationLevel::CausalConsistency => "CAUSAL_CONSISTENCY",
        }
    }
}

impl Display for IsolationLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IsolationLevel {
    type Err = Error;

    /// Accepts the canonical names in any case, with `-` or spaces for `_`, and the usual
    /// abbreviations (`RC`, `RR`, `RA`, `CC`, `TCC`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        match normalized.as_str() {
            "READ_COMMITTED" | "RC" => Ok(IsolationLevel::ReadCommitted),
            "REPEATABLE_READ" | "RR" => Ok(IsolationLevel::RepeatableRead),
            "READ_ATOMICITY" | "RA" => Ok(IsolationLevel::ReadAtomicity),
            "CAUSAL_CONSISTENCY" | "TRANSACTIONAL_CAUSAL_CONSISTENCY" | "CC" | "TCC" => {
                Ok(IsolationLevel::CausalConsistency)
            }
            _ => Err(Error::UnknownIsolationLevel(s.to_string())),
        }
    }
}
