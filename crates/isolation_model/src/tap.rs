use std::fmt::{self, Display, Formatter};

/// A transactional anomaly pattern: a named shape in the dependency graph of a history whose
/// presence rules out one or more [`IsolationLevel`](crate::IsolationLevel)s.
///
/// Suffixes name the relation that closes the pattern: `CO` patterns are visible in the
/// coordination order (session order plus write-read), `CM` patterns additionally need the
/// commit order derived from competing writers.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Tap {
    /// A read of a value no transaction wrote.
    ThinAirRead,
    /// A read of a value written only by an aborted transaction.
    AbortedRead,
    /// A read of a value its own transaction writes later.
    FutureRead,
    /// A read after an own write to the key returning someone else's value.
    NotMyOwnWrite,
    /// A read after own writes to the key returning an older own write.
    NotMyLastWrite,
    /// A read of a value its writer overwrote before committing.
    IntermediateRead,
    /// A cycle in the coordination order.
    CyclicCO,
    NonMonoReadCO,
    NonMonoReadCM,
    /// Two reads of one key in a transaction returning different values.
    NonRepeatableRead,
    FracturedReadCO,
    FracturedReadCM,
    COConflictCM,
    ConflictCM,
}

impl Tap {
    pub const ALL: [Tap; 14] = [
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

    /// Short catalogue code, `TAP-a` through `TAP-n`.
    pub fn code(self) -> &'static str {
        match self {
            Tap::ThinAirRead => "TAP-a",
            Tap::AbortedRead => "TAP-b",
            Tap::FutureRead => "TAP-c",
            Tap::NotMyOwnWrite => "TAP-d",
            Tap::NotMyLastWrite => "TAP-e",
            Tap::IntermediateRead => "TAP-f",
            Tap::CyclicCO => "TAP-g",
            Tap::NonMonoReadCO => "TAP-h",
            Tap::NonMonoReadCM => "TAP-i",
            Tap::NonRepeatableRead => "TAP-j",
            Tap::FracturedReadCO => "TAP-k",
            Tap::FracturedReadCM => "TAP-l",
            Tap::COConflictCM => "TAP-m",
            Tap::ConflictCM => "TAP-n",
        }
    }

    /// Whether the pattern can be found from the coordination order alone, without deriving
    /// the commit order.
    pub fn is_coordination_level(self) -> bool {
        !matches!(
            self,
            Tap::NonMonoReadCM | Tap::FracturedReadCM | Tap::ConflictCM
        )
    }
}

impl Display for Tap {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
