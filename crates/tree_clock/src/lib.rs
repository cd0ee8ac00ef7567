//! A fixed-dimension vector clock with one coordinate per session, used as a reachability
//! index over a directed graph whose nodes are grouped into sessions.
//!
//! Every node owns the coordinate of its session. A node's clock is formed by joining the
//! clock of its session predecessor, bumping its own coordinate, and then joining the clocks
//! of every node that can reach it. With that discipline `a <= b` holds exactly when `a` can
//! reach `b` through edges already folded into `b`.

use std::cmp::{max, Ordering};
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};

/// A per-session vector clock. See the [crate docs](crate) for the reachability discipline.
#[derive(Clone, Debug, Default, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TreeClock {
    owner: usize,
    entries: Vec<u32>,
}

/// Creates a [`TreeClock`] owned by coordinate `0` containing the specified elements.
///
/// # Example
/// ```
/// use tree_clock::tclock;
///
/// let x = tclock![0, 0];
/// let y = tclock![42, 0, 1];
/// assert!(!x.dominates_or_equals(&tclock![1, 0]));
/// assert_eq!(y.dim(), 3);
/// ```
#[macro_export]
macro_rules! tclock {
    ($($x:expr),+ $(,)?) => (
        $crate::TreeClock::from(vec![$($x),+])
    );
}

impl TreeClock {
    /// A zeroed clock of `dim` coordinates owned by `owner`.
    ///
    /// # Panics
    ///
    /// Panics if `owner` is not a valid coordinate.
    pub fn new(owner: usize, dim: usize) -> Self {
        assert!(owner < dim, "owner {owner} out of range for dimension {dim}");
        TreeClock {
            owner,
            entries: vec![0; dim],
        }
    }

    pub fn dim(&self) -> usize {
        self.entries.len()
    }

    /// The coordinate for `session`.
    pub fn get(&self, session: usize) -> u32 {
        self.entries[session]
    }

    pub fn owner(&self) -> usize {
        self.owner
    }

    /// Advances the owner's coordinate by `n`.
    pub fn increment_self(&mut self, n: u32) {
        self.entries[self.owner] += n;
    }

    /// Point-wise maximum, folding `other` into `self`.
    ///
    /// # Panics
    ///
    /// Panics on a dimension mismatch.
    pub fn join(&mut self, other: &Self) {
        assert_eq!(self.dim(), other.dim(), "clock dimension mismatch");
        for (mine, theirs) in self.entries.iter_mut().zip(&other.entries) {
            *mine = max(*mine, *theirs);
        }
    }

    /// `true` iff every coordinate of `other` is at most the matching coordinate of `self`,
    /// i.e. `other` can reach `self`.
    ///
    /// # Panics
    ///
    /// Panics on a dimension mismatch.
    pub fn dominates_or_equals(&self, other: &Self) -> bool {
        assert_eq!(self.dim(), other.dim(), "clock dimension mismatch");
        self.entries
            .iter()
            .zip(&other.entries)
            .all(|(mine, theirs)| theirs <= mine)
    }
}

impl Display for TreeClock {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "<")?;
        let mut iter = self.entries.iter();
        if let Some(mut next) = iter.next() {
            loop {
                write!(f, "{}", next)?;
                next = match iter.next() {
                    None => break,
                    Some(next) => {
                        write!(f, " ")?;
                        next
                    }
                }
            }
        }
        write!(f, ">")
    }
}

impl From<Vec<u32>> for TreeClock {
    fn from(entries: Vec<u32>) -> Self {
        TreeClock { owner: 0, entries }
    }
}

// Ownership only steers `increment_self`; two clocks with the same coordinates describe the
// same set of reachable predecessors.
impl Hash for TreeClock {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entries.hash(state);
    }
}

impl PartialEq for TreeClock {
    fn eq(&self, rhs: &Self) -> bool {
        self.entries == rhs.entries
    }
}

impl PartialOrd for TreeClock {
    fn partial_cmp(&self, rhs: &Self) -> Option<Ordering> {
        assert_eq!(self.dim(), rhs.dim(), "clock dimension mismatch");
        let mut expected_ordering = Ordering::Equal;
        for (lhs_elem, rhs_elem) in self.entries.iter().zip(&rhs.entries) {
            let ordering = lhs_elem.cmp(rhs_elem);
            // Once a `Less`/`Greater` coordinate is seen every later coordinate must agree or
            // be `Equal`, otherwise the clocks are incomparable.
            if expected_ordering == Ordering::Equal {
                expected_ordering = ordering;
            } else if ordering != expected_ordering && ordering != Ordering::Equal {
                return None;
            }
        }
        Some(expected_ordering)
    }
}
