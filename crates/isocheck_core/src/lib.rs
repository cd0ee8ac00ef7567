//! This crate specifies the history model consumed by the
//! [isocheck](https://docs.rs/isocheck/) isolation checkers: sessions of transactions of
//! read/write operations, plus the set of writes known to have aborted.
//!
//! # Usage
//!
//! ```
//! use isocheck_core::{history, History, OpKind, SessionId, TxnId};
//!
//! let mut h: History<&str, u64> = history! {
//!     0 => [1 => [w("x", 1)]],
//!     1 => [2 => [r("x", 1)]],
//! };
//! h.add_aborted_write("x", 9);
//! h.push_transaction(SessionId::from(1), TxnId::from(3), [(OpKind::Read, "x", 1)]);
//! assert_eq!(h.flat_transactions().len(), 3);
//! ```
//!
//! # Features
//!
//! - `serde`: Implement `Serialize` and `Deserialize` for the history and its parts.

#![deny(unused_must_use)]
#![warn(rust_2018_idioms, unreachable_pub)]

mod error;
mod history;
mod id;

use core::{
    fmt::{self, Debug, Display, Formatter},
    hash::Hash,
};

pub use error::Error;
pub use history::History;
pub use id::{SessionId, TxnId};

/// Bound for keys and values: comparable, hashable and printable for diagnostics.
pub trait Datum: Clone + Debug + Eq + Hash + Ord {}
impl<T> Datum for T where T: Clone + Debug + Eq + Hash + Ord {}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum OpKind {
    Read,
    Write,
}

impl Display for OpKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OpKind::Read => "r",
            OpKind::Write => "w",
        })
    }
}

/// A `(key, value)` pair, the unit the checkers use to match reads with writes.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct KeyValue<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> KeyValue<K, V> {
    pub fn new(key: K, value: V) -> Self {
        KeyValue { key, value }
    }
}

/// A read or write, immutable once recorded. `position` is the index within the owning
/// transaction's program order.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Operation<K, V> {
    kind: OpKind,
    key: K,
    value: V,
    txn: TxnId,
    position: usize,
}

impl<K, V> Operation<K, V> {
    pub fn kind(&self) -> OpKind {
        self.kind
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn txn(&self) -> TxnId {
        self.txn
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_read(&self) -> bool {
        self.kind == OpKind::Read
    }

    pub fn is_write(&self) -> bool {
        self.kind == OpKind::Write
    }

    /// The `(key, value)` pair this operation reads or writes.
    pub fn key_value(&self) -> KeyValue<K, V>
    where
        K: Clone,
        V: Clone,
    {
        KeyValue::new(self.key.clone(), self.value.clone())
    }
}

impl<K: Debug, V: Debug> Display for Operation<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?}, {:?})", self.kind, self.key, self.value)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Transaction<K, V> {
    id: TxnId,
    session: SessionId,
    ops: Vec<Operation<K, V>>,
    success: bool,
}

impl<K, V> Transaction<K, V> {
    pub fn id(&self) -> TxnId {
        self.id
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Operations in program order.
    pub fn ops(&self) -> &[Operation<K, V>] {
        &self.ops
    }

    pub fn success(&self) -> bool {
        self.success
    }
}

impl<K: Debug, V: Debug> Display for Transaction<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.id)?;
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            Display::fmt(op, f)?;
        }
        f.write_str("]")
    }
}

/// The log of one client connection. Its order is the session order.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Session {
    id: SessionId,
    transactions: Vec<TxnId>,
}

impl Session {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn transactions(&self) -> &[TxnId] {
        &self.transactions
    }
}

/// Builds a [`History`] from a literal description. Each session maps to a list of
/// transactions, each transaction to a list of `r(key, value)` / `w(key, value)` operations.
/// Every transaction is marked successful.
///
/// # Example
/// ```
/// use isocheck_core::{history, History};
///
/// let h: History<char, u32> = history! {
///     0 => [1 => [w('x', 1), w('y', 1)], 2 => []],
///     1 => [3 => [r('x', 1), r('y', 0)]],
/// };
/// assert_eq!(h.sessions().count(), 2);
/// ```
#[macro_export]
macro_rules! history {
    ($($session:expr => [$($txn:expr => [$($kind:ident($key:expr, $value:expr)),* $(,)?]),* $(,)?]),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut history = $crate::History::new();
        $($(
            history.push_transaction(
                $crate::SessionId::from($session),
                $crate::TxnId::from($txn),
                vec![$(($crate::__op_kind!($kind), $key, $value)),*],
            );
        )*)*
        history
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __op_kind {
    (r) => {
        $crate::OpKind::Read
    };
    (w) => {
        $crate::OpKind::Write
    };
}
