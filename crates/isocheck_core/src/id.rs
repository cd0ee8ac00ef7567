use core::fmt::{Debug, Display, Formatter};

/// Identifies a [`Session`](crate::Session). Negative ids are reserved for synthetic sessions
/// such as the one added by [`History::add_init_session`](crate::History::add_init_session).
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SessionId(i64);

/// Identifies a [`Transaction`](crate::Transaction) across the whole history.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TxnId(i64);

impl SessionId {
    pub const INIT: SessionId = SessionId(-1);
}

impl TxnId {
    pub const INIT: TxnId = TxnId(-1);
}

impl Debug for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str("S")?;
        Display::fmt(&self.0, f)
    }
}

impl Debug for TxnId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for TxnId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str("T")?;
        Display::fmt(&self.0, f)
    }
}

impl From<SessionId> for i64 {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl From<i64> for SessionId {
    fn from(n: i64) -> Self {
        SessionId(n)
    }
}

impl From<TxnId> for i64 {
    fn from(id: TxnId) -> Self {
        id.0
    }
}

impl From<i64> for TxnId {
    fn from(n: i64) -> Self {
        TxnId(n)
    }
}
