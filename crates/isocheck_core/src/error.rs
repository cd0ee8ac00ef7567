use {
    crate::{SessionId, TxnId},
    thiserror::Error,
};

/// Input malformation and resource errors. A detected anomaly is never an `Error`.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("unknown isolation level: {0:?}")]
    UnknownIsolationLevel(String),

    #[error("unknown checker backend: {0:?}")]
    UnknownBackend(String),

    #[error("no session {0} in history")]
    UnknownSession(SessionId),

    #[error("no transaction {0} in history")]
    UnknownTransaction(TxnId),

    /// A session lists a transaction that is missing or that belongs elsewhere.
    #[error("transaction {txn} is referenced by session {session} but not owned by it")]
    DanglingTransaction { txn: TxnId, session: SessionId },

    /// A transaction listed more than once across all sessions.
    #[error("transaction {0} is listed more than once")]
    DuplicateTransaction(TxnId),

    #[error("operation {position} of transaction {txn} is recorded out of place")]
    MisplacedOperation { txn: TxnId, position: usize },

    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("history too large to index: {sessions} sessions x {transactions} transactions")]
    CapacityExceeded { sessions: usize, transactions: usize },
}
