use {
    crate::{Datum, Error, KeyValue, OpKind, Operation, Session, SessionId, Transaction, TxnId},
    std::collections::{BTreeMap, BTreeSet, HashMap, HashSet},
};

/// A recorded execution: sessions, their transactions, and writes known to have aborted.
///
/// A `History` is filled in by whatever collected the execution and is then only read.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "K: serde::Serialize, V: serde::Serialize",
        deserialize = "K: Datum + serde::Deserialize<'de>, V: Datum + serde::Deserialize<'de>"
    ))
)]
pub struct History<K, V> {
    sessions: BTreeMap<SessionId, Session>,
    transactions: HashMap<TxnId, Transaction<K, V>>,
    aborted_writes: HashSet<KeyValue<K, V>>,
    keys: BTreeSet<K>,
}

impl<K: Datum, V: Datum> Default for History<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Datum, V: Datum> History<K, V> {
    pub fn new() -> Self {
        History {
            sessions: BTreeMap::new(),
            transactions: HashMap::new(),
            aborted_writes: HashSet::new(),
            keys: BTreeSet::new(),
        }
    }

    /// Registers a session. Registering an existing session is a no-op.
    pub fn add_session(&mut self, id: SessionId) {
        self.sessions.entry(id).or_insert_with(|| Session {
            id,
            transactions: Vec::new(),
        });
    }

    /// Appends a transaction to the end of `session`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is already used by another transaction.
    pub fn add_transaction(&mut self, session: SessionId, id: TxnId) -> Result<(), Error> {
        let entry = self
            .sessions
            .get_mut(&session)
            .ok_or(Error::UnknownSession(session))?;
        assert!(
            !self.transactions.contains_key(&id),
            "duplicate transaction id {id}"
        );
        entry.transactions.push(id);
        self.transactions.insert(
            id,
            Transaction {
                id,
                session,
                ops: Vec::new(),
                success: false,
            },
        );
        Ok(())
    }

    /// Appends an operation to the end of transaction `txn`.
    pub fn add_operation(
        &mut self,
        txn: TxnId,
        kind: OpKind,
        key: K,
        value: V,
    ) -> Result<&Operation<K, V>, Error> {
        let transaction = self
            .transactions
            .get_mut(&txn)
            .ok_or(Error::UnknownTransaction(txn))?;
        self.keys.insert(key.clone());
        let position = transaction.ops.len();
        transaction.ops.push(Operation {
            kind,
            key,
            value,
            txn,
            position,
        });
        Ok(&transaction.ops[position])
    }

    pub fn set_success(&mut self, txn: TxnId, success: bool) -> Result<(), Error> {
        let transaction = self
            .transactions
            .get_mut(&txn)
            .ok_or(Error::UnknownTransaction(txn))?;
        transaction.success = success;
        Ok(())
    }

    /// Records a committed transaction in one call, creating `session` if needed.
    ///
    /// # Panics
    ///
    /// Panics if `txn` is already used by another transaction.
    pub fn push_transaction(
        &mut self,
        session: SessionId,
        txn: TxnId,
        ops: impl IntoIterator<Item = (OpKind, K, V)>,
    ) {
        self.add_session(session);
        assert!(
            !self.transactions.contains_key(&txn),
            "duplicate transaction id {txn}"
        );
        let ops: Vec<_> = ops
            .into_iter()
            .enumerate()
            .map(|(position, (kind, key, value))| {
                self.keys.insert(key.clone());
                Operation {
                    kind,
                    key,
                    value,
                    txn,
                    position,
                }
            })
            .collect();
        if let Some(entry) = self.sessions.get_mut(&session) {
            entry.transactions.push(txn);
        }
        self.transactions.insert(
            txn,
            Transaction {
                id: txn,
                session,
                ops,
                success: true,
            },
        );
    }

    /// Notes that a write of `value` to `key` was issued by a transaction that aborted.
    pub fn add_aborted_write(&mut self, key: K, value: V) {
        self.aborted_writes.insert(KeyValue::new(key, value));
    }

    pub fn is_aborted_write(&self, kv: &KeyValue<K, V>) -> bool {
        self.aborted_writes.contains(kv)
    }

    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Sessions in ascending id order.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn transaction(&self, id: TxnId) -> Option<&Transaction<K, V>> {
        self.transactions.get(&id)
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Every key touched by an operation.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.keys.iter()
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation<K, V>> {
        self.transactions.values().flat_map(|txn| txn.ops.iter())
    }

    /// Transactions interleaved by rounds: round `i` holds the `i`-th transaction of every
    /// session long enough to have one, sessions in ascending id order.
    ///
    /// Transactions a session lists but the history does not contain are skipped;
    /// [`History::validate`] reports them.
    pub fn flat_transactions(&self) -> Vec<&Transaction<K, V>> {
        let rounds = self
            .sessions
            .values()
            .map(|session| session.transactions.len())
            .max()
            .unwrap_or(0);
        let mut result = Vec::with_capacity(self.transactions.len());
        for round in 0..rounds {
            for session in self.sessions.values() {
                if let Some(txn) = session
                    .transactions
                    .get(round)
                    .and_then(|id| self.transactions.get(id))
                {
                    result.push(txn);
                }
            }
        }
        result
    }

    /// Adds a synthetic session holding one transaction that writes `value` to every key in
    /// the history. Both use id `-1`, so the transaction is the first one visited.
    /// Calling this twice is a no-op.
    pub fn add_init_session(&mut self, value: V) {
        if self.transactions.contains_key(&TxnId::INIT) {
            return;
        }
        let ops: Vec<_> = self
            .keys
            .iter()
            .map(|key| (OpKind::Write, key.clone(), value.clone()))
            .collect();
        self.push_transaction(SessionId::INIT, TxnId::INIT, ops);
    }

    pub fn remove_init_session(&mut self) {
        self.sessions.remove(&SessionId::INIT);
        self.transactions.remove(&TxnId::INIT);
    }

    /// Checks that sessions, transactions and operations reference each other consistently.
    pub fn validate(&self) -> Result<(), Error> {
        let mut listed = HashSet::new();
        for session in self.sessions.values() {
            for txn in &session.transactions {
                if !listed.insert(*txn) {
                    return Err(Error::DuplicateTransaction(*txn));
                }
                match self.transactions.get(txn) {
                    Some(t) if t.session == session.id => (),
                    _ => {
                        return Err(Error::DanglingTransaction {
                            txn: *txn,
                            session: session.id,
                        })
                    }
                }
            }
        }
        for txn in self.transactions.values() {
            let session = self
                .sessions
                .get(&txn.session)
                .ok_or(Error::UnknownSession(txn.session))?;
            if !session.transactions.contains(&txn.id) {
                return Err(Error::DanglingTransaction {
                    txn: txn.id,
                    session: txn.session,
                });
            }
            for (position, op) in txn.ops.iter().enumerate() {
                if op.txn != txn.id {
                    return Err(Error::UnknownTransaction(op.txn));
                }
                if op.position != position {
                    return Err(Error::MisplacedOperation {
                        txn: txn.id,
                        position: op.position,
                    });
                }
            }
        }
        Ok(())
    }
}
