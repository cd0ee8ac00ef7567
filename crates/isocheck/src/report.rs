use {
    isocheck_core::TxnId,
    isolation_model::{IsolationLevel, Tap},
    std::collections::BTreeMap,
};

/// The first instance found of one anomaly pattern.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Witness<K> {
    tap: Tap,
    key: Option<K>,
    transactions: Vec<TxnId>,
    dot: String,
}

impl<K> Witness<K> {
    pub(crate) fn new(tap: Tap, key: Option<K>, transactions: Vec<TxnId>, dot: String) -> Self {
        Witness {
            tap,
            key,
            transactions,
            dot,
        }
    }

    pub fn tap(&self) -> Tap {
        self.tap
    }

    /// The key the pattern is anchored on, if it has one.
    pub fn key(&self) -> Option<&K> {
        self.key.as_ref()
    }

    /// Transactions participating in the pattern. For three-transaction patterns these are
    /// the writer read from, the competing writer and the reader, in that order.
    pub fn transactions(&self) -> &[TxnId] {
        &self.transactions
    }

    /// A Graphviz rendering of the witnessing subgraph.
    pub fn dot(&self) -> &str {
        &self.dot
    }
}

/// Every anomaly pattern detected in a history, whether or not the checked isolation level
/// prohibits it.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct AnomalyReport<K> {
    counts: BTreeMap<Tap, usize>,
    witnesses: Vec<Witness<K>>,
}

impl<K> Default for AnomalyReport<K> {
    fn default() -> Self {
        AnomalyReport {
            counts: BTreeMap::new(),
            witnesses: Vec::new(),
        }
    }
}

impl<K> AnomalyReport<K> {
    /// Counts one instance of `tap`. The witness is only built for the first instance.
    pub(crate) fn record(&mut self, tap: Tap, witness: impl FnOnce() -> Witness<K>) {
        let count = self.counts.entry(tap).or_insert(0);
        *count += 1;
        if *count == 1 {
            self.witnesses.push(witness());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn contains(&self, tap: Tap) -> bool {
        self.counts.contains_key(&tap)
    }

    /// Number of instances of `tap` found (zero if none).
    pub fn count(&self, tap: Tap) -> usize {
        self.counts.get(&tap).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> &BTreeMap<Tap, usize> {
        &self.counts
    }

    /// Detected patterns in catalogue order.
    pub fn taps(&self) -> impl Iterator<Item = Tap> + '_ {
        self.counts.keys().copied()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn witness(&self, tap: Tap) -> Option<&Witness<K>> {
        self.witnesses.iter().find(|w| w.tap == tap)
    }

    /// First witness of each pattern, in detection order.
    pub fn witnesses(&self) -> &[Witness<K>] {
        &self.witnesses
    }

    /// Detected patterns that `level` prohibits, in catalogue order.
    pub fn violations(&self, level: IsolationLevel) -> Vec<Tap> {
        self.taps().filter(|tap| level.prohibits(*tap)).collect()
    }
}
