use {
    crate::{
        graph::{Edge, Graph, NodeIdx, Order},
        report::{AnomalyReport, Witness},
    },
    colorful::Colorful,
    isocheck_core::{Datum, Error, History, KeyValue, Operation, SessionId},
    isolation_model::Tap,
    std::collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    tracing::trace,
};

/// Locates an operation: the node of its transaction and its program-order position.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct OpRef {
    pub(crate) node: NodeIdx,
    pub(crate) position: usize,
}

/// A read and the write it observed. `None` means the read returned the sentinel.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ReadRecord {
    pub(crate) read: OpRef,
    pub(crate) writer: Option<OpRef>,
}

/// Working state for checking one history. Nodes borrow the history's transactions, so an
/// `Analysis` never outlives the history it indexes.
pub(crate) struct Analysis<'h, K, V> {
    pub(crate) history: &'h History<K, V>,
    pub(crate) sentinel: V,
    pub(crate) sessions: HashMap<SessionId, usize>,
    pub(crate) graph: Graph<'h, K, V>,
    /// Latest write of each non-sentinel `(key, value)`.
    pub(crate) writes: HashMap<KeyValue<K, V>, OpRef>,
    pub(crate) reads: Vec<ReadRecord>,
    /// Reads whose value has no writer yet, by `(key, value)`.
    pub(crate) pending: BTreeMap<KeyValue<K, V>, Vec<OpRef>>,
    /// Transactions writing each key.
    pub(crate) write_nodes: HashMap<K, BTreeSet<NodeIdx>>,
    /// `(writer, reader)` transaction pairs per key.
    pub(crate) wr_edges: BTreeMap<K, BTreeSet<(NodeIdx, NodeIdx)>>,
    /// `(write, read)` operation pairs per `(writer, reader)` transaction pair.
    pub(crate) wr_ops: BTreeMap<(NodeIdx, NodeIdx), Vec<(OpRef, OpRef)>>,
    /// Writes later overwritten within their own transaction.
    pub(crate) internal_writes: HashSet<OpRef>,
    /// For each derived commit edge `(t, t1)`, the reader `t2` that forced it.
    pub(crate) cm_causes: HashMap<(NodeIdx, NodeIdx), NodeIdx>,
    pub(crate) report: AnomalyReport<K>,
}

impl<'h, K: Datum, V: Datum> Analysis<'h, K, V> {
    /// Prepares indices for `history`. Fails if the per-node clocks would need more than
    /// `max_clock_entries` entries in total.
    pub(crate) fn new(
        history: &'h History<K, V>,
        sentinel: V,
        max_clock_entries: usize,
    ) -> Result<Self, Error> {
        let sessions = history.session_count();
        let transactions = history.transaction_count();
        let exceeded = Error::CapacityExceeded {
            sessions,
            transactions,
        };
        // One coordination and one commit clock per transaction.
        match sessions
            .checked_mul(transactions)
            .and_then(|entries| entries.checked_mul(2))
        {
            Some(entries) if entries <= max_clock_entries => (),
            _ => return Err(exceeded),
        }
        let graph = Graph::with_capacity(transactions).map_err(|_| exceeded)?;
        Ok(Analysis {
            history,
            sentinel,
            sessions: history
                .sessions()
                .enumerate()
                .map(|(ordinal, session)| (session.id(), ordinal))
                .collect(),
            graph,
            writes: HashMap::new(),
            reads: Vec::new(),
            pending: BTreeMap::new(),
            write_nodes: HashMap::new(),
            wr_edges: BTreeMap::new(),
            wr_ops: BTreeMap::new(),
            internal_writes: HashSet::new(),
            cm_causes: HashMap::new(),
            report: AnomalyReport::default(),
        })
    }

    pub(crate) fn op(&self, op: OpRef) -> &'h Operation<K, V> {
        let txn = self.graph.node(op.node).txn;
        &txn.ops()[op.position]
    }

    pub(crate) fn reaches(&self, src: NodeIdx, dst: NodeIdx, order: Order) -> bool {
        self.graph.reaches(src, dst, order)
    }

    /// Counts an instance of `tap` involving `nodes`, rendering a witness if it is the first.
    pub(crate) fn found(&mut self, tap: Tap, key: Option<&K>, nodes: &[NodeIdx]) {
        trace!(
            %tap,
            ?key,
            txns = ?nodes.iter().map(|n| self.graph.node(*n).txn.id()).collect::<Vec<_>>(),
            "found pattern"
        );
        let mut report = std::mem::take(&mut self.report);
        report.record(tap, || {
            Witness::new(
                tap,
                key.cloned(),
                nodes.iter().map(|n| self.graph.node(*n).txn.id()).collect(),
                self.render(tap, key, nodes),
            )
        });
        self.report = report;
    }

    /// Records a write-read dependency between two operations of distinct transactions.
    pub(crate) fn add_write_read(&mut self, write: OpRef, read: OpRef) {
        let key = self.op(write).key();
        self.graph
            .add_edge(write.node, read.node, Edge::write_read(key.clone()));
        self.wr_edges
            .entry(key.clone())
            .or_default()
            .insert((write.node, read.node));
        self.wr_ops
            .entry((write.node, read.node))
            .or_default()
            .push((write, read));
    }

    /// Prints every node with its clocks, highlighting transactions that take part in a
    /// witness.
    pub(crate) fn dump(&self) {
        let flagged: HashSet<_> = self
            .report
            .witnesses()
            .iter()
            .flat_map(|w| w.transactions().iter().copied())
            .collect();
        println!("Transactions in visit order:");
        for (i, node) in self.graph.nodes().iter().enumerate() {
            let line = format!("{i: >5}. {} co={} cm={}", node.txn, node.co, node.cm);
            if flagged.contains(&node.txn.id()) {
                println!("{}", line.color(colorful::Color::Red));
            } else {
                println!("{line}");
            }
        }
        for witness in self.report.witnesses() {
            println!(
                "{} {}",
                witness.tap().code().color(colorful::Color::Yellow),
                witness.tap()
            );
            println!("{}", witness.dot());
        }
    }

    pub(crate) fn into_report(self) -> AnomalyReport<K> {
        self.report
    }
}
