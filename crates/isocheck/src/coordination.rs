//! The coordination order: session order plus write-read dependencies, and the patterns that
//! are visible in it alone.

use {
    crate::{
        analysis::{Analysis, OpRef, ReadRecord},
        graph::{Edge, Node, NodeIdx, Order},
    },
    isocheck_core::{Datum, OpKind, SessionId},
    isolation_model::Tap,
    std::collections::HashMap,
    tracing::debug,
};

impl<'h, K: Datum, V: Datum> Analysis<'h, K, V> {
    /// Visits transactions round by round, linking each to its session predecessor and to the
    /// writers it reads from, and keeps every coordination clock closed under reachability.
    pub(crate) fn build_coordination_order(&mut self) {
        let history = self.history;
        let dim = history.session_count();
        let mut last: HashMap<SessionId, NodeIdx> = HashMap::new();
        for txn in history.flat_transactions() {
            let ordinal = self.sessions[&txn.session()];
            let prev = last.get(&txn.session()).copied();
            let node = Node::new(txn, ordinal, dim, prev.map(|p| &self.graph.node(p).co));
            let node = self.graph.add_node(node);
            last.insert(txn.session(), node);
            if let Some(prev) = prev {
                self.graph.add_edge(prev, node, Edge::session_order());
            }

            // Latest read or write of each key so far, and the first position at which this
            // transaction wrote each (key, value), sentinel writes included.
            let mut nearest: HashMap<&'h K, usize> = HashMap::new();
            let mut last_write: HashMap<&'h K, usize> = HashMap::new();
            let mut written: HashMap<(&'h K, &'h V), usize> = HashMap::new();
            for op in txn.ops() {
                let here = OpRef {
                    node,
                    position: op.position(),
                };
                match op.kind() {
                    OpKind::Read => {
                        if let Some(&prev) = nearest.get(op.key()) {
                            let prev = &txn.ops()[prev];
                            if prev.value() != op.value() {
                                let earlier_own_write = written
                                    .get(&(op.key(), op.value()))
                                    .is_some_and(|&at| at < prev.position());
                                let tap = if prev.is_read() {
                                    Tap::NonRepeatableRead
                                } else if earlier_own_write {
                                    Tap::NotMyLastWrite
                                } else {
                                    Tap::NotMyOwnWrite
                                };
                                self.found(tap, Some(op.key()), &[node]);
                            }
                        }
                        nearest.insert(op.key(), op.position());

                        let kv = op.key_value();
                        if let Some(&writer) = self.writes.get(&kv) {
                            self.reads.push(ReadRecord {
                                read: here,
                                writer: Some(writer),
                            });
                            if writer.node != node {
                                if !self.reaches(writer.node, node, Order::Coordination) {
                                    self.graph.join(node, writer.node, Order::Coordination);
                                }
                                self.add_write_read(writer, here);
                            }
                        } else if *op.value() == self.sentinel {
                            self.reads.push(ReadRecord {
                                read: here,
                                writer: None,
                            });
                        } else {
                            self.pending.entry(kv).or_default().push(here);
                        }
                    }
                    OpKind::Write => {
                        written.entry((op.key(), op.value())).or_insert(op.position());
                        if *op.value() == self.sentinel {
                            continue;
                        }
                        let kv = op.key_value();
                        self.writes.insert(kv.clone(), here);
                        self.write_nodes
                            .entry(op.key().clone())
                            .or_default()
                            .insert(node);
                        nearest.insert(op.key(), op.position());
                        if let Some(earlier) = last_write.insert(op.key(), op.position()) {
                            self.internal_writes.insert(OpRef {
                                node,
                                position: earlier,
                            });
                        }

                        for read in self.pending.remove(&kv).unwrap_or_default() {
                            self.reads.push(ReadRecord {
                                read,
                                writer: Some(here),
                            });
                            if read.node != node {
                                self.add_write_read(here, read);
                            }
                        }
                    }
                }
            }

            self.graph.propagate(node, Order::Coordination);
        }
        debug!(
            transactions = self.graph.len(),
            edges = self.graph.edge_count(),
            pending = self.pending.len(),
            "built coordination order"
        );
    }

    /// Matches every pattern decidable from the coordination order.
    pub(crate) fn check_coordination_order(&mut self) {
        for (kv, readers) in std::mem::take(&mut self.pending) {
            let tap = if self.history.is_aborted_write(&kv) {
                Tap::AbortedRead
            } else {
                Tap::ThinAirRead
            };
            self.found(tap, Some(&kv.key), &[readers[0].node]);
        }

        for record in std::mem::take(&mut self.reads) {
            let read = record.read;
            let key = self.op(read).key();
            match record.writer {
                None => self.check_sentinel_read(read),
                Some(writer) if writer.node != read.node => {
                    if self.internal_writes.contains(&writer) {
                        self.found(Tap::IntermediateRead, Some(key), &[writer.node, read.node]);
                    }
                }
                Some(writer) => {
                    if writer.position > read.position {
                        self.found(Tap::FutureRead, Some(key), &[read.node]);
                    }
                }
            }
        }

        let cycles: Vec<(K, NodeIdx, NodeIdx)> = self
            .wr_edges
            .iter()
            .flat_map(|(key, pairs)| pairs.iter().map(move |&(w, r)| (key, w, r)))
            .filter(|&(_, w, r)| self.reaches(r, w, Order::Coordination))
            .map(|(key, w, r)| (key.clone(), w, r))
            .collect();
        for (key, w, r) in cycles {
            self.found(Tap::CyclicCO, Some(&key), &[w, r]);
        }
    }

    /// A read of the sentinel claims no committed write preceded it. Any writer of the key
    /// that reaches the reader contradicts that claim; the shape of the contradiction depends
    /// on whether the reader also observed another write of that writer.
    fn check_sentinel_read(&mut self, read: OpRef) {
        let op = self.op(read);
        let writers: Vec<NodeIdx> = match self.write_nodes.get(op.key()) {
            None => return,
            Some(writers) => writers
                .iter()
                .copied()
                .filter(|&w| w != read.node && self.reaches(w, read.node, Order::Coordination))
                .collect(),
        };
        let reader = self.graph.node(read.node).txn;
        for writer in writers {
            let writer_txn = self.graph.node(writer).txn;
            let mut taps = Vec::new();
            for write_y in writer_txn.ops() {
                if !write_y.is_write() || write_y.key() == op.key() {
                    continue;
                }
                for read_y in reader.ops() {
                    if read_y.is_read()
                        && read_y.key() == write_y.key()
                        && read_y.value() == write_y.value()
                    {
                        taps.push(if read_y.position() < op.position() {
                            Tap::NonMonoReadCO
                        } else {
                            Tap::FracturedReadCO
                        });
                    }
                }
            }
            if taps.is_empty() {
                taps.push(Tap::COConflictCM);
            }
            for tap in taps {
                self.found(tap, Some(op.key()), &[writer, read.node]);
            }
        }
    }
}
