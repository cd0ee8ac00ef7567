//! The commit order: the coordination order extended with the write-write edges that every
//! valid arbitration must include, and the patterns needing them.

use {
    crate::{
        analysis::{Analysis, OpRef},
        graph::{Edge, EdgeKind, NodeIdx, Order},
    },
    isocheck_core::Datum,
    isolation_model::Tap,
    std::collections::BTreeSet,
    tracing::debug,
};

impl<'h, K: Datum, V: Datum> Analysis<'h, K, V> {
    /// If `t2` read key `k` from `t1` and another writer `t` of `k` reaches `t2`, then `t`
    /// must commit before `t1`. Adds one such edge per witness triple and closes the commit
    /// clocks over them.
    pub(crate) fn build_commit_order(&mut self) {
        self.graph.snapshot_commit_clocks();

        let mut derived = Vec::new();
        for (key, pairs) in &self.wr_edges {
            let writers = match self.write_nodes.get(key) {
                None => continue,
                Some(writers) => writers,
            };
            for &(t1, t2) in pairs {
                for &t in writers {
                    if t != t1 && t != t2 && self.reaches(t, t2, Order::Coordination) {
                        derived.push((t, t1, t2, key.clone()));
                    }
                }
            }
        }

        let mut sources = BTreeSet::new();
        let derived_count = derived.len();
        for (t, t1, t2, key) in derived {
            self.graph.add_edge(t, t1, Edge::commit(key));
            self.cm_causes.insert((t, t1), t2);
            sources.insert(t);
        }
        for t in sources {
            self.graph.propagate(t, Order::Commit);
        }
        debug!(derived = derived_count, "built commit order");
    }

    /// Whether any edge closes a cycle in the commit order.
    pub(crate) fn has_commit_cycle(&self) -> bool {
        (0..self.graph.len()).any(|from| {
            self.graph
                .successors(from)
                .iter()
                .any(|&next| self.reaches(next, from, Order::Commit))
        })
    }

    /// Examines every triangle `t1 -WR(k)-> t3`, `t2 -CO-> t3` where `t2` also writes `k`,
    /// and classifies how `t1` comes to precede `t2`.
    pub(crate) fn check_commit_order(&mut self) {
        let mut findings = Vec::new();
        for (&(t1, t3), pairs) in &self.wr_ops {
            for &(write_x, read_x) in pairs {
                let key = self.op(write_x).key();
                let writers = match self.write_nodes.get(key) {
                    None => continue,
                    Some(writers) => writers,
                };
                for &t2 in writers {
                    if t2 == t1 || t2 == t3 || !self.reaches(t2, t3, Order::Coordination) {
                        continue;
                    }
                    let closing = if self.reaches(t1, t2, Order::Coordination) {
                        Order::Coordination
                    } else if self.reaches(t1, t2, Order::Commit) {
                        Order::Commit
                    } else {
                        continue;
                    };
                    for tap in self.classify_triangle(closing, key, read_x, t2, t3) {
                        findings.push((tap, key, [t1, t2, t3]));
                    }
                }
            }
        }
        for (tap, key, nodes) in findings {
            self.found(tap, Some(key), &nodes);
        }
    }

    /// An ordered writer `t2` that `t3` still skipped over. It is fractured if `t3` follows
    /// `t2` in session order or saw a write of `t2` only after reading `k`, and non-monotonic
    /// if it saw one before. With neither, it is a plain conflict.
    fn classify_triangle(
        &self,
        closing: Order,
        key: &K,
        read_x: OpRef,
        t2: NodeIdx,
        t3: NodeIdx,
    ) -> Vec<Tap> {
        let (fractured, non_mono, conflict) = match closing {
            Order::Coordination => (Tap::FracturedReadCO, Tap::NonMonoReadCO, Tap::COConflictCM),
            Order::Commit => (Tap::FracturedReadCM, Tap::NonMonoReadCM, Tap::ConflictCM),
        };
        let mut taps = Vec::new();
        if self
            .graph
            .edges(t2, t3)
            .iter()
            .any(|edge| edge.kind == EdgeKind::So)
        {
            taps.push(fractured);
        }
        for &(_, read_y) in self.wr_ops.get(&(t2, t3)).into_iter().flatten() {
            let read_y = self.op(read_y);
            if read_y.key() == key {
                continue;
            }
            taps.push(if read_y.position() < read_x.position {
                non_mono
            } else {
                fractured
            });
        }
        if taps.is_empty() {
            taps.push(conflict);
        }
        taps
    }
}
