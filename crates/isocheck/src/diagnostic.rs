use {
    crate::{
        analysis::Analysis,
        graph::{Edge, EdgeKind, NodeIdx},
    },
    isocheck_core::Datum,
    isolation_model::Tap,
    std::{
        collections::{BTreeSet, HashSet},
        fmt::Write,
    },
};

const CO_EDGES: &[EdgeKind] = &[EdgeKind::So, EdgeKind::Wr];
const CM_EDGES: &[EdgeKind] = &[EdgeKind::So, EdgeKind::Wr, EdgeKind::Cm];

/// Nodes and edges selected for a witness rendering.
struct Subgraph<K> {
    nodes: BTreeSet<NodeIdx>,
    edges: BTreeSet<(NodeIdx, NodeIdx, Edge<K>)>,
}

impl<K: Datum> Subgraph<K> {
    fn new(nodes: &[NodeIdx]) -> Self {
        Subgraph {
            nodes: nodes.iter().copied().collect(),
            edges: BTreeSet::new(),
        }
    }

    fn add(&mut self, src: NodeIdx, dst: NodeIdx, edge: Edge<K>) {
        self.nodes.insert(src);
        self.nodes.insert(dst);
        self.edges.insert((src, dst, edge));
    }
}

impl<'h, K: Datum, V: Datum> Analysis<'h, K, V> {
    /// Renders the subgraph witnessing an instance of `tap` as Graphviz DOT.
    ///
    /// Single-transaction patterns show the transaction alone and two-transaction patterns
    /// show both with the edges between them. Three-transaction patterns `[t1, t2, t3]` show
    /// the edges `t2 -WW-> t1 -WR-> t3` plus shortest paths realizing `t1 -> t2` and
    /// `t2 -> t3`, and every commit edge on those paths is expanded into the read that forced
    /// it.
    pub(crate) fn render(&self, tap: Tap, key: Option<&K>, nodes: &[NodeIdx]) -> String {
        let mut sub = Subgraph::new(nodes);
        match (nodes, key) {
            (&[a, b], _) => {
                for (src, dst) in [(a, b), (b, a)] {
                    for edge in self.graph.edges(src, dst) {
                        sub.add(src, dst, edge.clone());
                    }
                }
            }
            (&[t1, t2, t3], Some(key)) => {
                sub.add(t2, t1, Edge::commit(key.clone()));
                sub.add(t1, t3, Edge::write_read(key.clone()));
                let ordering = if tap.is_coordination_level() {
                    CO_EDGES
                } else {
                    CM_EDGES
                };
                self.add_path(&mut sub, t1, t2, ordering);
                let observing = match tap {
                    Tap::NonMonoReadCO | Tap::NonMonoReadCM => &[EdgeKind::Wr][..],
                    _ => CO_EDGES,
                };
                self.add_path(&mut sub, t2, t3, observing);
                self.expand_commit_edges(&mut sub);
            }
            _ => (),
        }
        self.to_dot(tap, &sub)
    }

    fn add_path(&self, sub: &mut Subgraph<K>, from: NodeIdx, to: NodeIdx, kinds: &[EdgeKind]) {
        if let Some(hops) = self.graph.path(from, to, kinds) {
            for (src, dst, edge) in hops {
                sub.add(src, dst, edge.clone());
            }
        }
    }

    /// A commit edge `t -> t1` exists because some `t2` read from `t1` while `t` reached
    /// `t2`. Adds both of those facts for every commit edge, including ones the expansion
    /// itself introduces.
    fn expand_commit_edges(&self, sub: &mut Subgraph<K>) {
        let mut expanded = HashSet::new();
        loop {
            let next = sub
                .edges
                .iter()
                .filter(|(_, _, edge)| edge.kind == EdgeKind::Cm)
                .map(|&(t, t1, _)| (t, t1))
                .find(|pair| !expanded.contains(pair));
            let (t, t1) = match next {
                None => break,
                Some(pair) => pair,
            };
            expanded.insert((t, t1));
            if let Some(&t2) = self.cm_causes.get(&(t, t1)) {
                self.add_path(sub, t1, t2, &[EdgeKind::Wr]);
                self.add_path(sub, t, t2, CO_EDGES);
            }
        }
    }

    fn to_dot(&self, tap: Tap, sub: &Subgraph<K>) -> String {
        let mut dot = String::new();
        let _ = writeln!(dot, "digraph {tap} {{");
        for &node in &sub.nodes {
            let txn = self.graph.node(node).txn;
            let ops: Vec<_> = txn.ops().iter().map(|op| op.to_string()).collect();
            let _ = writeln!(
                dot,
                "  \"{}\" [ops=\"[{}]\"];",
                txn.id(),
                escape(&ops.join(", "))
            );
        }
        for (src, dst, edge) in &sub.edges {
            let _ = writeln!(
                dot,
                "  \"{}\" -> \"{}\" [label=\"{}\"];",
                self.graph.node(*src).txn.id(),
                self.graph.node(*dst).txn.id(),
                escape(&edge.to_string())
            );
        }
        dot.push_str("}\n");
        dot
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
