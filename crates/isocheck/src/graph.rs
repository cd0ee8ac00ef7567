use {
    isocheck_core::Transaction,
    std::{
        collections::{hash_map::Entry, HashMap, HashSet, VecDeque},
        fmt::{self, Debug, Display, Formatter},
    },
    tree_clock::TreeClock,
};

pub(crate) type NodeIdx = usize;

/// Selects which of a node's two clocks a query or update refers to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Order {
    /// Reachability over session order and write-read edges.
    Coordination,
    /// Reachability once derived commit-order edges are added as well.
    Commit,
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) enum EdgeKind {
    So,
    Wr,
    Cm,
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub(crate) struct Edge<K> {
    pub(crate) kind: EdgeKind,
    pub(crate) key: Option<K>,
}

impl<K> Edge<K> {
    pub(crate) fn session_order() -> Self {
        Edge {
            kind: EdgeKind::So,
            key: None,
        }
    }

    pub(crate) fn write_read(key: K) -> Self {
        Edge {
            kind: EdgeKind::Wr,
            key: Some(key),
        }
    }

    pub(crate) fn commit(key: K) -> Self {
        Edge {
            kind: EdgeKind::Cm,
            key: Some(key),
        }
    }
}

impl<K: Debug> Display for Edge<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            EdgeKind::So => "SO",
            EdgeKind::Wr => "WR",
            EdgeKind::Cm => "WW",
        };
        match &self.key {
            None => f.write_str(kind),
            Some(key) => write!(f, "{kind} {key:?}"),
        }
    }
}

pub(crate) struct Node<'h, K, V> {
    pub(crate) txn: &'h Transaction<K, V>,
    pub(crate) co: TreeClock,
    pub(crate) cm: TreeClock,
}

impl<'h, K, V> Node<'h, K, V> {
    /// Joins the session predecessor's coordination clock (if any), then bumps the session's
    /// own coordinate.
    pub(crate) fn new(
        txn: &'h Transaction<K, V>,
        session: usize,
        dim: usize,
        prev: Option<&TreeClock>,
    ) -> Self {
        let mut co = TreeClock::new(session, dim);
        if let Some(prev) = prev {
            co.join(prev);
        }
        co.increment_self(1);
        Node {
            txn,
            co,
            cm: TreeClock::new(session, dim),
        }
    }

    pub(crate) fn clock(&self, order: Order) -> &TreeClock {
        match order {
            Order::Coordination => &self.co,
            Order::Commit => &self.cm,
        }
    }

    fn clock_mut(&mut self, order: Order) -> &mut TreeClock {
        match order {
            Order::Coordination => &mut self.co,
            Order::Commit => &mut self.cm,
        }
    }
}

/// A directed multigraph over transactions. Parallel edges of different kinds between the same
/// pair are kept; the successor list holds each target once.
pub(crate) struct Graph<'h, K, V> {
    nodes: Vec<Node<'h, K, V>>,
    successors: Vec<Vec<NodeIdx>>,
    edges: HashMap<(NodeIdx, NodeIdx), Vec<Edge<K>>>,
    edge_count: usize,
}

impl<'h, K, V> Graph<'h, K, V> {
    pub(crate) fn with_capacity(
        capacity: usize,
    ) -> Result<Self, std::collections::TryReserveError> {
        let mut nodes = Vec::new();
        nodes.try_reserve_exact(capacity)?;
        let mut successors = Vec::new();
        successors.try_reserve_exact(capacity)?;
        Ok(Graph {
            nodes,
            successors,
            edges: HashMap::new(),
            edge_count: 0,
        })
    }

    pub(crate) fn add_node(&mut self, node: Node<'h, K, V>) -> NodeIdx {
        self.nodes.push(node);
        self.successors.push(Vec::new());
        self.nodes.len() - 1
    }

    pub(crate) fn add_edge(&mut self, src: NodeIdx, dst: NodeIdx, edge: Edge<K>) {
        match self.edges.entry((src, dst)) {
            Entry::Occupied(mut entry) => entry.get_mut().push(edge),
            Entry::Vacant(entry) => {
                entry.insert(vec![edge]);
                self.successors[src].push(dst);
            }
        }
        self.edge_count += 1;
    }

    pub(crate) fn node(&self, idx: NodeIdx) -> &Node<'h, K, V> {
        &self.nodes[idx]
    }

    pub(crate) fn nodes(&self) -> &[Node<'h, K, V>] {
        &self.nodes
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub(crate) fn successors(&self, idx: NodeIdx) -> &[NodeIdx] {
        &self.successors[idx]
    }

    pub(crate) fn edges(&self, src: NodeIdx, dst: NodeIdx) -> &[Edge<K>] {
        self.edges.get(&(src, dst)).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `true` iff `src` reaches `dst` in the given order.
    pub(crate) fn reaches(&self, src: NodeIdx, dst: NodeIdx, order: Order) -> bool {
        self.nodes[dst]
            .clock(order)
            .dominates_or_equals(self.nodes[src].clock(order))
    }

    /// Folds the clock of `src` into the clock of `dst`.
    pub(crate) fn join(&mut self, dst: NodeIdx, src: NodeIdx, order: Order) {
        let src = self.nodes[src].clock(order).clone();
        self.nodes[dst].clock_mut(order).join(&src);
    }

    /// Pushes `origin`'s clock to every node reachable from it. Each node is visited at most
    /// once per call and successors that already dominate `origin` are not descended into.
    pub(crate) fn propagate(&mut self, origin: NodeIdx, order: Order) {
        let source = self.nodes[origin].clock(order).clone();
        let mut visited = HashSet::from([origin]);
        let mut stack = vec![origin];
        while let Some(cur) = stack.pop() {
            for i in 0..self.successors[cur].len() {
                let next = self.successors[cur][i];
                if visited.contains(&next) || self.nodes[next].clock(order).dominates_or_equals(&source)
                {
                    continue;
                }
                self.nodes[next].clock_mut(order).join(&source);
                visited.insert(next);
                stack.push(next);
            }
        }
    }

    /// Seeds every commit clock with a copy of the coordination clock.
    pub(crate) fn snapshot_commit_clocks(&mut self) {
        for node in &mut self.nodes {
            node.cm = node.co.clone();
        }
    }

    /// A shortest path from `from` to `to` using only edges of the given kinds, as a list of
    /// hops. An empty list means `from == to`.
    pub(crate) fn path(
        &self,
        from: NodeIdx,
        to: NodeIdx,
        kinds: &[EdgeKind],
    ) -> Option<Vec<(NodeIdx, NodeIdx, &Edge<K>)>> {
        let mut parents: HashMap<NodeIdx, (NodeIdx, &Edge<K>)> = HashMap::new();
        let mut queue = VecDeque::from([from]);
        let mut seen = HashSet::from([from]);
        while let Some(cur) = queue.pop_front() {
            if cur == to {
                break;
            }
            for &next in &self.successors[cur] {
                let edge = match self
                    .edges(cur, next)
                    .iter()
                    .find(|edge| kinds.contains(&edge.kind))
                {
                    None => continue,
                    Some(edge) => edge,
                };
                if seen.insert(next) {
                    parents.insert(next, (cur, edge));
                    queue.push_back(next);
                }
            }
        }
        if !seen.contains(&to) {
            return None;
        }
        let mut hops = Vec::new();
        let mut cur = to;
        while let Some(&(parent, edge)) = parents.get(&cur) {
            hops.push((parent, cur, edge));
            cur = parent;
        }
        hops.reverse();
        Some(hops)
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        isocheck_core::{history, History, TxnId},
    };

    fn chain_history() -> History<u64, u64> {
        history! {
            0 => [1 => [], 2 => [], 3 => []],
            1 => [4 => [], 5 => []],
        }
    }

    fn build<'h>(h: &'h History<u64, u64>) -> Graph<'h, u64, u64> {
        let mut graph = Graph::with_capacity(h.transaction_count()).unwrap();
        let mut prev: HashMap<usize, NodeIdx> = HashMap::new();
        let sessions: Vec<_> = h.sessions().map(|s| s.id()).collect();
        for txn in h.flat_transactions() {
            let ordinal = sessions.iter().position(|s| *s == txn.session()).unwrap();
            let p = prev.get(&ordinal).copied();
            let node = Node::new(txn, ordinal, sessions.len(), p.map(|p| &graph.node(p).co));
            let idx = graph.add_node(node);
            if let Some(p) = p {
                graph.add_edge(p, idx, Edge::session_order());
            }
            prev.insert(ordinal, idx);
        }
        graph
    }

    fn idx(graph: &Graph<'_, u64, u64>, txn: i64) -> NodeIdx {
        graph
            .nodes()
            .iter()
            .position(|n| n.txn.id() == TxnId::from(txn))
            .unwrap()
    }

    #[test]
    fn session_order_is_reachability() {
        let h = chain_history();
        let graph = build(&h);
        let (t1, t3, t4) = (idx(&graph, 1), idx(&graph, 3), idx(&graph, 4));
        assert!(graph.reaches(t1, t3, Order::Coordination));
        assert!(!graph.reaches(t3, t1, Order::Coordination));
        assert!(!graph.reaches(t1, t4, Order::Coordination));
        assert!(graph.reaches(t4, t4, Order::Coordination));
    }

    #[test]
    fn propagation_reaches_downstream_nodes() {
        let h = chain_history();
        let mut graph = build(&h);
        let (t2, t3, t4, t5) = (
            idx(&graph, 2),
            idx(&graph, 3),
            idx(&graph, 4),
            idx(&graph, 5),
        );
        graph.add_edge(t2, t4, Edge::write_read(7));
        graph.join(t4, t2, Order::Coordination);
        graph.propagate(t4, Order::Coordination);
        assert!(graph.reaches(t2, t5, Order::Coordination));
        assert!(!graph.reaches(t3, t5, Order::Coordination));

        // Commit clocks start as a snapshot and evolve independently.
        graph.snapshot_commit_clocks();
        graph.add_edge(t5, t3, Edge::commit(7));
        graph.propagate(t5, Order::Commit);
        assert!(graph.reaches(t5, t3, Order::Commit));
        assert!(!graph.reaches(t5, t3, Order::Coordination));
    }

    #[test]
    fn propagation_terminates_on_cycles() {
        let h = chain_history();
        let mut graph = build(&h);
        let (t1, t3) = (idx(&graph, 1), idx(&graph, 3));
        graph.add_edge(t3, t1, Edge::write_read(1));
        graph.join(t1, t3, Order::Coordination);
        graph.propagate(t1, Order::Coordination);
        assert!(graph.reaches(t1, t3, Order::Coordination));
        assert!(graph.reaches(t3, t1, Order::Coordination));
    }

    #[test]
    fn propagation_handles_long_chains() {
        let mut h: History<u64, u64> = History::new();
        for i in 0..50_000 {
            h.push_transaction(0.into(), i.into(), []);
        }
        let mut graph = build(&h);
        let last = graph.len() - 1;
        // Advance the head so that propagation has to walk the entire chain.
        graph.nodes[0].co.increment_self(1_000_000);
        graph.propagate(0, Order::Coordination);
        assert!(graph.reaches(0, last, Order::Coordination));
    }

    #[test]
    fn finds_shortest_typed_paths() {
        let h = chain_history();
        let mut graph = build(&h);
        let (t1, t2, t3, t5) = (
            idx(&graph, 1),
            idx(&graph, 2),
            idx(&graph, 3),
            idx(&graph, 5),
        );
        graph.add_edge(t2, t5, Edge::write_read(9));

        let hops = graph.path(t1, t5, &[EdgeKind::So, EdgeKind::Wr]).unwrap();
        let rendered: Vec<_> = hops.iter().map(|(_, _, e)| e.to_string()).collect();
        assert_eq!(rendered, vec!["SO", "WR 9"]);
        assert!(graph.path(t1, t5, &[EdgeKind::Wr]).is_none());
        assert!(graph.path(t3, t3, &[]).unwrap().is_empty());
        assert_eq!(graph.edges(t1, t2).len(), 1);
        assert_eq!(graph.edge_count(), 4);
    }
}
