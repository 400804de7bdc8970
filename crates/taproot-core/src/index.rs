//! In-process adjacency over a fetched edge set
//!
//! Engines fetch the edges they need in one repository call and expand
//! over an [`EdgeIndex`]. Adjacency lists are sorted by neighbour id then
//! edge id, so every expansion is deterministic.

use crate::filter::ResolvedFilter;
use crate::node::{Direction, Edge, EdgeId, NodeId};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Adjacency index over a set of edges
#[derive(Debug, Clone)]
pub struct EdgeIndex<N> {
    edges: Vec<Edge<N>>,
    outgoing: HashMap<N, Vec<usize>>,
    incoming: HashMap<N, Vec<usize>>,
}

impl<N: NodeId> EdgeIndex<N> {
    pub fn new(edges: Vec<Edge<N>>) -> Self {
        let mut outgoing: HashMap<N, Vec<usize>> = HashMap::new();
        let mut incoming: HashMap<N, Vec<usize>> = HashMap::new();

        for (i, edge) in edges.iter().enumerate() {
            outgoing.entry(edge.parent.clone()).or_default().push(i);
            incoming.entry(edge.child.clone()).or_default().push(i);
        }
        for list in outgoing.values_mut() {
            list.sort_by(|&a, &b| {
                (&edges[a].child, edges[a].id).cmp(&(&edges[b].child, edges[b].id))
            });
        }
        for list in incoming.values_mut() {
            list.sort_by(|&a, &b| {
                (&edges[a].parent, edges[a].id).cmp(&(&edges[b].parent, edges[b].id))
            });
        }

        Self {
            edges,
            outgoing,
            incoming,
        }
    }

    pub fn edges(&self) -> &[Edge<N>] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Edges leaving `node`, ordered by child
    pub fn outgoing(&self, node: &N) -> impl Iterator<Item = &Edge<N>> + '_ {
        self.outgoing
            .get(node)
            .into_iter()
            .flatten()
            .map(move |&i| &self.edges[i])
    }

    /// Edges entering `node`, ordered by parent
    pub fn incoming(&self, node: &N) -> impl Iterator<Item = &Edge<N>> + '_ {
        self.incoming
            .get(node)
            .into_iter()
            .flatten()
            .map(move |&i| &self.edges[i])
    }

    pub fn has_parents(&self, node: &N) -> bool {
        self.incoming.get(node).is_some_and(|l| !l.is_empty())
    }

    pub fn has_children(&self, node: &N) -> bool {
        self.outgoing.get(node).is_some_and(|l| !l.is_empty())
    }

    /// Nodes with at least one edge, in id order
    pub fn nodes(&self) -> Vec<N> {
        let mut nodes: Vec<N> = self
            .outgoing
            .keys()
            .chain(self.incoming.keys())
            .cloned()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        nodes.sort();
        nodes
    }

    /// Neighbours of `node` in `direction`, unfiltered, ordered by neighbour id
    pub fn neighbors<'a>(
        &'a self,
        node: &'a N,
        direction: Direction,
    ) -> Box<dyn Iterator<Item = (&'a N, &'a Edge<N>)> + 'a> {
        match direction {
            Direction::Outgoing => Box::new(self.outgoing(node).map(|e| (&e.child, e))),
            Direction::Incoming => Box::new(self.incoming(node).map(|e| (&e.parent, e))),
            Direction::Both => {
                let mut all: Vec<(&N, &Edge<N>)> = self
                    .outgoing(node)
                    .map(|e| (&e.child, e))
                    .chain(self.incoming(node).map(|e| (&e.parent, e)))
                    .collect();
                all.sort_by(|a, b| (a.0, a.1.id).cmp(&(b.0, b.1.id)));
                Box::new(all.into_iter())
            }
        }
    }

    /// Neighbours the filter lets the traversal follow and enter
    pub fn admitted<'a>(
        &'a self,
        node: &'a N,
        direction: Direction,
        filter: &'a ResolvedFilter<'a, N>,
    ) -> impl Iterator<Item = (&'a N, &'a Edge<N>)> + 'a {
        self.neighbors(node, direction)
            .filter(move |(next, edge)| filter.admits_edge(edge) && filter.admits_node(next))
    }

    /// Tiered breadth-first expansion from `start`.
    ///
    /// Returns every node reached within `filter.max_depth` hops mapped to
    /// the deepest tier it appeared in, i.e. the length of the longest
    /// admitted walk from `start` that stays within the bound. `start`
    /// itself is only included if it is reached again through an edge.
    pub fn expand_tiers(
        &self,
        start: &N,
        direction: Direction,
        filter: &ResolvedFilter<'_, N>,
    ) -> BTreeMap<N, u32> {
        let mut deepest: BTreeMap<N, u32> = BTreeMap::new();
        let mut tier: Vec<N> = vec![start.clone()];
        let mut depth = 0;

        while !tier.is_empty() && depth < filter.max_depth {
            depth += 1;
            let mut next_tier: Vec<N> = Vec::new();
            let mut in_tier: HashSet<N> = HashSet::new();

            for node in &tier {
                for (next, _) in self.admitted(node, direction, filter) {
                    if in_tier.insert(next.clone()) {
                        next_tier.push(next.clone());
                    }
                }
            }
            for node in &next_tier {
                deepest.insert(node.clone(), depth);
            }
            tier = next_tier;
        }

        deepest.remove(start);
        deepest
    }

    /// Shortest hop distance from `start` to every node within the bound
    pub fn hop_distances(
        &self,
        start: &N,
        direction: Direction,
        filter: &ResolvedFilter<'_, N>,
    ) -> HashMap<N, u32> {
        let mut dist: HashMap<N, u32> = HashMap::new();
        let mut queue: VecDeque<(N, u32)> = VecDeque::new();

        dist.insert(start.clone(), 0);
        queue.push_back((start.clone(), 0));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= filter.max_depth {
                continue;
            }
            for (next, _) in self.admitted(&current, direction, filter) {
                if !dist.contains_key(next) {
                    dist.insert(next.clone(), depth + 1);
                    queue.push_back((next.clone(), depth + 1));
                }
            }
        }

        dist
    }

    /// Whether `to` is reachable from `from` along `direction`, unbounded,
    /// skipping the edges in `ignoring`
    pub fn reaches(&self, from: &N, to: &N, direction: Direction, ignoring: &HashSet<EdgeId>) -> bool {
        if from == to {
            return true;
        }
        let mut visited: HashSet<&N> = HashSet::new();
        let mut stack: Vec<&N> = vec![from];
        visited.insert(from);

        while let Some(current) = stack.pop() {
            for (next, edge) in self.neighbors(current, direction) {
                if ignoring.contains(&edge.id) {
                    continue;
                }
                if next == to {
                    return true;
                }
                if visited.insert(next) {
                    stack.push(next);
                }
            }
        }
        false
    }

    /// First edge in `candidates` whose child already reaches its parent
    pub fn closing_edge<'a>(&self, candidates: &'a [Edge<N>]) -> Option<&'a Edge<N>> {
        let none = HashSet::new();
        candidates
            .iter()
            .find(|e| self.reaches(&e.child, &e.parent, Direction::Outgoing, &none))
    }
}
