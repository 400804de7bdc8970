//! Reachability traversals
//!
//! Ancestors, descendants and their variants. Each traversal fetches the
//! reachable edge set once, then expands it tier by tier in process.
//!
//! Ordering: ancestors come farthest first (deepest tier descending, then
//! id), descendants nearest first (deepest tier ascending, then id). The
//! tier of a node is the length of the longest admitted walk that reaches
//! it within `max_depth`.

use crate::engine::DagEngine;
use crate::error::Result;
use crate::filter::{ResolvedFilter, TraversalFilter};
use crate::index::EdgeIndex;
use crate::node::{Direction, Edge, NodeId};
use crate::repository::EdgeRepository;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A node with its ancestors or descendants nested below it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree<N> {
    pub node: N,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Tree<N>>,
}

impl<N> Tree<N> {
    pub fn leaf(node: N) -> Self {
        Self {
            node,
            children: Vec::new(),
        }
    }

    /// Number of nodes in the tree, counting repeats
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(Tree::size).sum::<usize>()
    }
}

/// Order tiered reachability results
pub(crate) fn ordered_tiers<N: NodeId>(
    tiers: impl IntoIterator<Item = (N, u32)>,
    direction: Direction,
) -> Vec<(N, u32)> {
    let mut nodes: Vec<(N, u32)> = tiers.into_iter().collect();
    match direction {
        Direction::Incoming => nodes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0))),
        _ => nodes.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0))),
    }
    nodes
}

impl<N: NodeId, R: EdgeRepository<N>> DagEngine<N, R> {
    /// Fetch and expand in one direction, returning the index and the
    /// ordered `(node, depth)` pairs
    pub(crate) async fn reach(
        &self,
        node: &N,
        direction: Direction,
        filter: &ResolvedFilter<'_, N>,
    ) -> Result<(EdgeIndex<N>, Vec<(N, u32)>)> {
        let index = self.load_reachable(node, direction, filter.max_depth).await?;
        let tiers = index.expand_tiers(node, direction, filter);
        Ok((index, ordered_tiers(tiers, direction)))
    }

    async fn reach_nodes(
        &self,
        node: &N,
        direction: Direction,
        filter: &TraversalFilter<N>,
    ) -> Result<Vec<N>> {
        let resolved = self.resolve(filter)?;
        tracing::debug!(
            "Traversing {:?} from {} (depth={})",
            direction,
            node,
            resolved.max_depth
        );
        let (_, nodes) = self.reach(node, direction, &resolved).await?;
        Ok(nodes.into_iter().map(|(n, _)| n).collect())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ancestors / Descendants
    // ─────────────────────────────────────────────────────────────────────────

    /// Nodes reachable by following edges backward, farthest first
    pub async fn ancestors(&self, node: &N, filter: &TraversalFilter<N>) -> Result<Vec<N>> {
        self.reach_nodes(node, Direction::Incoming, filter).await
    }

    /// Nodes reachable by following edges forward, nearest first
    pub async fn descendants(&self, node: &N, filter: &TraversalFilter<N>) -> Result<Vec<N>> {
        self.reach_nodes(node, Direction::Outgoing, filter).await
    }

    /// `node` followed by its ancestors, nearest first
    pub async fn self_and_ancestors(&self, node: &N, filter: &TraversalFilter<N>) -> Result<Vec<N>> {
        let ancestors = self.ancestors(node, filter).await?;
        Ok(std::iter::once(node.clone())
            .chain(ancestors.into_iter().rev())
            .collect())
    }

    /// Ancestors, farthest first, followed by `node`
    pub async fn ancestors_and_self(&self, node: &N, filter: &TraversalFilter<N>) -> Result<Vec<N>> {
        let mut nodes = self.ancestors(node, filter).await?;
        nodes.push(node.clone());
        Ok(nodes)
    }

    /// `node` followed by its descendants
    pub async fn self_and_descendants(
        &self,
        node: &N,
        filter: &TraversalFilter<N>,
    ) -> Result<Vec<N>> {
        let descendants = self.descendants(node, filter).await?;
        Ok(std::iter::once(node.clone()).chain(descendants).collect())
    }

    /// Descendants followed by `node`
    pub async fn descendants_and_self(
        &self,
        node: &N,
        filter: &TraversalFilter<N>,
    ) -> Result<Vec<N>> {
        let mut nodes = self.descendants(node, filter).await?;
        nodes.push(node.clone());
        Ok(nodes)
    }

    /// Ancestors, then `node`, then descendants
    pub async fn clan(&self, node: &N, filter: &TraversalFilter<N>) -> Result<Vec<N>> {
        let mut nodes = self.ancestors_and_self(node, filter).await?;
        nodes.extend(self.descendants(node, filter).await?);
        Ok(nodes)
    }

    pub async fn ancestors_count(&self, node: &N, filter: &TraversalFilter<N>) -> Result<usize> {
        Ok(self.ancestors(node, filter).await?.len())
    }

    pub async fn descendants_count(&self, node: &N, filter: &TraversalFilter<N>) -> Result<usize> {
        Ok(self.descendants(node, filter).await?.len())
    }

    pub async fn clan_count(&self, node: &N, filter: &TraversalFilter<N>) -> Result<usize> {
        Ok(self.clan(node, filter).await?.len())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Neighbourhood
    // ─────────────────────────────────────────────────────────────────────────

    /// Every node connected to `node` ignoring direction, including itself,
    /// ordered by hop distance then id
    pub async fn connected_graph(&self, node: &N, filter: &TraversalFilter<N>) -> Result<Vec<N>> {
        let resolved = self.resolve(filter)?;
        let index = self
            .load_reachable(node, Direction::Both, resolved.max_depth)
            .await?;
        let mut nodes: Vec<(N, u32)> = index
            .hop_distances(node, Direction::Both, &resolved)
            .into_iter()
            .collect();
        nodes.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        Ok(nodes.into_iter().map(|(n, _)| n).collect())
    }

    /// Nodes one hop away in `direction`, then the nodes one hop back from those
    async fn second_hop(&self, node: &N, direction: Direction) -> Result<Vec<N>> {
        let first: Vec<N> = self
            .repository()
            .edges_touching(std::slice::from_ref(node), direction)
            .await?
            .into_iter()
            .map(|e| e.other_end(node).clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if first.is_empty() {
            return Ok(Vec::new());
        }

        let back = direction.reverse();
        let mut nodes: Vec<N> = self
            .repository()
            .edges_touching(&first, back)
            .await?
            .into_iter()
            .map(|e| match back {
                Direction::Outgoing => e.child,
                _ => e.parent,
            })
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        nodes.sort();
        Ok(nodes)
    }

    /// Nodes sharing a parent with `node`, including `node` when it has a parent
    pub async fn siblings_with_self(&self, node: &N) -> Result<Vec<N>> {
        self.second_hop(node, Direction::Incoming).await
    }

    /// Nodes sharing a parent with `node`
    pub async fn siblings(&self, node: &N) -> Result<Vec<N>> {
        let mut nodes = self.siblings_with_self(node).await?;
        nodes.retain(|n| n != node);
        Ok(nodes)
    }

    /// Nodes sharing a child with `node`, including `node` when it has a child
    pub async fn partners_with_self(&self, node: &N) -> Result<Vec<N>> {
        self.second_hop(node, Direction::Outgoing).await
    }

    /// Nodes sharing a child with `node`
    pub async fn partners(&self, node: &N) -> Result<Vec<N>> {
        let mut nodes = self.partners_with_self(node).await?;
        nodes.retain(|n| n != node);
        Ok(nodes)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Roots and leaves of a node
    // ─────────────────────────────────────────────────────────────────────────

    /// Ancestors without parents, or `[node]` when it has no ancestors
    pub async fn roots_of(&self, node: &N, filter: &TraversalFilter<N>) -> Result<Vec<N>> {
        self.ends_of(node, Direction::Incoming, filter).await
    }

    /// Descendants without children, or `[node]` when it has no descendants
    pub async fn leaves_of(&self, node: &N, filter: &TraversalFilter<N>) -> Result<Vec<N>> {
        self.ends_of(node, Direction::Outgoing, filter).await
    }

    async fn ends_of(
        &self,
        node: &N,
        direction: Direction,
        filter: &TraversalFilter<N>,
    ) -> Result<Vec<N>> {
        let resolved = self.resolve(filter)?;
        let (index, reached) = self.reach(node, direction, &resolved).await?;
        if reached.is_empty() {
            return Ok(vec![node.clone()]);
        }

        let has_next = |n: &N| match direction {
            Direction::Incoming => index.has_parents(n),
            _ => index.has_children(n),
        };
        let candidates: Vec<N> = reached
            .into_iter()
            .map(|(n, _)| n)
            .filter(|n| !has_next(n))
            .collect();

        // Nodes at the depth boundary may have edges the fetch did not cover
        let beyond: HashSet<N> = self
            .repository()
            .edges_touching(&candidates, direction)
            .await?
            .into_iter()
            .map(|e| match direction {
                Direction::Incoming => e.child,
                _ => e.parent,
            })
            .collect();

        let mut ends: Vec<N> = candidates
            .into_iter()
            .filter(|n| !beyond.contains(n))
            .collect();
        ends.sort();
        Ok(ends)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Trees
    // ─────────────────────────────────────────────────────────────────────────

    /// Descendants nested under `node`; shared descendants repeat under each parent
    pub async fn descendants_tree(&self, node: &N, filter: &TraversalFilter<N>) -> Result<Tree<N>> {
        let resolved = self.resolve(filter)?;
        let index = self
            .load_reachable(node, Direction::Outgoing, resolved.max_depth)
            .await?;
        Ok(build_tree(&index, node, Direction::Outgoing, &resolved, 0))
    }

    /// Ancestors nested under `node`; shared ancestors repeat under each child
    pub async fn ancestors_tree(&self, node: &N, filter: &TraversalFilter<N>) -> Result<Tree<N>> {
        let resolved = self.resolve(filter)?;
        let index = self
            .load_reachable(node, Direction::Incoming, resolved.max_depth)
            .await?;
        Ok(build_tree(&index, node, Direction::Incoming, &resolved, 0))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Edge sets
    // ─────────────────────────────────────────────────────────────────────────

    /// Edges among `node` and its descendants, root-side first
    pub async fn descendants_edges(
        &self,
        node: &N,
        filter: &TraversalFilter<N>,
    ) -> Result<Vec<Edge<N>>> {
        let resolved = self.resolve(filter)?;
        let (index, reached) = self.reach(node, Direction::Outgoing, &resolved).await?;
        let ordered: Vec<N> = std::iter::once(node.clone())
            .chain(reached.into_iter().map(|(n, _)| n))
            .collect();
        Ok(edges_among(&index, &ordered, &resolved))
    }

    /// Edges among `node` and its ancestors, root-side first
    pub async fn ancestors_edges(
        &self,
        node: &N,
        filter: &TraversalFilter<N>,
    ) -> Result<Vec<Edge<N>>> {
        let resolved = self.resolve(filter)?;
        let (index, reached) = self.reach(node, Direction::Incoming, &resolved).await?;
        let ordered: Vec<N> = reached
            .into_iter()
            .map(|(n, _)| n)
            .chain(std::iter::once(node.clone()))
            .collect();
        Ok(edges_among(&index, &ordered, &resolved))
    }

    /// Ancestor edges followed by descendant edges
    pub async fn clan_edges(&self, node: &N, filter: &TraversalFilter<N>) -> Result<Vec<Edge<N>>> {
        let mut edges = self.ancestors_edges(node, filter).await?;
        let seen: HashSet<_> = edges.iter().map(|e| e.id).collect();
        edges.extend(
            self.descendants_edges(node, filter)
                .await?
                .into_iter()
                .filter(|e| !seen.contains(&e.id)),
        );
        Ok(edges)
    }
}

fn build_tree<N: NodeId>(
    index: &EdgeIndex<N>,
    node: &N,
    direction: Direction,
    filter: &ResolvedFilter<'_, N>,
    depth: u32,
) -> Tree<N> {
    let mut tree = Tree::leaf(node.clone());
    if depth >= filter.max_depth {
        return tree;
    }
    let mut seen: HashSet<&N> = HashSet::new();
    for (next, _) in index.admitted(node, direction, filter) {
        if seen.insert(next) {
            tree.children
                .push(build_tree(index, next, direction, filter, depth + 1));
        }
    }
    tree
}

/// Admitted edges with both endpoints in `ordered`, sorted by endpoint position
fn edges_among<N: NodeId>(
    index: &EdgeIndex<N>,
    ordered: &[N],
    filter: &ResolvedFilter<'_, N>,
) -> Vec<Edge<N>> {
    let position: HashMap<&N, usize> = ordered.iter().enumerate().map(|(i, n)| (n, i)).collect();
    let mut edges: Vec<(usize, usize, &Edge<N>)> = index
        .edges()
        .iter()
        .filter(|e| filter.admits_edge(e))
        .filter_map(|e| Some((*position.get(&e.parent)?, *position.get(&e.child)?, e)))
        .collect();
    edges.sort_by(|a, b| (a.0, a.1, a.2.id).cmp(&(b.0, b.1, b.2.id)));
    edges.into_iter().map(|(_, _, e)| e.clone()).collect()
}
