//! Depth and topological ordering
//!
//! Depth is the length of the longest path from any root. The graph-wide
//! computation is a Kahn pass that also detects cycles left behind by a
//! disabled validator.

use crate::engine::DagEngine;
use crate::error::{Error, Result};
use crate::filter::TraversalFilter;
use crate::index::EdgeIndex;
use crate::node::{Direction, NodeId};
use crate::repository::EdgeRepository;
use std::collections::{BTreeSet, HashMap};

/// Longest-path depth of every node, with islands at depth 0.
///
/// Fails with [`Error::GraphNotAcyclic`] when some nodes sit on a cycle.
pub(crate) fn longest_depths<N: NodeId>(
    nodes: &[N],
    index: &EdgeIndex<N>,
) -> Result<HashMap<N, u32>> {
    let mut indegree: HashMap<N, usize> = nodes.iter().map(|n| (n.clone(), 0)).collect();
    for node in index.nodes() {
        indegree.entry(node).or_insert(0);
    }
    for edge in index.edges() {
        *indegree.entry(edge.child.clone()).or_insert(0) += 1;
    }

    let mut depth: HashMap<N, u32> = HashMap::with_capacity(indegree.len());
    let mut ready: BTreeSet<N> = indegree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(n, _)| n.clone())
        .collect();
    for node in &ready {
        depth.insert(node.clone(), 0);
    }

    while let Some(node) = ready.pop_first() {
        let base = depth.get(&node).copied().unwrap_or(0);
        for edge in index.outgoing(&node) {
            let child_depth = depth.entry(edge.child.clone()).or_insert(0);
            *child_depth = (*child_depth).max(base + 1);
            if let Some(remaining) = indegree.get_mut(&edge.child) {
                *remaining -= 1;
                if *remaining == 0 {
                    ready.insert(edge.child.clone());
                }
            }
        }
    }

    let stuck: Vec<&N> = indegree
        .iter()
        .filter(|(_, &d)| d > 0)
        .map(|(n, _)| n)
        .collect();
    if let Some(min) = stuck.iter().min() {
        return Err(Error::GraphNotAcyclic(format!(
            "{} nodes lie on or below a cycle, including {}",
            stuck.len(),
            min
        )));
    }

    Ok(depth)
}

/// Islands first, then (depth, id)
pub(crate) fn topological_order<N: NodeId>(
    depths: &HashMap<N, u32>,
    index: &EdgeIndex<N>,
) -> Vec<N> {
    let mut order: Vec<(bool, u32, &N)> = depths
        .iter()
        .map(|(n, &d)| {
            let connected = index.has_parents(n) || index.has_children(n);
            (connected, d, n)
        })
        .collect();
    order.sort();
    order.into_iter().map(|(_, _, n)| n.clone()).collect()
}

impl<N: NodeId, R: EdgeRepository<N>> DagEngine<N, R> {
    /// Longest-path distance from any root to `node` within `max_depth`.
    ///
    /// Roots and islands are at depth 0, and so is a node whose every path
    /// to a root is filtered away.
    pub async fn node_depth(&self, node: &N, filter: &TraversalFilter<N>) -> Result<u32> {
        let resolved = self.resolve(filter)?;
        let (_, ancestors) = self.reach(node, Direction::Incoming, &resolved).await?;
        let depth = ancestors.first().map(|(_, d)| *d).unwrap_or(0);
        tracing::debug!("Depth of {} is {}", node, depth);
        Ok(depth)
    }

    /// Every node such that each parent precedes its children.
    ///
    /// Islands come first, then nodes by depth and id. With `max_depth`,
    /// only nodes at most that deep are returned.
    pub async fn topological_sort(&self, max_depth: Option<u32>) -> Result<Vec<N>> {
        let (nodes, index) = self.load_all().await?;
        let depths = longest_depths(&nodes, &index)?;
        let mut order = topological_order(&depths, &index);
        if let Some(limit) = max_depth {
            order.retain(|n| depths.get(n).is_some_and(|&d| d <= limit));
        }
        tracing::debug!("Topological sort returned {} nodes", order.len());
        Ok(order)
    }

    /// `node` followed by its descendants in topological order
    pub async fn topological_descendants(
        &self,
        node: &N,
        filter: &TraversalFilter<N>,
    ) -> Result<Vec<N>> {
        self.self_and_descendants(node, filter).await
    }

    /// Ancestors with their longest in-bound distance from `node`, farthest first
    pub async fn ancestors_with_depth(
        &self,
        node: &N,
        filter: &TraversalFilter<N>,
    ) -> Result<Vec<(N, u32)>> {
        let resolved = self.resolve(filter)?;
        Ok(self.reach(node, Direction::Incoming, &resolved).await?.1)
    }

    /// Descendants with their longest in-bound distance from `node`, nearest first
    pub async fn descendants_with_depth(
        &self,
        node: &N,
        filter: &TraversalFilter<N>,
    ) -> Result<Vec<(N, u32)>> {
        let resolved = self.resolve(filter)?;
        Ok(self.reach(node, Direction::Outgoing, &resolved).await?.1)
    }
}
