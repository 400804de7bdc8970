//! Graph-wide analytics
//!
//! Components, summary statistics, graph-wide roots and leaves, and the
//! structural predicates of a single node.

use crate::depth::longest_depths;
use crate::engine::DagEngine;
use crate::error::Result;
use crate::index::EdgeIndex;
use crate::node::{Direction, Edge, NodeId};
use crate::repository::EdgeRepository;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet, VecDeque};

/// Summary statistics of the whole graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    /// Nodes without parents, islands included
    pub root_count: usize,
    /// Nodes without children, islands included
    pub leaf_count: usize,
    pub island_count: usize,
    pub max_depth: u32,
    pub avg_depth: f64,
    /// `E / (V * (V - 1))`, 0 below two nodes
    pub density: f64,
    pub component_count: usize,
}

/// Every node, including those that only appear as edge endpoints
fn all_nodes<N: NodeId>(nodes: Vec<N>, index: &EdgeIndex<N>) -> Vec<N> {
    let mut set: BTreeSet<N> = nodes.into_iter().collect();
    set.extend(index.nodes());
    set.into_iter().collect()
}

/// Weakly connected components, each sorted, ordered by smallest member
fn components<N: NodeId>(nodes: &[N], index: &EdgeIndex<N>) -> Vec<Vec<N>> {
    let mut seen: HashSet<&N> = HashSet::with_capacity(nodes.len());
    let mut result = Vec::new();

    // nodes is sorted, so each component starts at its smallest id
    for start in nodes {
        if !seen.insert(start) {
            continue;
        }
        let mut component = vec![start.clone()];
        let mut queue: VecDeque<&N> = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for (next, _) in index.neighbors(current, Direction::Both) {
                if seen.insert(next) {
                    component.push(next.clone());
                    queue.push_back(next);
                }
            }
        }
        component.sort();
        result.push(component);
    }
    result
}

impl<N: NodeId, R: EdgeRepository<N>> DagEngine<N, R> {
    // ─────────────────────────────────────────────────────────────────────────
    // Graph-wide
    // ─────────────────────────────────────────────────────────────────────────

    /// Node sets of the weakly connected components; islands stand alone
    pub async fn connected_components(&self) -> Result<Vec<Vec<N>>> {
        let (nodes, index) = self.load_all().await?;
        let nodes = all_nodes(nodes, &index);
        let result = components(&nodes, &index);
        tracing::debug!("Found {} connected components", result.len());
        Ok(result)
    }

    pub async fn graph_stats(&self) -> Result<GraphStats> {
        let (nodes, index) = self.load_all().await?;
        let nodes = all_nodes(nodes, &index);
        let depths = longest_depths(&nodes, &index)?;

        let node_count = nodes.len();
        let edge_count = index.len();
        let root_count = nodes.iter().filter(|n| !index.has_parents(n)).count();
        let leaf_count = nodes.iter().filter(|n| !index.has_children(n)).count();
        let island_count = nodes
            .iter()
            .filter(|n| !index.has_parents(n) && !index.has_children(n))
            .count();
        let max_depth = depths.values().copied().max().unwrap_or(0);
        let avg_depth = if node_count == 0 {
            0.0
        } else {
            depths.values().map(|&d| f64::from(d)).sum::<f64>() / node_count as f64
        };
        let density = if node_count < 2 {
            0.0
        } else {
            edge_count as f64 / (node_count as f64 * (node_count - 1) as f64)
        };

        Ok(GraphStats {
            node_count,
            edge_count,
            root_count,
            leaf_count,
            island_count,
            max_depth,
            avg_depth,
            density,
            component_count: components(&nodes, &index).len(),
        })
    }

    /// Every node without parents, islands included
    pub async fn roots(&self) -> Result<Vec<N>> {
        let (nodes, index) = self.load_all().await?;
        Ok(all_nodes(nodes, &index)
            .into_iter()
            .filter(|n| !index.has_parents(n))
            .collect())
    }

    /// Every node without children, islands included
    pub async fn leaves(&self) -> Result<Vec<N>> {
        let (nodes, index) = self.load_all().await?;
        Ok(all_nodes(nodes, &index)
            .into_iter()
            .filter(|n| !index.has_children(n))
            .collect())
    }

    /// Nodes with no edges at all
    pub async fn islands(&self) -> Result<Vec<N>> {
        let (nodes, index) = self.load_all().await?;
        Ok(nodes
            .into_iter()
            .filter(|n| !index.has_parents(n) && !index.has_children(n))
            .collect())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Node predicates
    // ─────────────────────────────────────────────────────────────────────────

    async fn has_edges(&self, node: &N, direction: Direction) -> Result<bool> {
        Ok(!self
            .repository()
            .edges_touching(std::slice::from_ref(node), direction)
            .await?
            .is_empty())
    }

    /// Has children but no parents
    pub async fn is_root(&self, node: &N) -> Result<bool> {
        Ok(self.has_edges(node, Direction::Outgoing).await?
            && !self.has_edges(node, Direction::Incoming).await?)
    }

    /// Has parents but no children
    pub async fn is_leaf(&self, node: &N) -> Result<bool> {
        Ok(self.has_edges(node, Direction::Incoming).await?
            && !self.has_edges(node, Direction::Outgoing).await?)
    }

    /// Has neither parents nor children
    pub async fn is_island(&self, node: &N) -> Result<bool> {
        Ok(!self.has_edges(node, Direction::Both).await?)
    }

    pub async fn is_sibling_of(&self, node: &N, other: &N) -> Result<bool> {
        Ok(node != other && self.siblings(node).await?.contains(other))
    }

    pub async fn is_partner_of(&self, node: &N, other: &N) -> Result<bool> {
        Ok(node != other && self.partners(node).await?.contains(other))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Edge lists
    // ─────────────────────────────────────────────────────────────────────────

    /// Order edges root-side to leaf-side by the depth of their endpoints
    pub async fn sort_edges(&self, mut edges: Vec<Edge<N>>) -> Result<Vec<Edge<N>>> {
        let (nodes, index) = self.load_all().await?;
        let depths = longest_depths(&nodes, &index)?;
        let depth = |n: &N| depths.get(n).copied().unwrap_or(0);
        edges.sort_by(|a, b| {
            (depth(&a.parent), depth(&a.child), &a.parent, &a.child, a.id).cmp(&(
                depth(&b.parent),
                depth(&b.child),
                &b.parent,
                &b.child,
                b.id,
            ))
        });
        Ok(edges)
    }

    /// Whether the edges form one contiguous route, each child being the
    /// next edge's parent
    pub fn validate_route(&self, edges: &[Edge<N>]) -> bool {
        edges.windows(2).all(|pair| pair[0].child == pair[1].parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{engine_from, id, s, small_dag, ten_node_dag};

    #[tokio::test]
    async fn test_connected_components() {
        let (engine, _) = engine_from(&[("a", "b"), ("c", "b"), ("x", "y")], &["lonely"]);
        let parts = engine.connected_components().await.unwrap();
        assert_eq!(
            parts,
            vec![s(&["a", "b", "c"]), s(&["lonely"]), s(&["x", "y"])]
        );
    }

    #[tokio::test]
    async fn test_graph_stats() {
        let (engine, _) = small_dag();
        let stats = engine.graph_stats().await.unwrap();
        assert_eq!(stats.node_count, 7);
        assert_eq!(stats.edge_count, 6);
        assert_eq!(stats.root_count, 2);
        assert_eq!(stats.leaf_count, 3);
        assert_eq!(stats.island_count, 1);
        assert_eq!(stats.max_depth, 2);
        assert_eq!(stats.component_count, 2);
        assert!((stats.density - 6.0 / 42.0).abs() < 1e-9);
        // depths: root 0, island 0, a* 1, b* 2
        assert!((stats.avg_depth - 7.0 / 7.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_graph_stats_empty() {
        let (engine, _) = engine_from(&[], &[]);
        let stats = engine.graph_stats().await.unwrap();
        assert_eq!(stats.node_count, 0);
        assert_eq!(stats.density, 0.0);
        assert_eq!(stats.avg_depth, 0.0);
        assert_eq!(stats.component_count, 0);
    }

    #[tokio::test]
    async fn test_roots_leaves_islands() {
        let (engine, _) = small_dag();
        assert_eq!(engine.roots().await.unwrap(), s(&["island", "root"]));
        assert_eq!(engine.leaves().await.unwrap(), s(&["b1", "b2", "island"]));
        assert_eq!(engine.islands().await.unwrap(), s(&["island"]));
    }

    #[tokio::test]
    async fn test_node_predicates() {
        let (engine, _) = small_dag();
        assert!(engine.is_root(&id("root")).await.unwrap());
        assert!(!engine.is_root(&id("a1")).await.unwrap());
        assert!(!engine.is_root(&id("island")).await.unwrap());

        assert!(engine.is_leaf(&id("b1")).await.unwrap());
        assert!(!engine.is_leaf(&id("island")).await.unwrap());

        assert!(engine.is_island(&id("island")).await.unwrap());
        assert!(!engine.is_island(&id("a2")).await.unwrap());

        assert!(engine.is_sibling_of(&id("a1"), &id("a3")).await.unwrap());
        assert!(!engine.is_sibling_of(&id("a1"), &id("a1")).await.unwrap());
        assert!(!engine.is_sibling_of(&id("a1"), &id("b1")).await.unwrap());

        assert!(engine.is_partner_of(&id("a1"), &id("a2")).await.unwrap());
        assert!(!engine.is_partner_of(&id("a1"), &id("a3")).await.unwrap());
    }

    #[tokio::test]
    async fn test_sort_edges_and_route() {
        let (engine, repo) = ten_node_dag();
        let mut route: Vec<Edge<String>> = repo
            .edges()
            .await
            .unwrap()
            .into_iter()
            .filter(|e| {
                matches!(
                    (e.parent.as_str(), e.child.as_str()),
                    ("root", "a3") | ("a3", "b3") | ("b3", "c1")
                )
            })
            .collect();
        route.reverse();
        assert!(!engine.validate_route(&route));

        let sorted = engine.sort_edges(route).await.unwrap();
        let parents: Vec<&str> = sorted.iter().map(|e| e.parent.as_str()).collect();
        assert_eq!(parents, vec!["root", "a3", "b3"]);
        assert!(engine.validate_route(&sorted));
        assert!(engine.validate_route(&sorted[..1]));
        assert!(engine.validate_route(&[]));
    }
}
