//! Transitive reduction
//!
//! An edge `p -> c` is redundant when `c` is also reachable from `p`
//! through another child of `p`. Removing every redundant edge of a DAG at
//! once leaves reachability unchanged.

use crate::depth::{longest_depths, topological_order};
use crate::engine::DagEngine;
use crate::error::Result;
use crate::index::EdgeIndex;
use crate::node::{Edge, NodeId};
use crate::repository::{ChangeSet, EdgeRepository};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Outcome of [`DagEngine::transitive_reduction`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitiveReduction<N> {
    /// Redundant edges, sorted by (parent, child, edge id)
    pub redundant: Vec<Edge<N>>,
    /// Number of edges removed; 0 on a dry run
    pub deleted: usize,
}

/// Strict descendants of every node, filled leaf-side first
fn descendant_sets<N: NodeId>(order: &[N], index: &EdgeIndex<N>) -> HashMap<N, HashSet<N>> {
    let mut below: HashMap<N, HashSet<N>> = HashMap::with_capacity(order.len());
    for node in order.iter().rev() {
        let mut set = HashSet::new();
        for edge in index.outgoing(node) {
            set.insert(edge.child.clone());
            if let Some(further) = below.get(&edge.child) {
                set.extend(further.iter().cloned());
            }
        }
        below.insert(node.clone(), set);
    }
    below
}

impl<N: NodeId, R: EdgeRepository<N>> DagEngine<N, R> {
    /// Edges bypassed by a longer path between the same endpoints
    pub async fn redundant_edges(&self) -> Result<Vec<Edge<N>>> {
        let (nodes, index) = self.load_all().await?;
        let depths = longest_depths(&nodes, &index)?;
        let order = topological_order(&depths, &index);
        let below = descendant_sets(&order, &index);

        let mut redundant: Vec<Edge<N>> = index
            .edges()
            .iter()
            .filter(|edge| {
                index
                    .outgoing(&edge.parent)
                    .filter(|other| other.child != edge.child)
                    .any(|other| {
                        below
                            .get(&other.child)
                            .is_some_and(|set| set.contains(&edge.child))
                    })
            })
            .cloned()
            .collect();
        redundant.sort_by(|a, b| (&a.parent, &a.child, a.id).cmp(&(&b.parent, &b.child, b.id)));

        tracing::debug!(
            "Found {} redundant edges out of {}",
            redundant.len(),
            index.len()
        );
        Ok(redundant)
    }

    /// Find the redundant edges and, when `delete` is set, remove them all
    /// in one change set
    pub async fn transitive_reduction(&self, delete: bool) -> Result<TransitiveReduction<N>> {
        let redundant = self.redundant_edges().await?;
        if !delete || redundant.is_empty() {
            return Ok(TransitiveReduction {
                redundant,
                deleted: 0,
            });
        }

        let changes = redundant
            .iter()
            .fold(ChangeSet::new(), |changes, edge| changes.delete(edge.id));
        self.commit(changes).await?;
        tracing::info!("Transitive reduction removed {} edges", redundant.len());

        Ok(TransitiveReduction {
            deleted: redundant.len(),
            redundant,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::filter::TraversalFilter;
    use crate::repository::EdgeRepository;
    use crate::testing::{engine_from, id, s, small_dag};

    fn pairs(edges: &[crate::node::Edge<String>]) -> Vec<(String, String)> {
        edges
            .iter()
            .map(|e| (e.parent.clone(), e.child.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_triangle() {
        let (engine, repo) = engine_from(&[("A", "B"), ("B", "C"), ("A", "C")], &[]);
        let redundant = engine.redundant_edges().await.unwrap();
        assert_eq!(pairs(&redundant), vec![(id("A"), id("C"))]);

        let result = engine.transitive_reduction(true).await.unwrap();
        assert_eq!(result.deleted, 1);
        assert_eq!(repo.edge_count(), 2);
        assert!(engine
            .path_exists(&id("A"), &id("C"), &TraversalFilter::new())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_diamond_with_shortcut() {
        let (engine, repo) = engine_from(
            &[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D"), ("A", "D")],
            &[],
        );
        let dry = engine.transitive_reduction(false).await.unwrap();
        assert_eq!(pairs(&dry.redundant), vec![(id("A"), id("D"))]);
        assert_eq!(dry.deleted, 0);
        assert_eq!(repo.edge_count(), 5);

        let result = engine.transitive_reduction(true).await.unwrap();
        assert_eq!(result.deleted, 1);
        assert_eq!(repo.edge_count(), 4);
    }

    #[tokio::test]
    async fn test_chain_with_shortcuts() {
        let (engine, repo) = engine_from(
            &[
                ("A", "B"),
                ("B", "C"),
                ("C", "D"),
                ("A", "C"),
                ("A", "D"),
                ("B", "D"),
            ],
            &[],
        );
        let result = engine.transitive_reduction(true).await.unwrap();
        assert_eq!(
            pairs(&result.redundant),
            vec![(id("A"), id("C")), (id("A"), id("D")), (id("B"), id("D"))]
        );
        assert_eq!(result.deleted, 3);
        assert_eq!(pairs(&repo.edges().await.unwrap()).len(), 3);
        assert_eq!(
            engine
                .descendants(&id("A"), &TraversalFilter::new())
                .await
                .unwrap(),
            s(&["B", "C", "D"])
        );
    }

    #[tokio::test]
    async fn test_tree_has_nothing_to_reduce() {
        let (engine, repo) = engine_from(&[("r", "x"), ("r", "y"), ("x", "z")], &[]);
        let result = engine.transitive_reduction(true).await.unwrap();
        assert!(result.redundant.is_empty());
        assert_eq!(result.deleted, 0);
        assert_eq!(repo.edge_count(), 3);
    }

    #[tokio::test]
    async fn test_reduction_keeps_reachability() {
        let (engine, _) = small_dag();
        let before = engine
            .descendants(&id("root"), &TraversalFilter::new())
            .await
            .unwrap();
        engine.transitive_reduction(true).await.unwrap();
        let after = engine
            .descendants(&id("root"), &TraversalFilter::new())
            .await
            .unwrap();
        assert_eq!(before, after);
    }
}
