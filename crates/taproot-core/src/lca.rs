//! Lowest common ancestors

use crate::engine::DagEngine;
use crate::error::Result;
use crate::filter::{ResolvedFilter, TraversalFilter};
use crate::index::EdgeIndex;
use crate::limits::UNBOUNDED_DEPTH;
use crate::node::{Direction, NodeId};
use crate::repository::EdgeRepository;
use std::collections::{HashSet, VecDeque};

/// Members of `common` with an admitted path to another member.
///
/// `lineage` must hold every edge between ancestors of one endpoint, so a
/// walk upward from the common set sees every such path in full.
fn dominated<N: NodeId>(
    lineage: &EdgeIndex<N>,
    common: &HashSet<N>,
    filter: &ResolvedFilter<'_, N>,
) -> HashSet<N> {
    let mut seen: HashSet<&N> = HashSet::new();
    let mut queue: VecDeque<&N> = common.iter().collect();
    while let Some(node) = queue.pop_front() {
        for (parent, _) in lineage.admitted(node, Direction::Incoming, filter) {
            if seen.insert(parent) {
                queue.push_back(parent);
            }
        }
    }
    seen.into_iter()
        .filter(|n| common.contains(*n))
        .cloned()
        .collect()
}

impl<N: NodeId, R: EdgeRepository<N>> DagEngine<N, R> {
    /// Common ancestors of `a` and `b` (each counted as its own ancestor)
    /// that are not ancestors of another common ancestor, in id order.
    ///
    /// `max_depth` bounds which ancestors count as common. The check that
    /// no returned node is an ancestor of another is not bounded by it.
    /// Empty when the two share nothing within `max_depth`.
    pub async fn lowest_common_ancestors(
        &self,
        a: &N,
        b: &N,
        filter: &TraversalFilter<N>,
    ) -> Result<Vec<N>> {
        if a == b {
            return Ok(vec![a.clone()]);
        }
        let resolved = self.resolve(filter)?;
        tracing::debug!("LCA of {} and {} (depth={})", a, b, resolved.max_depth);

        let (_, reached_a) = self.reach(a, Direction::Incoming, &resolved).await?;
        let (_, reached_b) = self.reach(b, Direction::Incoming, &resolved).await?;

        let from_a: HashSet<N> = reached_a
            .into_iter()
            .map(|(n, _)| n)
            .chain(std::iter::once(a.clone()))
            .collect();
        let common: HashSet<N> = reached_b
            .into_iter()
            .map(|(n, _)| n)
            .chain(std::iter::once(b.clone()))
            .filter(|n| from_a.contains(n))
            .collect();
        if common.len() < 2 {
            return Ok(common.into_iter().collect());
        }

        // Any path between two common ancestors runs through ancestors of `a`
        let lineage = self
            .load_reachable(a, Direction::Incoming, UNBOUNDED_DEPTH)
            .await?;
        let dominated = dominated(&lineage, &common, &resolved);

        let mut lowest: Vec<N> = common
            .into_iter()
            .filter(|c| !dominated.contains(c))
            .collect();
        lowest.sort();
        Ok(lowest)
    }
}

#[cfg(test)]
mod tests {
    use crate::filter::TraversalFilter;
    use crate::testing::{engine_from, id, s, small_dag, ten_node_dag};

    fn all() -> TraversalFilter<String> {
        TraversalFilter::new()
    }

    #[tokio::test]
    async fn test_lca_small_dag() {
        let (engine, _) = small_dag();
        let cases = [
            ("root", "root", vec!["root"]),
            ("root", "a1", vec!["root"]),
            ("a1", "a2", vec!["root"]),
            ("b1", "b2", vec!["root"]),
            ("b1", "root", vec!["root"]),
            ("a1", "b1", vec!["a1"]),
        ];
        for (a, b, expected) in cases {
            let lca = engine
                .lowest_common_ancestors(&id(a), &id(b), &all())
                .await
                .unwrap();
            assert_eq!(lca, s(&expected), "lca({}, {})", a, b);
        }
    }

    #[tokio::test]
    async fn test_lca_disconnected() {
        let (engine, _) = small_dag();
        let lca = engine
            .lowest_common_ancestors(&id("root"), &id("island"), &all())
            .await
            .unwrap();
        assert!(lca.is_empty());
    }

    #[tokio::test]
    async fn test_lca_ten_node_dag() {
        let (engine, _) = ten_node_dag();
        let lca = engine
            .lowest_common_ancestors(&id("c1"), &id("c2"), &all())
            .await
            .unwrap();
        assert_eq!(lca, s(&["b3"]));

        let lca = engine
            .lowest_common_ancestors(&id("b1"), &id("b2"), &all())
            .await
            .unwrap();
        assert_eq!(lca, s(&["a1"]));

        let lca = engine
            .lowest_common_ancestors(&id("b2"), &id("c1"), &all())
            .await
            .unwrap();
        assert_eq!(lca, s(&["root"]));
    }

    #[tokio::test]
    async fn test_lca_diamond_has_two_answers() {
        let (engine, _) = engine_from(
            &[("p1", "m"), ("p1", "n"), ("p2", "m"), ("p2", "n")],
            &[],
        );
        let lca = engine
            .lowest_common_ancestors(&id("m"), &id("n"), &all())
            .await
            .unwrap();
        assert_eq!(lca, s(&["p1", "p2"]));
    }

    #[tokio::test]
    async fn test_lca_respects_depth() {
        let (engine, _) = engine_from(&[("r", "x"), ("x", "y"), ("r", "z")], &[]);
        let lca = engine
            .lowest_common_ancestors(&id("y"), &id("z"), &TraversalFilter::new().with_depth(1))
            .await
            .unwrap();
        assert!(lca.is_empty());

        let lca = engine
            .lowest_common_ancestors(&id("y"), &id("z"), &all())
            .await
            .unwrap();
        assert_eq!(lca, s(&["r"]));
    }

    #[tokio::test]
    async fn test_lca_depth_bound_keeps_antichain() {
        // x sits at the depth limit from a, so c -> x is only seen from b
        let (engine, _) = engine_from(
            &[
                ("x", "y"),
                ("y", "a"),
                ("c", "a"),
                ("c", "x"),
                ("x", "b"),
                ("c", "b"),
            ],
            &[],
        );
        let lca = engine
            .lowest_common_ancestors(&id("a"), &id("b"), &TraversalFilter::new().with_depth(2))
            .await
            .unwrap();
        assert_eq!(lca, s(&["x"]));

        let lca = engine
            .lowest_common_ancestors(&id("a"), &id("b"), &all())
            .await
            .unwrap();
        assert_eq!(lca, s(&["x"]));
    }

    #[tokio::test]
    async fn test_lca_drops_ancestor_linked_beyond_depth() {
        // c reaches x only through z, which is outside the depth bound
        let (engine, _) = engine_from(
            &[
                ("x", "a"),
                ("x", "b"),
                ("c", "a"),
                ("c", "b"),
                ("c", "z"),
                ("z", "w"),
                ("w", "x"),
            ],
            &[],
        );
        let lca = engine
            .lowest_common_ancestors(&id("a"), &id("b"), &TraversalFilter::new().with_depth(1))
            .await
            .unwrap();
        assert_eq!(lca, s(&["x"]));
    }
}
