//! Path algorithms
//!
//! Shortest path by hops (BFS), every simple path (tiered enumeration) and
//! minimum-weight path (Dijkstra over `(node, hops)` states so the depth
//! bound stays exact). A downward search runs first; when the filter is
//! not directional and nothing was found, the search is repeated upward.
//! Paths are always reported root-side to leaf-side.
//!
//! Ties between equally short (or equally light) paths go to the path whose
//! node sequence, read from the starting node, is lexicographically
//! smallest.

use crate::engine::DagEngine;
use crate::error::{Error, Result};
use crate::filter::{ResolvedFilter, TraversalFilter};
use crate::index::EdgeIndex;
use crate::limits::{self, DEFAULT_WEIGHT_FIELD};
use crate::node::{Direction, EdgeId, NodeId};
use crate::repository::EdgeRepository;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

/// A single path through the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPath<N> {
    /// Node ids, root-side first
    pub nodes: Vec<N>,

    /// Edges connecting the nodes, root-side first
    pub edges: Vec<EdgeId>,

    /// Summed weight for weighted paths, hop count otherwise
    pub total_weight: f64,

    /// Path length (number of edges)
    pub length: usize,
}

impl<N: NodeId> GraphPath<N> {
    fn single(node: N) -> Self {
        Self {
            nodes: vec![node],
            edges: Vec::new(),
            total_weight: 0.0,
            length: 0,
        }
    }

    /// Build from a sequence in search order
    fn from_search(
        mut nodes: Vec<N>,
        mut edges: Vec<EdgeId>,
        total_weight: f64,
        direction: Direction,
    ) -> Self {
        if direction == Direction::Incoming {
            nodes.reverse();
            edges.reverse();
        }
        Self {
            length: edges.len(),
            nodes,
            edges,
            total_weight,
        }
    }
}

/// State for the Dijkstra priority queue
#[derive(Clone, PartialEq)]
struct DijkstraState<N> {
    cost: f64,
    nodes: Vec<N>,
    edges: Vec<EdgeId>,
}

impl<N> DijkstraState<N> {
    fn hops(&self) -> usize {
        self.edges.len()
    }
}

impl<N: NodeId> Eq for DijkstraState<N> {}

impl<N: NodeId> Ord for DijkstraState<N> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.hops().cmp(&self.hops()))
            .then_with(|| other.nodes.cmp(&self.nodes))
    }
}

impl<N: NodeId> PartialOrd for DijkstraState<N> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<N: NodeId, R: EdgeRepository<N>> DagEngine<N, R> {
    /// Directions a path query searches, in order
    fn search_directions(filter: &ResolvedFilter<'_, N>) -> &'static [Direction] {
        if filter.directional() {
            &[Direction::Outgoing]
        } else {
            &[Direction::Outgoing, Direction::Incoming]
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Shortest path
    // ─────────────────────────────────────────────────────────────────────────

    /// Shortest path by hop count
    pub async fn path(&self, from: &N, to: &N, filter: &TraversalFilter<N>) -> Result<GraphPath<N>> {
        let resolved = self.resolve(filter)?;
        tracing::debug!(
            "Shortest path: {} -> {} (depth={}, directional={})",
            from,
            to,
            resolved.max_depth,
            resolved.directional()
        );

        if from == to {
            return Ok(GraphPath::single(from.clone()));
        }

        for &direction in Self::search_directions(&resolved) {
            let index = self
                .load_reachable(from, direction, resolved.max_depth)
                .await?;
            if let Some(path) = bfs_path(&index, from, to, direction, &resolved) {
                tracing::debug!("Found path of length {}", path.length);
                return Ok(path);
            }
        }

        Err(Error::not_reachable(from, to))
    }

    /// Whether any path exists; never fails on unreachability
    pub async fn path_exists(&self, from: &N, to: &N, filter: &TraversalFilter<N>) -> Result<bool> {
        match self.path(from, to, filter).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_reachable() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Hop count of the shortest path
    pub async fn distance(&self, from: &N, to: &N, filter: &TraversalFilter<N>) -> Result<usize> {
        Ok(self.path(from, to, filter).await?.length)
    }

    /// Whether `node` reaches `other` along edges
    pub async fn is_ancestor_of(&self, node: &N, other: &N, filter: &TraversalFilter<N>) -> Result<bool> {
        if node == other {
            return Ok(false);
        }
        let mut directional = filter.clone();
        directional.directional = true;
        self.path_exists(node, other, &directional).await
    }

    /// Whether `other` reaches `node` along edges
    pub async fn is_descendant_of(
        &self,
        node: &N,
        other: &N,
        filter: &TraversalFilter<N>,
    ) -> Result<bool> {
        self.is_ancestor_of(other, node, filter).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // All paths
    // ─────────────────────────────────────────────────────────────────────────

    /// Every simple path, shortest first, at most `max_results` of them
    /// and never more than [`DEFAULT_MAX_PATHS`](limits::DEFAULT_MAX_PATHS)
    pub async fn all_paths(
        &self,
        from: &N,
        to: &N,
        max_results: usize,
        filter: &TraversalFilter<N>,
    ) -> Result<Vec<GraphPath<N>>> {
        limits::validate_max_results(max_results)?;
        let max_results = max_results.min(limits::DEFAULT_MAX_PATHS);
        let resolved = self.resolve(filter)?;
        tracing::debug!(
            "All paths: {} -> {} (depth={}, max_results={})",
            from,
            to,
            resolved.max_depth,
            max_results
        );

        if from == to {
            return Ok(vec![GraphPath::single(from.clone())]);
        }

        for &direction in Self::search_directions(&resolved) {
            let index = self
                .load_reachable(from, direction, resolved.max_depth)
                .await?;
            let paths = enumerate_paths(&index, from, to, direction, &resolved, max_results);
            if !paths.is_empty() {
                tracing::debug!("Found {} paths", paths.len());
                return Ok(paths);
            }
        }

        Ok(Vec::new())
    }

    /// Every simple path as a list of node ids
    pub async fn all_paths_as_pk_lists(
        &self,
        from: &N,
        to: &N,
        max_results: usize,
        filter: &TraversalFilter<N>,
    ) -> Result<Vec<Vec<N>>> {
        Ok(self
            .all_paths(from, to, max_results, filter)
            .await?
            .into_iter()
            .map(|p| p.nodes)
            .collect())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Weighted path
    // ─────────────────────────────────────────────────────────────────────────

    /// Check that `field` names a numeric attribute of the repository's edges
    pub(crate) fn weight_field<'w>(&self, field: Option<&'w str>) -> Result<&'w str> {
        let field = field.unwrap_or(DEFAULT_WEIGHT_FIELD);
        if self.repository().weight_fields().iter().any(|f| f == field) {
            Ok(field)
        } else {
            Err(Error::WeightFieldMissing(field.to_string()))
        }
    }

    /// Minimum-weight path within `max_depth` hops
    pub async fn weighted_path(
        &self,
        from: &N,
        to: &N,
        weight_field: Option<&str>,
        filter: &TraversalFilter<N>,
    ) -> Result<GraphPath<N>> {
        let field = self.weight_field(weight_field)?;
        let resolved = self.resolve(filter)?;
        tracing::debug!(
            "Weighted path: {} -> {} (field={}, depth={})",
            from,
            to,
            field,
            resolved.max_depth
        );

        if from == to {
            return Ok(GraphPath::single(from.clone()));
        }

        for &direction in Self::search_directions(&resolved) {
            let index = self
                .load_reachable(from, direction, resolved.max_depth)
                .await?;
            if let Some(path) = dijkstra_path(&index, from, to, direction, field, &resolved)? {
                tracing::debug!("Dijkstra found path with cost {}", path.total_weight);
                return Ok(path);
            }
        }

        Err(Error::not_reachable(from, to))
    }

    /// Total weight of the minimum-weight path
    pub async fn weighted_distance(
        &self,
        from: &N,
        to: &N,
        weight_field: Option<&str>,
        filter: &TraversalFilter<N>,
    ) -> Result<f64> {
        Ok(self
            .weighted_path(from, to, weight_field, filter)
            .await?
            .total_weight)
    }
}

/// BFS for unweighted shortest path.
///
/// Neighbours are expanded in id order and the first discovery wins, so the
/// path found is the lexicographically smallest among the shortest ones.
fn bfs_path<N: NodeId>(
    index: &EdgeIndex<N>,
    start: &N,
    target: &N,
    direction: Direction,
    filter: &ResolvedFilter<'_, N>,
) -> Option<GraphPath<N>> {
    let mut parent: HashMap<N, (N, EdgeId)> = HashMap::new();
    let mut visited: HashSet<N> = HashSet::new();
    let mut queue: VecDeque<(N, u32)> = VecDeque::new();

    visited.insert(start.clone());
    queue.push_back((start.clone(), 0));

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= filter.max_depth {
            continue;
        }
        for (next, edge) in index.admitted(&current, direction, filter) {
            if !visited.insert(next.clone()) {
                continue;
            }
            parent.insert(next.clone(), (current.clone(), edge.id));
            if next == target {
                return Some(reconstruct_path(start, target, &parent, direction));
            }
            queue.push_back((next.clone(), depth + 1));
        }
    }

    None
}

/// Reconstruct path from parent map
fn reconstruct_path<N: NodeId>(
    start: &N,
    end: &N,
    parent: &HashMap<N, (N, EdgeId)>,
    direction: Direction,
) -> GraphPath<N> {
    let mut nodes = vec![end.clone()];
    let mut edges = Vec::new();
    let mut current = end.clone();

    while &current != start {
        match parent.get(&current) {
            Some((prev, edge)) => {
                edges.push(*edge);
                nodes.push(prev.clone());
                current = prev.clone();
            }
            None => break,
        }
    }

    nodes.reverse();
    edges.reverse();
    let hops = edges.len() as f64;
    GraphPath::from_search(nodes, edges, hops, direction)
}

/// Enumerate simple paths tier by tier.
///
/// Partial paths of one length are kept in lexicographic order, so the
/// output is ordered by length then sequence and can stop at `max_results`.
/// Parallel edges between the same pair yield one path.
fn enumerate_paths<N: NodeId>(
    index: &EdgeIndex<N>,
    start: &N,
    target: &N,
    direction: Direction,
    filter: &ResolvedFilter<'_, N>,
    max_results: usize,
) -> Vec<GraphPath<N>> {
    let useful = reaching(index, target, direction, filter);
    if !useful.contains(start) {
        return Vec::new();
    }

    let mut results = Vec::new();
    let mut partial: Vec<(Vec<N>, Vec<EdgeId>)> = vec![(vec![start.clone()], Vec::new())];
    let mut depth = 0;

    while !partial.is_empty() && depth < filter.max_depth {
        depth += 1;
        let mut next_tier = Vec::new();

        for (nodes, edges) in &partial {
            let Some(last) = nodes.last() else {
                continue;
            };
            let mut previous: Option<&N> = None;
            for (next, edge) in index.admitted(last, direction, filter) {
                if previous == Some(next) {
                    continue;
                }
                previous = Some(next);
                if !useful.contains(next) || nodes.contains(next) {
                    continue;
                }

                let mut path_nodes = nodes.clone();
                path_nodes.push(next.clone());
                let mut path_edges = edges.clone();
                path_edges.push(edge.id);

                if next == target {
                    let hops = path_edges.len() as f64;
                    results.push(GraphPath::from_search(path_nodes, path_edges, hops, direction));
                    if results.len() >= max_results {
                        return results;
                    }
                } else {
                    next_tier.push((path_nodes, path_edges));
                }
            }
        }
        partial = next_tier;
    }

    results
}

/// Nodes from which `target` can be reached along `direction`, `target` included
fn reaching<N: NodeId>(
    index: &EdgeIndex<N>,
    target: &N,
    direction: Direction,
    filter: &ResolvedFilter<'_, N>,
) -> HashSet<N> {
    let mut seen: HashSet<N> = HashSet::new();
    let mut stack = vec![target.clone()];
    seen.insert(target.clone());

    while let Some(current) = stack.pop() {
        if !filter.admits_node(&current) && &current != target {
            continue;
        }
        for (prev, edge) in index.neighbors(&current, direction.reverse()) {
            if filter.admits_edge(edge) && seen.insert(prev.clone()) {
                stack.push(prev.clone());
            }
        }
    }

    seen
}

/// Dijkstra over `(node, hops)` states, bounded by `filter.max_depth`
fn dijkstra_path<N: NodeId>(
    index: &EdgeIndex<N>,
    start: &N,
    target: &N,
    direction: Direction,
    field: &str,
    filter: &ResolvedFilter<'_, N>,
) -> Result<Option<GraphPath<N>>> {
    let mut settled: HashSet<(N, usize)> = HashSet::new();
    let mut heap = BinaryHeap::new();

    heap.push(DijkstraState {
        cost: 0.0,
        nodes: vec![start.clone()],
        edges: Vec::new(),
    });

    while let Some(state) = heap.pop() {
        let Some(node) = state.nodes.last().cloned() else {
            continue;
        };

        if &node == target {
            let DijkstraState { cost, nodes, edges } = state;
            return Ok(Some(GraphPath::from_search(nodes, edges, cost, direction)));
        }

        // Skip if this node was already settled with as many hops
        if !settled.insert((node.clone(), state.hops())) {
            continue;
        }
        if state.hops() >= filter.max_depth as usize {
            continue;
        }

        for (next, edge) in index.admitted(&node, direction, filter) {
            if state.nodes.contains(next) {
                continue;
            }
            let weight = edge.cost(field);
            limits::validate_weight(weight)?;

            let mut nodes = state.nodes.clone();
            nodes.push(next.clone());
            let mut edges = state.edges.clone();
            edges.push(edge.id);
            heap.push(DijkstraState {
                cost: state.cost + weight,
                nodes,
                edges,
            });
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::node::{Edge, NewEdge};
    use crate::testing::{engine_from, id, s, small_dag, ten_node_dag, TestEngine, VecRepository};
    use serde_json::json;
    use std::sync::Arc;

    fn all() -> TraversalFilter<String> {
        TraversalFilter::new()
    }

    fn weighted_fixture() -> TestEngine {
        // root -1-> a1 -2-> leaf, root -5-> a2 -1-> leaf
        let repo = Arc::new(VecRepository::new());
        for (p, c, w) in [
            ("root", "a1", 1.0),
            ("root", "a2", 5.0),
            ("a1", "leaf", 2.0),
            ("a2", "leaf", 1.0),
        ] {
            repo.push(Edge::new(id(p), id(c)).with_weight(w));
        }
        DagEngine::new(repo, EngineConfig::default())
    }

    #[tokio::test]
    async fn test_shortest_path_tie_break() {
        let (engine, _) = ten_node_dag();
        let path = engine.path(&id("root"), &id("c1"), &all()).await.unwrap();
        assert_eq!(path.nodes, s(&["root", "a3", "b3", "c1"]));
        assert_eq!(path.length, 3);
        assert_eq!(path.edges.len(), 3);
        assert_eq!(engine.distance(&id("root"), &id("c1"), &all()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_path_to_self() {
        let (engine, _) = small_dag();
        let path = engine.path(&id("root"), &id("root"), &all()).await.unwrap();
        assert_eq!(path.nodes, s(&["root"]));
        assert_eq!(engine.distance(&id("root"), &id("root"), &all()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_path_unreachable() {
        let (engine, _) = small_dag();
        let err = engine.path(&id("b1"), &id("root"), &all()).await.unwrap_err();
        assert!(err.is_not_reachable());
        assert!(!engine.path_exists(&id("island"), &id("root"), &all()).await.unwrap());
        assert!(engine.path_exists(&id("root"), &id("b2"), &all()).await.unwrap());
    }

    #[tokio::test]
    async fn test_nondirectional_path_reported_root_side_first() {
        let (engine, _) = ten_node_dag();
        let filter = TraversalFilter::new().undirected();
        let path = engine.path(&id("c1"), &id("root"), &filter).await.unwrap();
        assert_eq!(path.nodes, s(&["root", "a3", "b3", "c1"]));
        assert_eq!(path.length, 3);
    }

    #[tokio::test]
    async fn test_path_depth_bound() {
        let (engine, _) = ten_node_dag();
        let filter = TraversalFilter::new().with_depth(2);
        let err = engine.path(&id("root"), &id("c1"), &filter).await.unwrap_err();
        assert!(err.is_not_reachable());
    }

    #[tokio::test]
    async fn test_path_filters() {
        let (engine, _) = ten_node_dag();
        let filter = TraversalFilter::new().disallow_nodes([id("b3")]);
        let path = engine.path(&id("root"), &id("c1"), &filter).await.unwrap();
        assert_eq!(path.nodes, s(&["root", "a3", "b4", "c1"]));

        // the target itself may be excluded
        let filter = TraversalFilter::new().disallow_nodes([id("c1")]);
        assert!(!engine.path_exists(&id("root"), &id("c1"), &filter).await.unwrap());
    }

    #[tokio::test]
    async fn test_ancestor_predicates() {
        let (engine, _) = small_dag();
        assert!(engine.is_ancestor_of(&id("root"), &id("b1"), &all()).await.unwrap());
        assert!(!engine.is_ancestor_of(&id("b1"), &id("root"), &all()).await.unwrap());
        assert!(engine.is_descendant_of(&id("b1"), &id("root"), &all()).await.unwrap());
        assert!(!engine.is_descendant_of(&id("root"), &id("root"), &all()).await.unwrap());
        assert!(!engine.is_ancestor_of(&id("a1"), &id("b2"), &all()).await.unwrap());
    }

    #[tokio::test]
    async fn test_all_paths_two_routes() {
        let (engine, _) = engine_from(
            &[
                ("root", "a1"),
                ("a1", "b1"),
                ("b1", "c1"),
                ("root", "a3"),
                ("a3", "b3"),
                ("b3", "c1"),
            ],
            &[],
        );
        let paths = engine
            .all_paths_as_pk_lists(&id("root"), &id("c1"), 100, &all())
            .await
            .unwrap();
        assert_eq!(
            paths,
            vec![s(&["root", "a1", "b1", "c1"]), s(&["root", "a3", "b3", "c1"])]
        );
        assert_eq!(engine.distance(&id("root"), &id("c1"), &all()).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_all_paths_ordering_and_truncation() {
        let (engine, _) = engine_from(
            &[("a", "b"), ("b", "c"), ("c", "d"), ("a", "d"), ("a", "c")],
            &[],
        );
        let paths = engine
            .all_paths_as_pk_lists(&id("a"), &id("d"), 10, &all())
            .await
            .unwrap();
        assert_eq!(
            paths,
            vec![
                s(&["a", "d"]),
                s(&["a", "c", "d"]),
                s(&["a", "b", "c", "d"])
            ]
        );

        let paths = engine
            .all_paths_as_pk_lists(&id("a"), &id("d"), 2, &all())
            .await
            .unwrap();
        assert_eq!(paths.len(), 2);

        assert!(engine
            .all_paths(&id("a"), &id("d"), 0, &all())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_all_paths_ceiling() {
        // ten diamonds in a row: 2^10 routes of 20 hops
        let owned: Vec<(String, String)> = (0..10)
            .flat_map(|i| {
                let (join, next) = (format!("j{}", i), format!("j{}", i + 1));
                [
                    (join.clone(), format!("u{}", i)),
                    (join, format!("l{}", i)),
                    (format!("u{}", i), next.clone()),
                    (format!("l{}", i), next),
                ]
            })
            .collect();
        let edges: Vec<(&str, &str)> = owned
            .iter()
            .map(|(p, c)| (p.as_str(), c.as_str()))
            .collect();
        let (engine, _) = engine_from(&edges, &[]);

        let paths = engine
            .all_paths(&id("j0"), &id("j10"), usize::MAX, &all())
            .await
            .unwrap();
        assert_eq!(paths.len(), limits::DEFAULT_MAX_PATHS);
        assert!(paths.iter().all(|p| p.length == 20));
    }

    #[tokio::test]
    async fn test_all_paths_edge_cases() {
        let (engine, _) = small_dag();
        let paths = engine
            .all_paths_as_pk_lists(&id("a1"), &id("a1"), 10, &all())
            .await
            .unwrap();
        assert_eq!(paths, vec![s(&["a1"])]);

        let paths = engine
            .all_paths(&id("b1"), &id("root"), 10, &all())
            .await
            .unwrap();
        assert!(paths.is_empty());

        let filter = TraversalFilter::new().undirected();
        let paths = engine
            .all_paths_as_pk_lists(&id("b1"), &id("root"), 10, &filter)
            .await
            .unwrap();
        assert_eq!(
            paths,
            vec![s(&["root", "a1", "b1"]), s(&["root", "a2", "b1"])]
        );
    }

    #[tokio::test]
    async fn test_weighted_path_picks_lightest() {
        let engine = weighted_fixture();
        let path = engine
            .weighted_path(&id("root"), &id("leaf"), None, &all())
            .await
            .unwrap();
        assert_eq!(path.nodes, s(&["root", "a1", "leaf"]));
        assert!((path.total_weight - 3.0).abs() < 0.001);

        let dist = engine
            .weighted_distance(&id("root"), &id("leaf"), Some("weight"), &all())
            .await
            .unwrap();
        assert!((dist - 3.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_weighted_path_prefers_light_long_route() {
        let repo = Arc::new(VecRepository::new());
        repo.push(Edge::new(id("n1"), id("n4")).with_weight(100.0));
        repo.push(Edge::new(id("n1"), id("n2")).with_weight(1.0));
        repo.push(Edge::new(id("n2"), id("n3")).with_weight(1.0));
        repo.push(Edge::new(id("n3"), id("n4")).with_weight(1.0));
        let engine: TestEngine = DagEngine::new(repo, EngineConfig::default());

        let path = engine
            .weighted_path(&id("n1"), &id("n4"), None, &all())
            .await
            .unwrap();
        assert_eq!(path.nodes, s(&["n1", "n2", "n3", "n4"]));
        assert!((path.total_weight - 3.0).abs() < 0.001);

        // the light route needs three hops
        let filter = TraversalFilter::new().with_depth(2);
        let path = engine
            .weighted_path(&id("n1"), &id("n4"), None, &filter)
            .await
            .unwrap();
        assert_eq!(path.nodes, s(&["n1", "n4"]));
        assert!((path.total_weight - 100.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_weighted_path_metadata_field() {
        let repo = Arc::new(VecRepository::new().with_weight_field("cost"));
        for (p, c, cost) in [("a", "b", json!(4)), ("b", "c", json!(1.5)), ("a", "c", json!(9))] {
            let attributes = NewEdge::new().with_metadata("cost", cost);
            repo.push(Edge::from_new(id(p), id(c), attributes));
        }
        let engine: TestEngine = DagEngine::new(repo, EngineConfig::default());

        let path = engine
            .weighted_path(&id("a"), &id("c"), Some("cost"), &all())
            .await
            .unwrap();
        assert_eq!(path.nodes, s(&["a", "b", "c"]));
        assert!((path.total_weight - 5.5).abs() < 0.001);

        // unset weights count as 1.0
        let path = engine
            .weighted_path(&id("a"), &id("c"), None, &all())
            .await
            .unwrap();
        assert_eq!(path.nodes, s(&["a", "c"]));
    }

    #[tokio::test]
    async fn test_weighted_path_errors() {
        let engine = weighted_fixture();
        let err = engine
            .weighted_path(&id("root"), &id("leaf"), Some("nonexistent"), &all())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::WeightFieldMissing(f) if f == "nonexistent"));

        let err = engine
            .weighted_path(&id("leaf"), &id("root"), None, &all())
            .await
            .unwrap_err();
        assert!(err.is_not_reachable());

        let path = engine
            .weighted_path(&id("root"), &id("root"), None, &all())
            .await
            .unwrap();
        assert_eq!(path.nodes, s(&["root"]));
        assert_eq!(path.total_weight, 0.0);
    }

    #[tokio::test]
    async fn test_weighted_path_respects_edge_filter() {
        let engine = weighted_fixture();
        let filter = TraversalFilter::new().disallow_nodes([id("a1")]);
        let path = engine
            .weighted_path(&id("root"), &id("leaf"), None, &filter)
            .await
            .unwrap();
        assert_eq!(path.nodes, s(&["root", "a2", "leaf"]));
        assert!((path.total_weight - 6.0).abs() < 0.001);
    }
}
