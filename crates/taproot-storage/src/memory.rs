//! In-memory storage backend
//!
//! Useful for testing and for graphs that fit in memory. A change set is
//! applied to a copy of the state under the write lock and swapped in only
//! when every check passes. Each node keeps the ids of its parent and
//! child edges, so lookups and traversals only visit the edges they return.

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;
use taproot_core::{
    ChangeSet, Direction, Edge, EdgeId, EdgeIndex, EdgeRepository, Frontier, NodeId, Result,
};

#[derive(Debug, Clone)]
struct GraphState<N> {
    nodes: BTreeSet<N>,
    edges: BTreeMap<EdgeId, Edge<N>>,
    // node -> ids of edges leaving / entering it
    children: BTreeMap<N, BTreeSet<EdgeId>>,
    parents: BTreeMap<N, BTreeSet<EdgeId>>,
}

impl<N: NodeId> GraphState<N> {
    fn new() -> Self {
        Self {
            nodes: BTreeSet::new(),
            edges: BTreeMap::new(),
            children: BTreeMap::new(),
            parents: BTreeMap::new(),
        }
    }

    fn insert_edge(&mut self, edge: Edge<N>) {
        self.children
            .entry(edge.parent.clone())
            .or_default()
            .insert(edge.id);
        self.parents
            .entry(edge.child.clone())
            .or_default()
            .insert(edge.id);
        self.edges.insert(edge.id, edge);
    }

    fn remove_edge(&mut self, id: &EdgeId) {
        let Some(edge) = self.edges.remove(id) else {
            return;
        };
        if let Some(ids) = self.children.get_mut(&edge.parent) {
            ids.remove(id);
        }
        if let Some(ids) = self.parents.get_mut(&edge.child) {
            ids.remove(id);
        }
    }

    fn touching(&self, nodes: &[N], direction: Direction) -> Vec<Edge<N>> {
        let mut ids: BTreeSet<EdgeId> = BTreeSet::new();
        for node in nodes {
            if matches!(direction, Direction::Outgoing | Direction::Both) {
                ids.extend(self.children.get(node).into_iter().flatten());
            }
            if matches!(direction, Direction::Incoming | Direction::Both) {
                ids.extend(self.parents.get(node).into_iter().flatten());
            }
        }
        ids.iter()
            .filter_map(|id| self.edges.get(id))
            .cloned()
            .collect()
    }

    fn apply(&mut self, changes: &ChangeSet<N>) -> StorageResult<()> {
        for id in &changes.delete_edges {
            self.remove_edge(id);
        }
        for node in &changes.delete_nodes {
            self.nodes.remove(node);
            let attached: Vec<EdgeId> = self
                .children
                .remove(node)
                .into_iter()
                .chain(self.parents.remove(node))
                .flatten()
                .collect();
            for id in &attached {
                self.remove_edge(id);
            }
        }
        self.nodes.extend(changes.insert_nodes.iter().cloned());

        for edge in &changes.insert_edges {
            for end in [&edge.parent, &edge.child] {
                if !self.nodes.contains(end) {
                    return Err(StorageError::NodeNotFound(end.to_string()));
                }
            }
            self.insert_edge(edge.clone());
        }

        if changes.guard_acyclic {
            let index = EdgeIndex::new(self.edges.values().cloned().collect());
            if let Some(edge) = index.closing_edge(&changes.insert_edges) {
                return Err(StorageError::cycle(&edge.parent, &edge.child));
            }
        }
        Ok(())
    }
}

/// In-memory storage backend
pub struct MemoryStorage<N> {
    state: RwLock<GraphState<N>>,
    weight_fields: Vec<String>,
}

impl<N: NodeId> MemoryStorage<N> {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(GraphState::new()),
            weight_fields: vec![taproot_core::limits::DEFAULT_WEIGHT_FIELD.to_string()],
        }
    }

    /// Declare an edge metadata key usable as a weight field
    pub fn with_weight_field(mut self, field: impl Into<String>) -> Self {
        self.weight_fields.push(field.into());
        self
    }

    pub fn node_count(&self) -> StorageResult<usize> {
        let state = self.state.read().map_err(StorageError::lock)?;
        Ok(state.nodes.len())
    }

    pub fn edge_count(&self) -> StorageResult<usize> {
        let state = self.state.read().map_err(StorageError::lock)?;
        Ok(state.edges.len())
    }
}

impl<N: NodeId> Default for MemoryStorage<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<N: NodeId> EdgeRepository<N> for MemoryStorage<N> {
    async fn save_node(&self, node: &N) -> Result<()> {
        let mut state = self.state.write().map_err(StorageError::lock)?;
        state.nodes.insert(node.clone());
        Ok(())
    }

    async fn node_exists(&self, node: &N) -> Result<bool> {
        let state = self.state.read().map_err(StorageError::lock)?;
        Ok(state.nodes.contains(node))
    }

    async fn nodes(&self) -> Result<Vec<N>> {
        let state = self.state.read().map_err(StorageError::lock)?;
        Ok(state.nodes.iter().cloned().collect())
    }

    async fn edge(&self, id: &EdgeId) -> Result<Option<Edge<N>>> {
        let state = self.state.read().map_err(StorageError::lock)?;
        Ok(state.edges.get(id).cloned())
    }

    async fn edges(&self) -> Result<Vec<Edge<N>>> {
        let state = self.state.read().map_err(StorageError::lock)?;
        Ok(state.edges.values().cloned().collect())
    }

    async fn edges_touching(&self, nodes: &[N], direction: Direction) -> Result<Vec<Edge<N>>> {
        let state = self.state.read().map_err(StorageError::lock)?;
        Ok(state.touching(nodes, direction))
    }

    async fn reachable_edges(
        &self,
        seeds: &[N],
        direction: Direction,
        max_depth: u32,
    ) -> Result<Vec<Edge<N>>> {
        let state = self.state.read().map_err(StorageError::lock)?;
        let mut frontier = Frontier::new(seeds, direction, max_depth);
        while let Some(tier) = frontier.next_tier() {
            let batch = state.touching(&tier, direction);
            frontier.absorb(batch);
        }
        Ok(frontier.into_edges())
    }

    fn weight_fields(&self) -> Vec<String> {
        self.weight_fields.clone()
    }

    async fn apply(&self, changes: ChangeSet<N>) -> Result<()> {
        let mut state = self.state.write().map_err(StorageError::lock)?;
        let mut next = state.clone();
        next.apply(&changes)?;
        *state = next;
        tracing::debug!(
            "Applied change set: +{} edges, -{} edges, +{} nodes, -{} nodes",
            changes.insert_edges.len(),
            changes.delete_edges.len(),
            changes.insert_nodes.len(),
            changes.delete_nodes.len()
        );
        Ok(())
    }
}
