//! Edge repository trait
//!
//! The engine never talks to storage directly: every backend implements
//! [`EdgeRepository`] and the engine asks it for whole edge sets. The
//! repository is responsible for set-oriented expansion
//! ([`EdgeRepository::reachable_edges`]) and for applying a [`ChangeSet`]
//! atomically.

use crate::error::Result;
use crate::limits::DEFAULT_WEIGHT_FIELD;
use crate::node::{Direction, Edge, EdgeId, NodeId};
use async_trait::async_trait;
use std::collections::HashSet;

/// A batch of writes applied in one transaction.
///
/// Backends apply deletions first, then node inserts, then edge inserts.
#[derive(Debug, Clone)]
pub struct ChangeSet<N> {
    /// Nodes to register before the edges are inserted
    pub insert_nodes: Vec<N>,

    /// Edges to insert; both endpoints must exist
    pub insert_edges: Vec<Edge<N>>,

    /// Edges to delete
    pub delete_edges: Vec<EdgeId>,

    /// Nodes to delete together with every edge touching them
    pub delete_nodes: Vec<N>,

    /// Re-check inside the transaction that no inserted edge closes a cycle
    pub guard_acyclic: bool,
}

impl<N> Default for ChangeSet<N> {
    fn default() -> Self {
        Self {
            insert_nodes: Vec::new(),
            insert_edges: Vec::new(),
            delete_edges: Vec::new(),
            delete_nodes: Vec::new(),
            guard_acyclic: false,
        }
    }
}

impl<N: NodeId> ChangeSet<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(mut self, node: N) -> Self {
        self.insert_nodes.push(node);
        self
    }

    pub fn insert(mut self, edge: Edge<N>) -> Self {
        self.insert_edges.push(edge);
        self
    }

    pub fn delete(mut self, id: EdgeId) -> Self {
        self.delete_edges.push(id);
        self
    }

    pub fn delete_node(mut self, node: N) -> Self {
        self.delete_nodes.push(node);
        self
    }

    pub fn guarded(mut self, guard: bool) -> Self {
        self.guard_acyclic = guard;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.insert_nodes.is_empty()
            && self.insert_edges.is_empty()
            && self.delete_edges.is_empty()
            && self.delete_nodes.is_empty()
    }
}

/// Tier-by-tier expansion state behind [`EdgeRepository::reachable_edges`].
///
/// Callers alternate [`next_tier`](Self::next_tier) and
/// [`absorb`](Self::absorb) until no tier is left. Backends that can look
/// up adjacency cheaply drive it inside one lock or read transaction.
#[derive(Debug)]
pub struct Frontier<N> {
    direction: Direction,
    max_depth: u32,
    depth: u32,
    visited: HashSet<N>,
    seen_edges: HashSet<EdgeId>,
    current: HashSet<N>,
    pending: Vec<N>,
    edges: Vec<Edge<N>>,
}

impl<N: NodeId> Frontier<N> {
    pub fn new(seeds: &[N], direction: Direction, max_depth: u32) -> Self {
        Self {
            direction,
            max_depth,
            depth: 0,
            visited: seeds.iter().cloned().collect(),
            seen_edges: HashSet::new(),
            current: HashSet::new(),
            pending: seeds.to_vec(),
            edges: Vec::new(),
        }
    }

    /// Nodes whose edges should be fetched next, or `None` when done
    pub fn next_tier(&mut self) -> Option<Vec<N>> {
        if self.pending.is_empty() || self.depth >= self.max_depth {
            return None;
        }
        self.depth += 1;
        let tier = std::mem::take(&mut self.pending);
        self.current = tier.iter().cloned().collect();
        Some(tier)
    }

    /// Record the edges touching the last tier
    pub fn absorb(&mut self, batch: impl IntoIterator<Item = Edge<N>>) {
        for edge in batch {
            if !self.seen_edges.insert(edge.id) {
                continue;
            }
            let next = match self.direction {
                Direction::Outgoing => &edge.child,
                Direction::Incoming => &edge.parent,
                Direction::Both if self.current.contains(&edge.parent) => &edge.child,
                Direction::Both => &edge.parent,
            };
            if self.visited.insert(next.clone()) {
                self.pending.push(next.clone());
            }
            self.edges.push(edge);
        }
    }

    pub fn into_edges(self) -> Vec<Edge<N>> {
        self.edges
    }
}

/// Persistence seam for the DAG engine
#[async_trait]
pub trait EdgeRepository<N: NodeId>: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Node Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a node; saving an existing node is a no-op
    async fn save_node(&self, node: &N) -> Result<()>;

    /// Check that a node exists
    async fn node_exists(&self, node: &N) -> Result<bool>;

    /// All nodes in id order
    async fn nodes(&self) -> Result<Vec<N>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Edge Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get an edge by ID
    async fn edge(&self, id: &EdgeId) -> Result<Option<Edge<N>>>;

    /// Every edge in the store
    async fn edges(&self) -> Result<Vec<Edge<N>>>;

    /// Edges leaving (`Outgoing`), entering (`Incoming`) or touching
    /// (`Both`) any of `nodes`, in one batched lookup
    async fn edges_touching(&self, nodes: &[N], direction: Direction) -> Result<Vec<Edge<N>>>;

    /// Every edge reachable from `seeds` within `max_depth` hops.
    ///
    /// An edge is included when its near endpoint is at most
    /// `max_depth - 1` hops from a seed. The default expands the frontier
    /// one tier per batched [`edges_touching`](Self::edges_touching) call;
    /// backends override it with a recursive query or by driving a
    /// [`Frontier`] over their own adjacency inside one read.
    async fn reachable_edges(
        &self,
        seeds: &[N],
        direction: Direction,
        max_depth: u32,
    ) -> Result<Vec<Edge<N>>> {
        let mut frontier = Frontier::new(seeds, direction, max_depth);
        while let Some(tier) = frontier.next_tier() {
            let batch = self.edges_touching(&tier, direction).await?;
            frontier.absorb(batch);
        }
        Ok(frontier.into_edges())
    }

    /// Names of the numeric edge attributes usable as weight fields
    fn weight_fields(&self) -> Vec<String> {
        vec![DEFAULT_WEIGHT_FIELD.to_string()]
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply every change atomically, or none of them
    async fn apply(&self, changes: ChangeSet<N>) -> Result<()>;
}
