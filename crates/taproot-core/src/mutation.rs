//! Mutations
//!
//! Every write is validated first and then committed as a single
//! [`ChangeSet`]. When the applied policy rejects cycles the change set
//! asks the backend to re-check acyclicity inside its transaction.
//! Registered observers are notified around each commit.

use crate::engine::DagEngine;
use crate::error::{Error, Result};
use crate::node::{Direction, Edge, EdgeId, NewEdge, NodeId};
use crate::repository::{ChangeSet, EdgeRepository};
use std::collections::{BTreeMap, BTreeSet, HashSet};

impl<N: NodeId, R: EdgeRepository<N>> DagEngine<N, R> {
    /// Edges a change set removes, cascades from deleted nodes included
    async fn doomed_edges(&self, changes: &ChangeSet<N>) -> Result<Vec<Edge<N>>> {
        let mut doomed: BTreeMap<EdgeId, Edge<N>> = BTreeMap::new();
        for id in &changes.delete_edges {
            if let Some(edge) = self.repository().edge(id).await? {
                doomed.insert(edge.id, edge);
            }
        }
        if !changes.delete_nodes.is_empty() {
            let attached = self
                .repository()
                .edges_touching(&changes.delete_nodes, Direction::Both)
                .await?;
            doomed.extend(attached.into_iter().map(|e| (e.id, e)));
        }
        Ok(doomed.into_values().collect())
    }

    /// Commit a change set, notifying observers and logging rejections
    /// raised by the backend guard
    pub(crate) async fn commit(&self, changes: ChangeSet<N>) -> Result<()> {
        if self.observers().is_empty() {
            return self.apply_logged(changes).await;
        }

        let deleted = self.doomed_edges(&changes).await?;
        let created = changes.insert_edges.clone();
        let vetoed = |e: Error| {
            tracing::warn!("Commit vetoed by observer: {}", e);
            e
        };
        if !deleted.is_empty() {
            for observer in self.observers() {
                observer.before_delete(&deleted).map_err(vetoed)?;
            }
        }
        if !created.is_empty() {
            for observer in self.observers() {
                observer.before_create(&created).map_err(vetoed)?;
            }
        }

        self.apply_logged(changes).await?;

        if !deleted.is_empty() {
            for observer in self.observers() {
                observer.after_delete(&deleted);
            }
        }
        if !created.is_empty() {
            for observer in self.observers() {
                observer.after_create(&created);
            }
        }
        Ok(())
    }

    async fn apply_logged(&self, changes: ChangeSet<N>) -> Result<()> {
        match self.repository().apply(changes).await {
            Err(e @ Error::Cycle { .. }) => {
                tracing::warn!("Commit rejected by acyclicity guard: {}", e);
                Err(e)
            }
            other => other,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Insert
    // ─────────────────────────────────────────────────────────────────────────

    /// Attach `child` below `parent`, returning the stored edge
    pub async fn add_child(&self, parent: &N, child: &N, attributes: NewEdge) -> Result<Edge<N>> {
        self.ensure_node(parent).await?;
        self.ensure_node(child).await?;

        let policy = self
            .validate_edge(parent, child, &attributes, &HashSet::new())
            .await?;
        let edge = Edge::from_new(parent.clone(), child.clone(), attributes);

        self.commit(
            ChangeSet::new()
                .insert(edge.clone())
                .guarded(policy.reject_cycles),
        )
        .await?;
        tracing::info!("Added edge {} -> {} ({})", parent, child, edge.id);
        Ok(edge)
    }

    /// Attach `parent` above `child`, returning the stored edge
    pub async fn add_parent(&self, child: &N, parent: &N, attributes: NewEdge) -> Result<Edge<N>> {
        self.add_child(parent, child, attributes).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Remove
    // ─────────────────────────────────────────────────────────────────────────

    /// Delete the edges from `parent` to `child`, or to every child when
    /// `child` is `None`. With `delete_node` the detached children are
    /// deleted too. Returns the number of edges removed.
    pub async fn remove_child(
        &self,
        parent: &N,
        child: Option<&N>,
        delete_node: bool,
    ) -> Result<usize> {
        self.remove_between(parent, child, Direction::Outgoing, delete_node)
            .await
    }

    /// Delete the edges from `parent` to `child`, or from every parent when
    /// `parent` is `None`. With `delete_node` the detached parents are
    /// deleted too. Returns the number of edges removed.
    pub async fn remove_parent(
        &self,
        child: &N,
        parent: Option<&N>,
        delete_node: bool,
    ) -> Result<usize> {
        self.remove_between(child, parent, Direction::Incoming, delete_node)
            .await
    }

    async fn remove_between(
        &self,
        node: &N,
        other: Option<&N>,
        direction: Direction,
        delete_node: bool,
    ) -> Result<usize> {
        let edges: Vec<Edge<N>> = self
            .repository()
            .edges_touching(std::slice::from_ref(node), direction)
            .await?
            .into_iter()
            .filter(|e| other.map_or(true, |o| e.other_end(node) == o))
            .collect();
        if edges.is_empty() {
            return Ok(0);
        }

        let far: BTreeSet<N> = edges.iter().map(|e| e.other_end(node).clone()).collect();
        let mut changes = edges
            .iter()
            .fold(ChangeSet::new(), |changes, e| changes.delete(e.id));
        if delete_node {
            changes = far
                .iter()
                .cloned()
                .fold(changes, |changes, n| changes.delete_node(n));
        }

        self.commit(changes).await?;
        tracing::info!(
            "Removed {} edges at {} ({} nodes deleted)",
            edges.len(),
            node,
            if delete_node { far.len() } else { 0 }
        );
        Ok(edges.len())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Split
    // ─────────────────────────────────────────────────────────────────────────

    /// Split an edge `parent -> child` into `parent -> new_node -> child`.
    ///
    /// The clone flags copy weight, type and metadata of the original edge
    /// onto the root-side and leaf-side replacement. The new node is created
    /// if missing. Returns the root-side and leaf-side edges.
    pub async fn insert_node(
        &self,
        edge_id: &EdgeId,
        new_node: &N,
        clone_rootside: bool,
        clone_leafside: bool,
    ) -> Result<(Edge<N>, Edge<N>)> {
        self.insert_node_with(edge_id, new_node, clone_rootside, clone_leafside, |_| {})
            .await
    }

    /// [`insert_node`](Self::insert_node) with a hook that adjusts the
    /// attributes of each replacement edge, root-side first, before they
    /// are validated
    pub async fn insert_node_with<F>(
        &self,
        edge_id: &EdgeId,
        new_node: &N,
        clone_rootside: bool,
        clone_leafside: bool,
        mut prepare: F,
    ) -> Result<(Edge<N>, Edge<N>)>
    where
        F: FnMut(&mut NewEdge) + Send,
    {
        let original = self
            .repository()
            .edge(edge_id)
            .await?
            .ok_or_else(|| Error::EdgeNotFound(edge_id.to_string()))?;

        let attributes = |clone: bool| {
            if clone {
                original.attributes()
            } else {
                NewEdge::default()
            }
        };
        let mut rootside = attributes(clone_rootside);
        let mut leafside = attributes(clone_leafside);
        prepare(&mut rootside);
        prepare(&mut leafside);

        let ignoring: HashSet<EdgeId> = [original.id].into_iter().collect();
        let upper = self
            .validate_edge(&original.parent, new_node, &rootside, &ignoring)
            .await?;
        let lower = self
            .validate_edge(new_node, &original.child, &leafside, &ignoring)
            .await?;

        let rootside = Edge::from_new(original.parent.clone(), new_node.clone(), rootside);
        let leafside = Edge::from_new(new_node.clone(), original.child.clone(), leafside);

        let mut changes = ChangeSet::new()
            .delete(original.id)
            .insert(rootside.clone())
            .insert(leafside.clone())
            .guarded(upper.reject_cycles || lower.reject_cycles);
        if !self.repository().node_exists(new_node).await? {
            changes = changes.add_node(new_node.clone());
        }

        self.commit(changes).await?;
        tracing::info!(
            "Inserted {} between {} and {}",
            new_node,
            original.parent,
            original.child
        );
        Ok((rootside, leafside))
    }
}
