//! Test fixtures: a minimal in-memory repository and the shared sample graphs

use crate::config::EngineConfig;
use crate::engine::DagEngine;
use crate::error::{Error, Result};
use crate::index::EdgeIndex;
use crate::node::{Direction, Edge, EdgeId, NodeId};
use crate::repository::{ChangeSet, EdgeRepository};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

pub struct VecRepository<N> {
    state: RwLock<(BTreeSet<N>, Vec<Edge<N>>)>,
    weight_fields: Vec<String>,
}

impl<N: NodeId> VecRepository<N> {
    pub fn new() -> Self {
        Self {
            state: RwLock::new((BTreeSet::new(), Vec::new())),
            weight_fields: vec!["weight".to_string()],
        }
    }

    pub fn with_weight_field(mut self, field: &str) -> Self {
        self.weight_fields.push(field.to_string());
        self
    }

    /// Insert an edge without any validation, creating endpoints as needed
    pub fn push(&self, edge: Edge<N>) -> EdgeId {
        let mut state = self.state.write().unwrap();
        state.0.insert(edge.parent.clone());
        state.0.insert(edge.child.clone());
        let id = edge.id;
        state.1.push(edge);
        id
    }

    pub fn add_node(&self, node: N) {
        self.state.write().unwrap().0.insert(node);
    }

    pub fn edge_count(&self) -> usize {
        self.state.read().unwrap().1.len()
    }
}

#[async_trait]
impl<N: NodeId> EdgeRepository<N> for VecRepository<N> {
    async fn save_node(&self, node: &N) -> Result<()> {
        self.state.write().unwrap().0.insert(node.clone());
        Ok(())
    }

    async fn node_exists(&self, node: &N) -> Result<bool> {
        Ok(self.state.read().unwrap().0.contains(node))
    }

    async fn nodes(&self) -> Result<Vec<N>> {
        Ok(self.state.read().unwrap().0.iter().cloned().collect())
    }

    async fn edge(&self, id: &EdgeId) -> Result<Option<Edge<N>>> {
        Ok(self.state.read().unwrap().1.iter().find(|e| &e.id == id).cloned())
    }

    async fn edges(&self) -> Result<Vec<Edge<N>>> {
        Ok(self.state.read().unwrap().1.clone())
    }

    async fn edges_touching(&self, nodes: &[N], direction: Direction) -> Result<Vec<Edge<N>>> {
        let state = self.state.read().unwrap();
        Ok(state
            .1
            .iter()
            .filter(|e| match direction {
                Direction::Outgoing => nodes.contains(&e.parent),
                Direction::Incoming => nodes.contains(&e.child),
                Direction::Both => nodes.contains(&e.parent) || nodes.contains(&e.child),
            })
            .cloned()
            .collect())
    }

    fn weight_fields(&self) -> Vec<String> {
        self.weight_fields.clone()
    }

    async fn apply(&self, changes: ChangeSet<N>) -> Result<()> {
        let mut state = self.state.write().unwrap();
        let (mut nodes, mut edges) = state.clone();

        edges.retain(|e| !changes.delete_edges.contains(&e.id));
        for node in &changes.delete_nodes {
            nodes.remove(node);
            edges.retain(|e| &e.parent != node && &e.child != node);
        }
        nodes.extend(changes.insert_nodes.iter().cloned());
        for edge in &changes.insert_edges {
            for end in [&edge.parent, &edge.child] {
                if !nodes.contains(end) {
                    return Err(Error::NodeNotFound(end.to_string()));
                }
            }
        }
        edges.extend(changes.insert_edges.iter().cloned());

        if changes.guard_acyclic {
            let index = EdgeIndex::new(edges.clone());
            if let Some(edge) = index.closing_edge(&changes.insert_edges) {
                return Err(Error::Cycle {
                    parent: edge.parent.to_string(),
                    child: edge.child.to_string(),
                });
            }
        }

        *state = (nodes, edges);
        Ok(())
    }
}

pub type TestEngine = DagEngine<String, VecRepository<String>>;

pub fn engine_from(edges: &[(&str, &str)], islands: &[&str]) -> (TestEngine, Arc<VecRepository<String>>) {
    let repo = Arc::new(VecRepository::new());
    for (parent, child) in edges {
        repo.push(Edge::new(parent.to_string(), child.to_string()));
    }
    for island in islands {
        repo.add_node(island.to_string());
    }
    (DagEngine::new(Arc::clone(&repo), EngineConfig::default()), repo)
}

/// root -> a1, a2, a3; a1 -> b1; a2 -> b1; a3 -> b2; plus an island
pub fn small_dag() -> (TestEngine, Arc<VecRepository<String>>) {
    engine_from(
        &[
            ("root", "a1"),
            ("root", "a2"),
            ("root", "a3"),
            ("a1", "b1"),
            ("a2", "b1"),
            ("a3", "b2"),
        ],
        &["island"],
    )
}

/// Ten-node DAG with two routes into c1 and a second parent for b2
pub fn ten_node_dag() -> (TestEngine, Arc<VecRepository<String>>) {
    engine_from(
        &[
            ("root", "a1"),
            ("a1", "b1"),
            ("root", "a2"),
            ("root", "a3"),
            ("a3", "b3"),
            ("a3", "b4"),
            ("b3", "c1"),
            ("a1", "b2"),
            ("a2", "b2"),
            ("b3", "c2"),
            ("b4", "c1"),
        ],
        &[],
    )
}

pub fn s(v: &[&str]) -> Vec<String> {
    v.iter().map(|x| x.to_string()).collect()
}

pub fn id(v: &str) -> String {
    v.to_string()
}
