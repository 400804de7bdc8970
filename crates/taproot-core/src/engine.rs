//! The DAG engine
//!
//! [`DagEngine`] binds a repository to a configuration. Its operations are
//! spread over the engine modules (`traversal`, `path`, `depth`,
//! `critical`, `lca`, `reduction`, `analytics`, `validate`, `mutation`) as
//! separate `impl` blocks. Every write goes through one commit path that
//! notifies the registered [`EdgeObserver`]s.

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::filter::{ResolvedFilter, TraversalFilter};
use crate::index::EdgeIndex;
use crate::node::{Direction, NodeId};
use crate::observer::EdgeObserver;
use crate::repository::EdgeRepository;
use std::sync::Arc;

/// Traversal and query engine over one edge repository
pub struct DagEngine<N, R> {
    repo: Arc<R>,
    config: EngineConfig,
    observers: Vec<Arc<dyn EdgeObserver<N>>>,
}

impl<N, R> Clone for DagEngine<N, R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            config: self.config.clone(),
            observers: self.observers.clone(),
        }
    }
}

impl<N: NodeId, R: EdgeRepository<N>> DagEngine<N, R> {
    pub fn new(repo: Arc<R>, config: EngineConfig) -> Self {
        Self {
            repo,
            config,
            observers: Vec::new(),
        }
    }

    /// Engine with the default configuration
    pub fn with_defaults(repo: Arc<R>) -> Self {
        Self::new(repo, EngineConfig::default())
    }

    /// Register an observer; observers are notified in registration order
    pub fn with_observer(mut self, observer: Arc<dyn EdgeObserver<N>>) -> Self {
        self.observers.push(observer);
        self
    }

    pub(crate) fn observers(&self) -> &[Arc<dyn EdgeObserver<N>>] {
        &self.observers
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub(crate) fn resolve<'f>(&self, filter: &'f TraversalFilter<N>) -> Result<ResolvedFilter<'f, N>> {
        filter.resolve(&self.config)
    }

    pub(crate) async fn ensure_node(&self, node: &N) -> Result<()> {
        if self.repo.node_exists(node).await? {
            Ok(())
        } else {
            Err(Error::NodeNotFound(node.to_string()))
        }
    }

    /// Fetch the edges reachable from `start` and index them
    pub(crate) async fn load_reachable(
        &self,
        start: &N,
        direction: Direction,
        max_depth: u32,
    ) -> Result<EdgeIndex<N>> {
        let edges = self
            .repo
            .reachable_edges(std::slice::from_ref(start), direction, max_depth)
            .await?;
        tracing::debug!(
            "Loaded {} edges from {} (direction={:?}, depth={})",
            edges.len(),
            start,
            direction,
            max_depth
        );
        Ok(EdgeIndex::new(edges))
    }

    /// Fetch the whole graph
    pub(crate) async fn load_all(&self) -> Result<(Vec<N>, EdgeIndex<N>)> {
        let nodes = self.repo.nodes().await?;
        let edges = self.repo.edges().await?;
        tracing::debug!("Loaded graph: {} nodes, {} edges", nodes.len(), edges.len());
        Ok((nodes, EdgeIndex::new(edges)))
    }
}
