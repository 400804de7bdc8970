//! Traversal filters
//!
//! A [`TraversalFilter`] bundles every optional constraint a query accepts.
//! It is checked once against the engine configuration, producing a
//! [`ResolvedFilter`] that the engines consult while expanding.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::limits;
use crate::node::{Edge, EdgeId, NodeId};
use std::collections::HashSet;

/// Optional constraints applied while traversing
#[derive(Debug, Clone)]
pub struct TraversalFilter<N> {
    /// Maximum recursion depth, engine default when `None`
    pub max_depth: Option<u32>,

    /// Path searches follow edges forward only when true
    pub directional: bool,

    /// Only follow edges of this category
    pub edge_type: Option<String>,

    /// Only follow these edges
    pub allowed_edges: Option<HashSet<EdgeId>>,

    /// Never follow these edges
    pub disallowed_edges: HashSet<EdgeId>,

    /// Only enter these nodes
    pub allowed_nodes: Option<HashSet<N>>,

    /// Never enter these nodes
    pub disallowed_nodes: HashSet<N>,
}

impl<N> Default for TraversalFilter<N> {
    fn default() -> Self {
        Self {
            max_depth: None,
            directional: true,
            edge_type: None,
            allowed_edges: None,
            disallowed_edges: HashSet::new(),
            allowed_nodes: None,
            disallowed_nodes: HashSet::new(),
        }
    }
}

impl<N: NodeId> TraversalFilter<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum traversal depth
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Let path searches fall back to the reverse direction
    pub fn undirected(mut self) -> Self {
        self.directional = false;
        self
    }

    /// Restrict traversal to one edge category
    pub fn with_edge_type(mut self, edge_type: impl Into<String>) -> Self {
        self.edge_type = Some(edge_type.into());
        self
    }

    /// Restrict traversal to the given edges
    pub fn allow_edges(mut self, edges: impl IntoIterator<Item = EdgeId>) -> Self {
        self.allowed_edges
            .get_or_insert_with(HashSet::new)
            .extend(edges);
        self
    }

    /// Exclude the given edges
    pub fn disallow_edges(mut self, edges: impl IntoIterator<Item = EdgeId>) -> Self {
        self.disallowed_edges.extend(edges);
        self
    }

    /// Restrict traversal to the given nodes
    pub fn allow_nodes(mut self, nodes: impl IntoIterator<Item = N>) -> Self {
        self.allowed_nodes
            .get_or_insert_with(HashSet::new)
            .extend(nodes);
        self
    }

    /// Exclude the given nodes
    pub fn disallow_nodes(mut self, nodes: impl IntoIterator<Item = N>) -> Self {
        self.disallowed_nodes.extend(nodes);
        self
    }

    /// Check the filter against the configuration
    pub fn resolve(&self, config: &EngineConfig) -> Result<ResolvedFilter<'_, N>> {
        let max_depth = self.max_depth.unwrap_or(config.default_max_depth);
        limits::validate_traversal_depth(max_depth, config.max_depth_limit)?;

        Ok(ResolvedFilter {
            max_depth,
            filter: self,
        })
    }
}

/// A validated filter with its effective depth
#[derive(Debug, Clone)]
pub struct ResolvedFilter<'a, N> {
    pub max_depth: u32,
    filter: &'a TraversalFilter<N>,
}

impl<'a, N: NodeId> ResolvedFilter<'a, N> {
    pub fn directional(&self) -> bool {
        self.filter.directional
    }

    /// Whether the traversal may follow `edge`
    pub fn admits_edge(&self, edge: &Edge<N>) -> bool {
        if let Some(ref wanted) = self.filter.edge_type {
            if edge.edge_type.as_deref() != Some(wanted.as_str()) {
                return false;
            }
        }
        if let Some(ref allowed) = self.filter.allowed_edges {
            if !allowed.contains(&edge.id) {
                return false;
            }
        }
        !self.filter.disallowed_edges.contains(&edge.id)
    }

    /// Whether the traversal may enter `node`
    pub fn admits_node(&self, node: &N) -> bool {
        if let Some(ref allowed) = self.filter.allowed_nodes {
            if !allowed.contains(node) {
                return false;
            }
        }
        !self.filter.disallowed_nodes.contains(node)
    }
}
