//! Critical path: the heaviest root-to-leaf path of the whole graph

use crate::depth::{longest_depths, topological_order};
use crate::engine::DagEngine;
use crate::error::Result;
use crate::limits;
use crate::node::{EdgeId, NodeId};
use crate::path::GraphPath;
use crate::repository::EdgeRepository;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Best path found so far into one node
#[derive(Debug, Clone)]
struct Best<N> {
    weight: f64,
    nodes: Vec<N>,
    edges: Vec<EdgeId>,
}

impl<N: NodeId> Best<N> {
    /// Heavier wins, then the lexicographically smaller sequence
    fn beats(&self, other: &Self) -> bool {
        match self.weight.total_cmp(&other.weight) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => self.nodes < other.nodes,
        }
    }
}

impl<N: NodeId, R: EdgeRepository<N>> DagEngine<N, R> {
    /// Longest weighted path from any root to any leaf.
    ///
    /// Without a weight field every edge counts 1. An empty graph yields an
    /// empty path and a lone island yields a path of one node, both with
    /// weight 0.
    pub async fn critical_path(&self, weight_field: Option<&str>) -> Result<GraphPath<N>> {
        let field = match weight_field {
            Some(f) => Some(self.weight_field(Some(f))?),
            None => None,
        };
        let (nodes, index) = self.load_all().await?;
        tracing::debug!(
            "Critical path over {} nodes (field={:?})",
            nodes.len(),
            field
        );

        let depths = longest_depths(&nodes, &index)?;
        let order = topological_order(&depths, &index);

        let mut best: HashMap<N, Best<N>> = HashMap::with_capacity(order.len());
        for node in &order {
            let mut current: Option<Best<N>> = None;
            for edge in index.incoming(node) {
                let Some(from) = best.get(&edge.parent) else {
                    continue;
                };
                let weight = match field {
                    Some(f) => edge.cost(f),
                    None => 1.0,
                };
                limits::validate_weight(weight)?;

                let mut nodes = from.nodes.clone();
                nodes.push(node.clone());
                let mut edges = from.edges.clone();
                edges.push(edge.id);
                let candidate = Best {
                    weight: from.weight + weight,
                    nodes,
                    edges,
                };
                if current.as_ref().map_or(true, |c| candidate.beats(c)) {
                    current = Some(candidate);
                }
            }
            let entry = current.unwrap_or_else(|| Best {
                weight: 0.0,
                nodes: vec![node.clone()],
                edges: Vec::new(),
            });
            best.insert(node.clone(), entry);
        }

        let mut winner: Option<&Best<N>> = None;
        for node in order.iter().filter(|n| !index.has_children(n)) {
            if let Some(candidate) = best.get(node) {
                if winner.map_or(true, |w| candidate.beats(w)) {
                    winner = Some(candidate);
                }
            }
        }

        Ok(match winner {
            Some(b) => GraphPath {
                length: b.edges.len(),
                nodes: b.nodes.clone(),
                edges: b.edges.clone(),
                total_weight: b.weight,
            },
            None => GraphPath {
                nodes: Vec::new(),
                edges: Vec::new(),
                total_weight: 0.0,
                length: 0,
            },
        })
    }
}
