//! Node identities and edge types

use crate::limits::DEFAULT_WEIGHT_FIELD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use ulid::Ulid;

/// Identity of a node.
///
/// Nodes are owned by the caller; the engine only compares, hashes and
/// orders them. `Ord` is the deterministic tie-break order used by every
/// query, so integer and string keys both produce stable results.
pub trait NodeId: Clone + Eq + Hash + Ord + Debug + Display + Send + Sync + 'static {}

impl<T> NodeId for T where T: Clone + Eq + Hash + Ord + Debug + Display + Send + Sync + 'static {}

/// Unique identifier for an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub Ulid);

impl EdgeId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EdgeId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

/// Direction for graph traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Parent to child (towards descendants)
    Outgoing,
    /// Child to parent (towards ancestors)
    Incoming,
    Both,
}

impl Direction {
    pub fn reverse(self) -> Self {
        match self {
            Self::Outgoing => Self::Incoming,
            Self::Incoming => Self::Outgoing,
            Self::Both => Self::Both,
        }
    }
}

/// A directed edge from `parent` to `child`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge<N> {
    /// Unique identifier
    pub id: EdgeId,

    /// Root-side endpoint
    pub parent: N,

    /// Leaf-side endpoint
    pub child: N,

    /// Optional non-negative weight
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,

    /// Optional category tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,

    /// Caller-defined attributes, copied when an edge is split
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl<N: NodeId> Edge<N> {
    /// Create an edge with no attributes
    pub fn new(parent: N, child: N) -> Self {
        Self::from_new(parent, child, NewEdge::default())
    }

    /// Create an edge from caller-supplied attributes
    pub fn from_new(parent: N, child: N, attributes: NewEdge) -> Self {
        Self {
            id: EdgeId::new(),
            parent,
            child,
            weight: attributes.weight,
            edge_type: attributes.edge_type,
            metadata: attributes.metadata,
            created_at: Utc::now(),
        }
    }

    /// Set the weight of this edge
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Set the category of this edge
    pub fn with_type(mut self, edge_type: impl Into<String>) -> Self {
        self.edge_type = Some(edge_type.into());
        self
    }

    /// The attributes of this edge as a `NewEdge`, for cloning onto new endpoints
    pub fn attributes(&self) -> NewEdge {
        NewEdge {
            weight: self.weight,
            edge_type: self.edge_type.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// The endpoint reached when leaving `from` along this edge
    pub fn other_end(&self, from: &N) -> &N {
        if &self.parent == from {
            &self.child
        } else {
            &self.parent
        }
    }

    /// Numeric value of a weight field.
    ///
    /// `"weight"` reads the built-in column, any other name is looked up
    /// in the metadata. `None` when the edge carries no numeric value.
    pub fn numeric(&self, field: &str) -> Option<f64> {
        if field == DEFAULT_WEIGHT_FIELD {
            return self.weight;
        }
        self.metadata.get(field).and_then(|v| v.as_f64())
    }

    /// Weight used by weighted queries, 1.0 when the edge has no value
    pub fn cost(&self, field: &str) -> f64 {
        self.numeric(field).unwrap_or(1.0)
    }
}

/// Data for creating a new edge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewEdge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl NewEdge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_type(mut self, edge_type: impl Into<String>) -> Self {
        self.edge_type = Some(edge_type.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_fields() {
        let edge = Edge::from_new(
            1,
            2,
            NewEdge::new()
                .with_weight(2.5)
                .with_metadata("cost", json!(7))
                .with_metadata("label", json!("x")),
        );

        assert_eq!(edge.numeric("weight"), Some(2.5));
        assert_eq!(edge.numeric("cost"), Some(7.0));
        assert_eq!(edge.numeric("label"), None);
        assert_eq!(edge.cost("missing"), 1.0);
    }

    #[test]
    fn test_attributes_clone_everything_but_identity() {
        let edge = Edge::new("a".to_string(), "b".to_string())
            .with_weight(3.0)
            .with_type("requires");
        let attrs = edge.attributes();
        let copy = Edge::from_new("a".to_string(), "c".to_string(), attrs);

        assert_ne!(copy.id, edge.id);
        assert_eq!(copy.weight, Some(3.0));
        assert_eq!(copy.edge_type.as_deref(), Some("requires"));
    }

    #[test]
    fn test_edge_id_roundtrip() {
        let id = EdgeId::new();
        let parsed: EdgeId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_edge_serialization_skips_empty_fields() {
        let edge = Edge::new(1_i64, 2_i64);
        let json = serde_json::to_value(&edge).unwrap();
        assert!(json.get("weight").is_none());
        assert!(json.get("metadata").is_none());

        let back: Edge<i64> = serde_json::from_value(json).unwrap();
        assert_eq!(back, edge);
    }
}
