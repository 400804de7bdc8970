//! Error types for Taproot Core

use thiserror::Error;

/// Result type alias using Taproot's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Taproot error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Node not reachable: no path from {from} to {to}")]
    NodeNotReachable { from: String, to: String },

    #[error("The object is an ancestor: edge {parent} -> {child} would create a cycle")]
    Cycle { parent: String, child: String },

    #[error("Duplicate edge: {parent} -> {child} already exists")]
    DuplicateEdge { parent: String, child: String },

    #[error("Redundant edge: {child} is already reachable from {parent}")]
    RedundantEdge { parent: String, child: String },

    #[error("Edge change vetoed: {0}")]
    Vetoed(String),

    #[error("Weight field not found or not numeric: {0}")]
    WeightFieldMissing(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Edge not found: {0}")]
    EdgeNotFound(String),

    #[error("Graph is not acyclic: {0}")]
    GraphNotAcyclic(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub(crate) fn not_reachable(from: impl ToString, to: impl ToString) -> Self {
        Self::NodeNotReachable {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// True when the error only signals that no path satisfied the query
    pub fn is_not_reachable(&self) -> bool {
        matches!(self, Self::NodeNotReachable { .. })
    }

    /// True for errors raised by the edge validator before any write
    pub fn is_rejected_edge(&self) -> bool {
        matches!(
            self,
            Self::Cycle { .. } | Self::DuplicateEdge { .. } | Self::RedundantEdge { .. }
        )
    }
}

impl From<crate::limits::ValidationError> for Error {
    fn from(err: crate::limits::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}
