//! Taproot Core - DAG traversal and query engine
//!
//! This crate provides the data model, the [`EdgeRepository`] storage seam
//! and [`DagEngine`], which answers reachability, path, depth and
//! structural queries over a directed acyclic graph and validates every
//! edge before it is written.

pub mod analytics;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod index;
pub mod limits;
pub mod node;
pub mod observer;
pub mod path;
pub mod reduction;
pub mod repository;
pub mod traversal;

mod critical;
mod depth;
mod lca;
mod mutation;
mod validate;

#[cfg(test)]
mod testing;

pub use analytics::GraphStats;
pub use config::{EdgePolicy, EngineConfig};
pub use engine::DagEngine;
pub use error::{Error, Result};
pub use filter::{ResolvedFilter, TraversalFilter};
pub use index::EdgeIndex;
pub use node::{Direction, Edge, EdgeId, NewEdge, NodeId};
pub use observer::EdgeObserver;
pub use path::GraphPath;
pub use reduction::TransitiveReduction;
pub use repository::{ChangeSet, EdgeRepository, Frontier};
pub use traversal::Tree;
