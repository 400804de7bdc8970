//! Taproot Storage - Storage backends for the DAG engine
//!
//! Each backend implements [`taproot_core::EdgeRepository`] and applies a
//! change set atomically, re-checking acyclicity inside its transaction
//! when asked to.

#![allow(clippy::result_large_err)]

pub mod error;

#[cfg(feature = "redb")]
pub mod redb;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub mod memory;

pub use error::{StorageError, StorageResult};

#[cfg(feature = "redb")]
pub use redb::RedbStorage;

#[cfg(feature = "sqlite")]
pub use sqlite::{SqlNodeId, SqliteStorage};

pub use memory::MemoryStorage;
