//! Edge change notifications
//!
//! Observers registered with [`DagEngine::with_observer`](crate::DagEngine::with_observer)
//! see every edge the engine creates or deletes. Each commit notifies in
//! four phases: `before_delete`, `before_create`, the backend write, then
//! `after_delete` and `after_create`. A phase is skipped when it has no
//! edges, and bulk removals arrive as one slice.
//!
//! An error from a `before_*` hook aborts the commit before anything is
//! written and is returned to the caller unchanged.

use crate::error::Result;
use crate::node::Edge;

/// Hooks around edge creation and deletion
pub trait EdgeObserver<N>: Send + Sync {
    /// Called with the edges about to be created; an error vetoes the commit
    fn before_create(&self, _edges: &[Edge<N>]) -> Result<()> {
        Ok(())
    }

    /// Called with the edges the backend just created
    fn after_create(&self, _edges: &[Edge<N>]) {}

    /// Called with the edges about to be deleted, including those removed
    /// with a deleted node; an error vetoes the commit
    fn before_delete(&self, _edges: &[Edge<N>]) -> Result<()> {
        Ok(())
    }

    /// Called with the edges the backend just deleted
    fn after_delete(&self, _edges: &[Edge<N>]) {}
}
