//! Edge validation
//!
//! Runs before any edge is written, in a fixed order: self-loop, cycle,
//! duplicate, redundancy. Which checks apply is decided by the
//! [`EdgePolicy`] configured for the edge's type. Cycle and redundancy
//! checks walk the full reachable edge set; `max_depth` does not bound them.

use crate::config::EdgePolicy;
use crate::engine::DagEngine;
use crate::error::{Error, Result};
use crate::limits::{self, UNBOUNDED_DEPTH};
use crate::node::{Direction, EdgeId, NewEdge, NodeId};
use crate::repository::EdgeRepository;
use std::collections::HashSet;

impl<N: NodeId, R: EdgeRepository<N>> DagEngine<N, R> {
    /// Check whether `parent -> child` with the given attributes could be
    /// inserted, without writing anything
    pub async fn check_edge(&self, parent: &N, child: &N, attributes: &NewEdge) -> Result<()> {
        self.validate_edge(parent, child, attributes, &HashSet::new())
            .await
            .map(|_| ())
    }

    /// Run every check that applies to the new edge, treating the edges in
    /// `ignoring` as already deleted. Returns the policy that was applied.
    pub(crate) async fn validate_edge(
        &self,
        parent: &N,
        child: &N,
        attributes: &NewEdge,
        ignoring: &HashSet<EdgeId>,
    ) -> Result<EdgePolicy> {
        let policy = self.config().policy_for(attributes.edge_type.as_deref());
        if let Some(weight) = attributes.weight {
            limits::validate_weight(weight)?;
        }

        // A self-loop is also the shortest possible cycle
        if parent == child {
            if policy.reject_self_loops || policy.reject_cycles {
                tracing::debug!("Rejected self-loop on {}", parent);
                return Err(Error::Cycle {
                    parent: parent.to_string(),
                    child: child.to_string(),
                });
            }
            return Ok(policy);
        }

        if policy.reject_cycles {
            let below = self
                .load_reachable(child, Direction::Outgoing, UNBOUNDED_DEPTH)
                .await?;
            if below.reaches(child, parent, Direction::Outgoing, ignoring) {
                tracing::debug!("Rejected {} -> {}: would close a cycle", parent, child);
                return Err(Error::Cycle {
                    parent: parent.to_string(),
                    child: child.to_string(),
                });
            }
        }

        if !policy.allow_duplicates {
            let existing = self
                .repository()
                .edges_touching(std::slice::from_ref(parent), Direction::Outgoing)
                .await?;
            if existing
                .iter()
                .any(|e| &e.child == child && !ignoring.contains(&e.id))
            {
                return Err(Error::DuplicateEdge {
                    parent: parent.to_string(),
                    child: child.to_string(),
                });
            }
        }

        if !policy.allow_redundant {
            let below = self
                .load_reachable(parent, Direction::Outgoing, UNBOUNDED_DEPTH)
                .await?;
            let bypassed = below
                .outgoing(parent)
                .filter(|e| &e.child != child && !ignoring.contains(&e.id))
                .any(|e| below.reaches(&e.child, child, Direction::Outgoing, ignoring));
            if bypassed {
                return Err(Error::RedundantEdge {
                    parent: parent.to_string(),
                    child: child.to_string(),
                });
            }
        }

        Ok(policy)
    }
}
