//! Engine configuration
//!
//! `EngineConfig` replaces process-wide defaults: it is built once (in code
//! or from TOML) and handed to [`DagEngine::new`](crate::DagEngine::new).

use crate::error::{Error, Result};
use crate::limits::{self, DEFAULT_MAX_DEPTH, MAX_TRAVERSAL_DEPTH};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Insertion checks applied to one category of edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgePolicy {
    /// Reject `parent == child`
    pub reject_self_loops: bool,

    /// Reject edges whose child already reaches the parent
    pub reject_cycles: bool,

    /// Allow a second edge between the same pair
    pub allow_duplicates: bool,

    /// Allow an edge that is already implied by a longer path
    pub allow_redundant: bool,
}

impl Default for EdgePolicy {
    fn default() -> Self {
        Self {
            reject_self_loops: true,
            reject_cycles: true,
            allow_duplicates: true,
            allow_redundant: true,
        }
    }
}

impl EdgePolicy {
    /// Policy rejecting every invariant violation
    pub fn strict() -> Self {
        Self {
            reject_self_loops: true,
            reject_cycles: true,
            allow_duplicates: false,
            allow_redundant: false,
        }
    }

    /// Policy with every check disabled
    pub fn permissive() -> Self {
        Self {
            reject_self_loops: false,
            reject_cycles: false,
            allow_duplicates: true,
            allow_redundant: true,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Depth used when a filter does not set one
    #[serde(default = "default_max_depth")]
    pub default_max_depth: u32,

    /// Largest depth a filter may request
    #[serde(default = "default_max_depth_limit")]
    pub max_depth_limit: u32,

    /// Policy for edges without a category or without an override
    #[serde(default)]
    pub default_policy: EdgePolicy,

    /// Per-category policy overrides keyed by edge type
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub edge_types: HashMap<String, EdgePolicy>,
}

fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}

fn default_max_depth_limit() -> u32 {
    MAX_TRAVERSAL_DEPTH
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_max_depth: default_max_depth(),
            max_depth_limit: default_max_depth_limit(),
            default_policy: EdgePolicy::default(),
            edge_types: HashMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_depth_limit == 0 {
            return Err(Error::Config("max_depth_limit must be positive".into()));
        }
        limits::validate_traversal_depth(self.default_max_depth, self.max_depth_limit)
            .map_err(|e| Error::Config(format!("default_max_depth: {}", e)))?;
        Ok(())
    }

    /// Set the default traversal depth
    pub fn with_default_max_depth(mut self, depth: u32) -> Self {
        self.default_max_depth = depth;
        self
    }

    /// Set the default insertion policy
    pub fn with_policy(mut self, policy: EdgePolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Override the insertion policy for one edge category
    pub fn with_type_policy(mut self, edge_type: impl Into<String>, policy: EdgePolicy) -> Self {
        self.edge_types.insert(edge_type.into(), policy);
        self
    }

    /// Toggle the redundancy check of the default policy
    pub fn allow_redundant_edges(mut self, allow: bool) -> Self {
        self.default_policy.allow_redundant = allow;
        self
    }

    /// Policy governing an edge of the given category
    pub fn policy_for(&self, edge_type: Option<&str>) -> EdgePolicy {
        edge_type
            .and_then(|t| self.edge_types.get(t))
            .copied()
            .unwrap_or(self.default_policy)
    }
}
