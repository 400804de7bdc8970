//! Input validation limits for traversal and edge attributes

/// Default recursion depth for every traversal (20)
pub const DEFAULT_MAX_DEPTH: u32 = 20;

/// Hard ceiling for a per-call depth override (1000)
pub const MAX_TRAVERSAL_DEPTH: u32 = 1000;

/// Depth passed to edge fetches that must see everything reachable
pub const UNBOUNDED_DEPTH: u32 = u32::MAX;

/// Ceiling on the number of paths `all_paths` enumerates, whatever
/// `max_results` asks for
pub const DEFAULT_MAX_PATHS: usize = 1000;

/// Name of the built-in numeric edge attribute
pub const DEFAULT_WEIGHT_FIELD: &str = "weight";

/// Validation error type
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    ZeroTraversalDepth,
    TraversalDepthTooLarge { depth: u32, max: u32 },
    InvalidWeight { weight: f64 },
    ZeroMaxResults,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroTraversalDepth => write!(f, "Traversal depth must be positive"),
            Self::TraversalDepthTooLarge { depth, max } => {
                write!(f, "Traversal depth too large: {} (max {})", depth, max)
            }
            Self::InvalidWeight { weight } => {
                write!(f, "Edge weight must be a non-negative number, got {}", weight)
            }
            Self::ZeroMaxResults => write!(f, "max_results must be positive"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate traversal depth against a ceiling
pub fn validate_traversal_depth(depth: u32, max: u32) -> Result<(), ValidationError> {
    if depth == 0 {
        return Err(ValidationError::ZeroTraversalDepth);
    }
    if depth > max {
        return Err(ValidationError::TraversalDepthTooLarge { depth, max });
    }
    Ok(())
}

/// Validate an edge weight
pub fn validate_weight(weight: f64) -> Result<(), ValidationError> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(ValidationError::InvalidWeight { weight });
    }
    Ok(())
}

/// Validate the result cap for path enumeration
pub fn validate_max_results(max_results: usize) -> Result<(), ValidationError> {
    if max_results == 0 {
        return Err(ValidationError::ZeroMaxResults);
    }
    Ok(())
}
