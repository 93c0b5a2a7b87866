//! Graph validation errors

use thiserror::Error;
use trellis_types::{NodeId, SpecValidationError};

/// Errors raised while building a resource graph
///
/// All of these are fatal and abort before any remote call.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Duplicate node id: {0}")]
    DuplicateNodeId(NodeId),

    #[error("Node {node} depends on unknown node {target}")]
    UnknownDependency { node: NodeId, target: NodeId },

    #[error("Node {node} references an output of unknown node {target}")]
    UnknownReferenceTarget { node: NodeId, target: NodeId },

    #[error("Node {0} depends on itself")]
    SelfDependency(NodeId),

    #[error("Dependency cycle involving: {}", members.join(", "))]
    Cycle { members: Vec<String> },

    #[error(transparent)]
    Spec(#[from] SpecValidationError),
}

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, ValidationError>;
