//! Engine error types

use crate::state_store::StateStoreError;
use thiserror::Error;
use trellis_types::{NodeId, NodeKind};

/// Errors that abort an entire run
///
/// Node-level provider failures are NOT represented here - they are contained
/// per node and reported through the run report. These errors mean the run
/// itself cannot proceed.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("No provider adapter registered for kind {0}")]
    NoAdapter(NodeKind),

    /// Defensive invariant check: the topological guarantee means a
    /// referenced node is always terminal by the time its dependents resolve.
    #[error(
        "Unresolved reference: node {node} needs output {output} of {target}, \
         which never reached a terminal state"
    )]
    UnresolvedReference {
        node: NodeId,
        target: NodeId,
        output: String,
    },

    #[error("State store error: {0}")]
    StateStore(#[from] StateStoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
