//! Stack specifications
//!
//! A [`StackSpec`] is the ordered list of node declarations consumed by the
//! graph builder. Declaration order is semantic: ties between independent
//! nodes are broken by it, so the same spec always yields the same apply
//! sequence.

use crate::node::NodeDecl;
use serde::{Deserialize, Serialize};

/// Declarative specification of everything to provision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackSpec {
    /// Human-readable stack name
    pub name: String,

    /// Node declarations, in declaration order
    pub nodes: Vec<NodeDecl>,
}

impl StackSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
        }
    }

    pub fn with_node(mut self, node: NodeDecl) -> Self {
        self.nodes.push(node);
        self
    }

    /// Shallow per-record validation
    ///
    /// Graph-level checks (duplicates, unknown targets, cycles) belong to the
    /// graph builder; this catches malformed records before they get there.
    pub fn validate(&self) -> Result<(), SpecValidationError> {
        if self.name.is_empty() {
            return Err(SpecValidationError::EmptyStackName);
        }

        for node in &self.nodes {
            if node.id.is_empty() {
                return Err(SpecValidationError::EmptyNodeId);
            }

            for reference in node.references() {
                if reference.output.is_empty() {
                    return Err(SpecValidationError::EmptyReferenceOutput {
                        node: node.id.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Spec validation errors
#[derive(Debug, thiserror::Error)]
pub enum SpecValidationError {
    #[error("Stack name cannot be empty")]
    EmptyStackName,

    #[error("Node id cannot be empty")]
    EmptyNodeId,

    #[error("Node {node} declares a reference with an empty output name")]
    EmptyReferenceOutput { node: String },
}
