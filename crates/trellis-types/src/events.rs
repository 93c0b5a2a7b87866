//! Engine observability events
//!
//! The executor publishes these over a broadcast channel; subscribers (the
//! CLI progress printer, tests) consume them without coupling to the engine.

use crate::ids::NodeId;
use crate::node::NodeKind;
use crate::state::NodeState;
use serde::{Deserialize, Serialize};

/// Event emitted by the provisioning engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A node's provider call was dispatched
    NodeStarted { node: NodeId, kind: NodeKind },

    /// A node was created remotely
    NodeCreated { node: NodeId, physical_id: String },

    /// A node was updated remotely
    NodeUpdated { node: NodeId, physical_id: String },

    /// A node's parameters were unchanged; no provider call was made
    NodeUnchanged { node: NodeId },

    /// A node failed terminally
    NodeFailed { node: NodeId, error: String },

    /// A node was skipped without any provider call
    NodeSkipped { node: NodeId, state: NodeState },

    /// A node was deleted remotely (or was already gone)
    NodeDeleted { node: NodeId },

    /// The run finished
    RunCompleted {
        succeeded: bool,
        failed: usize,
        skipped: usize,
    },
}

/// Event with delivery timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineEventEnvelope {
    pub ts: chrono::DateTime<chrono::Utc>,
    #[serde(flatten)]
    pub event: EngineEvent,
}

impl EngineEventEnvelope {
    pub fn new(event: EngineEvent) -> Self {
        Self {
            ts: chrono::Utc::now(),
            event,
        }
    }
}
