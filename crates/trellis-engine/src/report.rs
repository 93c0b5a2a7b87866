//! Run reports
//!
//! The executor's summary of what happened to each node, in execution order,
//! plus the run's recorded outputs. Reports serialize to JSON for the CLI's
//! machine-readable output.

use crate::propagator::RunOutputs;
use serde::Serialize;
use trellis_types::{NodeId, NodeKind, NodeState, OutputValue};

/// What the executor did for one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeAction {
    /// Create call succeeded (or a conflict rerouted into a successful update)
    Created,
    /// Parameters changed; update call succeeded
    Updated,
    /// Fingerprint matched the shadow record; no provider call was made
    Unchanged,
    /// No provider call: disabled group or upstream failure
    Skipped,
    /// Provider call failed terminally
    Failed,
    /// Delete call succeeded
    Deleted,
    /// No shadow record and nothing to delete
    AlreadyAbsent,
}

/// Per-node outcome of a run
#[derive(Debug, Clone, Serialize)]
pub struct NodeOutcome {
    pub node: NodeId,
    pub kind: NodeKind,
    pub state: NodeState,
    pub action: NodeAction,
    /// Terminal error message, for `Failed` outcomes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of an apply run
#[derive(Debug, Serialize)]
pub struct ApplyReport {
    /// Outcomes in application order
    pub outcomes: Vec<NodeOutcome>,
    /// Outputs recorded during the run, including `Absent` entries for
    /// condition-skipped nodes
    pub outputs: RunOutputs,
    /// The run stopped dispatching because cancellation was requested
    pub cancelled: bool,
}

impl ApplyReport {
    /// True when every node converged or was skipped by condition
    pub fn success(&self) -> bool {
        !self.cancelled
            && self.outcomes.iter().all(|o| {
                o.state.is_success() || o.state == NodeState::SkippedByCondition
            })
    }

    pub fn failed_nodes(&self) -> Vec<&NodeId> {
        self.outcomes
            .iter()
            .filter(|o| o.state == NodeState::Failed)
            .map(|o| &o.node)
            .collect()
    }

    pub fn skipped_nodes(&self) -> Vec<&NodeId> {
        self.outcomes
            .iter()
            .filter(|o| o.state.is_skipped())
            .map(|o| &o.node)
            .collect()
    }

    /// Recorded outputs of one node
    pub fn outputs_of(&self, node: &NodeId) -> Option<&std::collections::BTreeMap<String, OutputValue>> {
        self.outputs.get(node)
    }
}

/// Result of a destroy run
#[derive(Debug, Serialize)]
pub struct DestroyReport {
    /// Outcomes in destruction order
    pub outcomes: Vec<NodeOutcome>,
}

impl DestroyReport {
    /// True when every node was deleted or already absent
    pub fn success(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| matches!(o.action, NodeAction::Deleted | NodeAction::AlreadyAbsent))
    }

    pub fn failed_nodes(&self) -> Vec<&NodeId> {
        self.outcomes
            .iter()
            .filter(|o| o.state == NodeState::Failed)
            .map(|o| &o.node)
            .collect()
    }
}
