//! Node lifecycle states and materialized resource records

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Per-node lifecycle state
///
/// Nodes move through these states under the executor's state machine;
/// transitions are driven strictly by dependency completion, never by
/// bespoke per-kind call chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Declared but not yet dispatched
    Pending,
    /// Create call in flight
    Creating,
    /// Materialized remotely (also the converged no-op state)
    Created,
    /// Update call in flight
    Updating,
    /// Provider call failed terminally
    Failed,
    /// Never attempted: an upstream dependency failed or was skipped
    SkippedUpstreamFailure,
    /// Never attempted: the node's group was disabled for this run
    SkippedByCondition,
    /// Delete call in flight
    ///
    /// Destroy walks nodes one at a time, so this state is momentary and
    /// reports only ever carry the terminal `Deleted`/`Failed`; in-flight
    /// progress is observable through `NodeStarted` events instead.
    Deleting,
    /// Removed remotely
    Deleted,
}

impl NodeState {
    /// Terminal success on the apply path
    pub fn is_success(&self) -> bool {
        matches!(self, NodeState::Created)
    }

    /// Terminal skip on the apply path (not a failure)
    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            NodeState::SkippedByCondition | NodeState::SkippedUpstreamFailure
        )
    }

    /// Any state the apply scheduler will not revisit
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NodeState::Created
                | NodeState::Failed
                | NodeState::SkippedUpstreamFailure
                | NodeState::SkippedByCondition
                | NodeState::Deleted
        )
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeState::Pending => "pending",
            NodeState::Creating => "creating",
            NodeState::Created => "created",
            NodeState::Updating => "updating",
            NodeState::Failed => "failed",
            NodeState::SkippedUpstreamFailure => "skipped_upstream_failure",
            NodeState::SkippedByCondition => "skipped_by_condition",
            NodeState::Deleting => "deleting",
            NodeState::Deleted => "deleted",
        };
        write!(f, "{}", s)
    }
}

/// A node output after a run
///
/// `Absent` is the explicit replacement for the sentinel empty string:
/// references into a condition-skipped subgraph resolve to `Absent`
/// (JSON `null` in provider parameters), and the consumer contract is
/// "absent means the feature is disabled for this run".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputValue {
    Present(String),
    Absent,
}

impl OutputValue {
    pub fn as_json(&self) -> serde_json::Value {
        match self {
            OutputValue::Present(s) => serde_json::Value::String(s.clone()),
            OutputValue::Absent => serde_json::Value::Null,
        }
    }

    pub fn as_present(&self) -> Option<&str> {
        match self {
            OutputValue::Present(s) => Some(s),
            OutputValue::Absent => None,
        }
    }
}

/// The remote platform's view of a materialized node
///
/// Owned exclusively by the shadow state store once created; the executor
/// never mutates these directly, only records the results of provider calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalResource {
    /// Opaque identifier assigned by the platform
    pub physical_id: String,

    /// Named output attributes returned by the platform
    pub outputs: BTreeMap<String, String>,

    /// Fingerprint of the resolved parameters that produced this resource
    pub fingerprint: String,

    /// First successful create
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Last successful create or update
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl PhysicalResource {
    pub fn new(
        physical_id: impl Into<String>,
        outputs: BTreeMap<String, String>,
        fingerprint: impl Into<String>,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            physical_id: physical_id.into(),
            outputs,
            fingerprint: fingerprint.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a successful update in place
    pub fn record_update(&mut self, outputs: BTreeMap<String, String>, fingerprint: String) {
        self.outputs = outputs;
        self.fingerprint = fingerprint;
        self.updated_at = chrono::Utc::now();
    }
}
