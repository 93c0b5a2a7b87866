//! Output propagation
//!
//! Exposes a completed node's returned identifiers to any node whose declared
//! parameters reference them. Resolution happens lazily, immediately before a
//! node's create/update call - never at graph-build time, because the
//! referenced node's outputs are unknown until it executes.

use crate::error::EngineError;
use std::collections::{BTreeMap, HashMap};
use trellis_provider::ResolvedParams;
use trellis_types::{NodeDecl, NodeId, NodeKind, NodeState, OutputValue, ParamValue};

/// Outputs recorded during a run, keyed by node id
pub type RunOutputs = HashMap<NodeId, BTreeMap<String, OutputValue>>;

/// Default outputs of a node that short-circuited by design
///
/// Every output name the kind would expose maps to [`OutputValue::Absent`];
/// consumers see JSON `null` and treat it as "feature disabled for this run".
pub fn absent_outputs(kind: NodeKind) -> BTreeMap<String, OutputValue> {
    kind.output_names()
        .iter()
        .map(|name| ((*name).to_string(), OutputValue::Absent))
        .collect()
}

/// Resolve a node's parameters against the run's recorded outputs
///
/// A reference into a skipped node resolves to `null`. A reference to a node
/// that never reached a terminal state is an [`EngineError::
/// UnresolvedReference`] - the topological guarantee makes that unreachable
/// in a valid run, so hitting it aborts the whole apply.
pub fn resolve_node_params(
    node: &NodeDecl,
    states: &HashMap<NodeId, NodeState>,
    outputs: &RunOutputs,
) -> Result<ResolvedParams, EngineError> {
    let mut resolved = ResolvedParams::new();

    for (name, value) in &node.params {
        let json = match value {
            ParamValue::Literal(v) => v.clone(),
            ParamValue::Reference(r) => {
                let reference = &r.reference;
                let state = states.get(&reference.node).copied();

                match state {
                    Some(s) if s.is_skipped() => serde_json::Value::Null,
                    Some(s) if s.is_terminal() => outputs
                        .get(&reference.node)
                        .and_then(|o| o.get(&reference.output))
                        .map(OutputValue::as_json)
                        .ok_or_else(|| EngineError::UnresolvedReference {
                            node: node.id.clone(),
                            target: reference.node.clone(),
                            output: reference.output.clone(),
                        })?,
                    _ => {
                        return Err(EngineError::UnresolvedReference {
                            node: node.id.clone(),
                            target: reference.node.clone(),
                            output: reference.output.clone(),
                        })
                    }
                }
            }
        };
        resolved.insert(name.clone(), json);
    }

    Ok(resolved)
}
