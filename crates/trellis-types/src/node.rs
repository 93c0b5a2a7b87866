//! Node declarations
//!
//! A [`NodeDecl`] describes one remote object to provision: its kind, its
//! parameters (literals or references to other nodes' outputs), and its
//! explicit ordering edges. Explicit `depends_on` entries may be a superset
//! of the reference-derived edges - some platform sequencing requirements
//! (e.g. "associate collaborators before publishing") are not expressible as
//! a data reference.

use crate::ids::{GroupId, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of remote object a node provisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// The top-level coordinating agent
    PrimaryAgent,
    /// A specialist agent the primary delegates to
    CollaboratorAgent,
    /// A knowledge store attachable to an agent
    KnowledgeStore,
    /// A declared external function interface attachable to an agent
    ToolGroup,
    /// Enables a built-in capability (e.g. code execution) on an agent draft
    CapabilityToggle,
    /// Wires a collaborator agent into the primary agent's draft
    CollaboratorAssociation,
    /// Snapshots a draft configuration into an immutable version
    PublishStep,
    /// Stable external pointer to a published version
    Alias,
}

impl NodeKind {
    /// Output attribute names this kind exposes after a successful create
    ///
    /// Condition-skipped nodes expose the same names with
    /// [`crate::OutputValue::Absent`] values.
    pub fn output_names(&self) -> &'static [&'static str] {
        match self {
            NodeKind::PrimaryAgent | NodeKind::CollaboratorAgent => &["agent_id"],
            NodeKind::KnowledgeStore => &["store_id"],
            NodeKind::ToolGroup => &["group_id"],
            NodeKind::CapabilityToggle => &["toggle_id"],
            NodeKind::CollaboratorAssociation => &["association_id"],
            NodeKind::PublishStep => &["version"],
            NodeKind::Alias => &["alias_id"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::PrimaryAgent => "primary_agent",
            NodeKind::CollaboratorAgent => "collaborator_agent",
            NodeKind::KnowledgeStore => "knowledge_store",
            NodeKind::ToolGroup => "tool_group",
            NodeKind::CapabilityToggle => "capability_toggle",
            NodeKind::CollaboratorAssociation => "collaborator_association",
            NodeKind::PublishStep => "publish_step",
            NodeKind::Alias => "alias",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reference to a named output of another node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRef {
    /// The node whose output is referenced
    pub node: NodeId,
    /// The output attribute name (e.g. `agent_id`, `version`)
    pub output: String,
}

/// Wrapper giving references a distinct wire shape: `{ "ref": { ... } }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceParam {
    #[serde(rename = "ref")]
    pub reference: OutputRef,
}

/// A parameter value: either a literal or an unresolved output reference
///
/// References are resolved lazily, immediately before the owning node's
/// create/update call - never at graph-build time, because the referenced
/// node's outputs are unknown until it executes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    // Reference must come first: a map with a single `ref` key is a
    // reference, anything else falls through to Literal.
    Reference(ReferenceParam),
    Literal(serde_json::Value),
}

impl ParamValue {
    pub fn literal(value: impl Into<serde_json::Value>) -> Self {
        ParamValue::Literal(value.into())
    }

    pub fn reference(node: impl Into<NodeId>, output: impl Into<String>) -> Self {
        ParamValue::Reference(ReferenceParam {
            reference: OutputRef {
                node: node.into(),
                output: output.into(),
            },
        })
    }

    pub fn as_reference(&self) -> Option<&OutputRef> {
        match self {
            ParamValue::Reference(r) => Some(&r.reference),
            ParamValue::Literal(_) => None,
        }
    }
}

/// Declaration of a single remote object to provision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDecl {
    /// Stable id, unique within the stack
    pub id: NodeId,

    /// What kind of remote object this node provisions
    pub kind: NodeKind,

    /// Conditional subgraph membership (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupId>,

    /// Parameters passed to the provider adapter
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, ParamValue>,

    /// Explicit ordering edges (superset of reference-derived edges)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<NodeId>,
}

impl NodeDecl {
    pub fn new(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            group: None,
            params: BTreeMap::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_group(mut self, group: impl Into<GroupId>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    pub fn with_dependencies(mut self, ids: impl IntoIterator<Item = impl Into<NodeId>>) -> Self {
        self.depends_on.extend(ids.into_iter().map(Into::into));
        self
    }

    /// All output references embedded in this node's parameters
    pub fn references(&self) -> impl Iterator<Item = &OutputRef> {
        self.params.values().filter_map(ParamValue::as_reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_value_yaml_roundtrip() {
        let yaml = r#"
name: supervisor
store_id:
  ref:
    node: store
    output: store_id
"#;
        let params: BTreeMap<String, ParamValue> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            params["name"],
            ParamValue::literal("supervisor"),
        );
        let reference = params["store_id"].as_reference().unwrap();
        assert_eq!(reference.node.as_str(), "store");
        assert_eq!(reference.output, "store_id");
    }

    #[test]
    fn literal_map_without_ref_key_stays_literal() {
        let yaml = "config:\n  region: eu-central-1\n  depth: 3\n";
        let params: BTreeMap<String, ParamValue> = serde_yaml::from_str(yaml).unwrap();
        assert!(params["config"].as_reference().is_none());
    }

    #[test]
    fn kind_output_names() {
        assert_eq!(NodeKind::PublishStep.output_names(), &["version"]);
        assert_eq!(NodeKind::PrimaryAgent.output_names(), &["agent_id"]);
    }

    #[test]
    fn node_decl_collects_references() {
        let decl = NodeDecl::new("alias", NodeKind::Alias)
            .with_param("version", ParamValue::reference("publish", "version"))
            .with_param("name", ParamValue::literal("live"));
        let refs: Vec<_> = decl.references().collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].node.as_str(), "publish");
    }
}
