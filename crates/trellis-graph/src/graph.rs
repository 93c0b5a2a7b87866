//! Resource graph construction and ordering

use crate::error::{Result, ValidationError};
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use tracing::debug;
use trellis_types::{GroupId, NodeDecl, NodeId, StackSpec};

/// A validated, acyclic graph of node declarations
///
/// Nodes keep their declaration order; the topological order breaks ties
/// between independent nodes by declaration index, so repeated builds of the
/// same spec always yield the same apply sequence.
#[derive(Debug, Clone)]
pub struct ResourceGraph {
    name: String,
    nodes: Vec<NodeDecl>,
    index: HashMap<NodeId, usize>,
    dependencies: Vec<BTreeSet<usize>>,
    dependents: Vec<BTreeSet<usize>>,
    order: Vec<usize>,
}

impl ResourceGraph {
    /// Build and validate a graph from a stack spec
    ///
    /// Checks, in order: per-record spec validation, duplicate ids,
    /// self-dependencies, unknown `depends_on` and reference targets, and
    /// cycles. Side effects: none.
    pub fn build(spec: StackSpec) -> Result<Self> {
        spec.validate()?;

        let StackSpec { name, nodes } = spec;

        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(ValidationError::DuplicateNodeId(node.id.clone()));
            }
        }

        // Edge set: explicit ordering constraints plus reference-derived
        // edges, deduplicated.
        let mut dependencies: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); nodes.len()];
        let mut dependents: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); nodes.len()];

        for (i, node) in nodes.iter().enumerate() {
            for target in &node.depends_on {
                if target == &node.id {
                    return Err(ValidationError::SelfDependency(node.id.clone()));
                }
                let Some(&t) = index.get(target) else {
                    return Err(ValidationError::UnknownDependency {
                        node: node.id.clone(),
                        target: target.clone(),
                    });
                };
                dependencies[i].insert(t);
                dependents[t].insert(i);
            }

            for reference in node.references() {
                if reference.node == node.id {
                    return Err(ValidationError::SelfDependency(node.id.clone()));
                }
                let Some(&t) = index.get(&reference.node) else {
                    return Err(ValidationError::UnknownReferenceTarget {
                        node: node.id.clone(),
                        target: reference.node.clone(),
                    });
                };
                dependencies[i].insert(t);
                dependents[t].insert(i);
            }
        }

        let order = topological_order(&nodes, &dependencies, &dependents)?;

        debug!(
            stack = %name,
            nodes = nodes.len(),
            edges = dependencies.iter().map(BTreeSet::len).sum::<usize>(),
            "resource graph built"
        );

        Ok(Self {
            name,
            nodes,
            index,
            dependencies,
            dependents,
            order,
        })
    }

    /// Stack name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node declarations in declaration order
    pub fn nodes(&self) -> &[NodeDecl] {
        &self.nodes
    }

    /// Look up a declaration by id
    pub fn node(&self, id: &NodeId) -> Option<&NodeDecl> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Deterministic application order
    pub fn apply_order(&self) -> Vec<NodeId> {
        self.order.iter().map(|&i| self.nodes[i].id.clone()).collect()
    }

    /// Exact reverse of the application order
    pub fn destroy_order(&self) -> Vec<NodeId> {
        let mut order = self.apply_order();
        order.reverse();
        order
    }

    /// Direct dependencies of a node
    pub fn dependencies_of(&self, id: &NodeId) -> Vec<NodeId> {
        self.adjacent(id, &self.dependencies)
    }

    /// Direct dependents of a node
    pub fn dependents_of(&self, id: &NodeId) -> Vec<NodeId> {
        self.adjacent(id, &self.dependents)
    }

    /// All nodes reachable from `id` along forward (dependent) edges
    ///
    /// This is the set that ends `SkippedUpstreamFailure` when `id` fails.
    pub fn reachable_from(&self, id: &NodeId) -> BTreeSet<NodeId> {
        let Some(&start) = self.index.get(id) else {
            return BTreeSet::new();
        };

        let mut seen = BTreeSet::new();
        let mut stack = vec![start];
        while let Some(i) = stack.pop() {
            for &d in &self.dependents[i] {
                if seen.insert(d) {
                    stack.push(d);
                }
            }
        }
        seen.into_iter().map(|i| self.nodes[i].id.clone()).collect()
    }

    /// Ids of every node declared in the given group
    pub fn group_members(&self, group: &GroupId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.group.as_ref() == Some(group))
            .map(|n| n.id.clone())
            .collect()
    }

    fn adjacent(&self, id: &NodeId, edges: &[BTreeSet<usize>]) -> Vec<NodeId> {
        match self.index.get(id) {
            Some(&i) => edges[i].iter().map(|&j| self.nodes[j].id.clone()).collect(),
            None => Vec::new(),
        }
    }
}

/// Kahn's algorithm with the ready set always yielding the lowest
/// declaration index, so independent nodes keep declaration order.
fn topological_order(
    nodes: &[NodeDecl],
    dependencies: &[BTreeSet<usize>],
    dependents: &[BTreeSet<usize>],
) -> Result<Vec<usize>> {
    let mut indegree: Vec<usize> = dependencies.iter().map(BTreeSet::len).collect();
    let mut ready: BinaryHeap<Reverse<usize>> = indegree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(Reverse(i)) = ready.pop() {
        order.push(i);
        for &d in &dependents[i] {
            indegree[d] -= 1;
            if indegree[d] == 0 {
                ready.push(Reverse(d));
            }
        }
    }

    if order.len() < nodes.len() {
        let members = indegree
            .iter()
            .enumerate()
            .filter(|(_, &d)| d > 0)
            .map(|(i, _)| nodes[i].id.to_string())
            .collect();
        return Err(ValidationError::Cycle { members });
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_types::{NodeKind, ParamValue};

    fn agent_network() -> StackSpec {
        StackSpec::new("agent-network")
            .with_node(NodeDecl::new("store", NodeKind::KnowledgeStore))
            .with_node(
                NodeDecl::new("primary", NodeKind::PrimaryAgent)
                    .with_param("store_id", ParamValue::reference("store", "store_id"))
                    .with_dependencies(["store"]),
            )
            .with_node(
                NodeDecl::new("collab1", NodeKind::CollaboratorAgent)
                    .with_dependencies(["primary"]),
            )
            .with_node(
                NodeDecl::new("collab2", NodeKind::CollaboratorAgent)
                    .with_dependencies(["primary"]),
            )
            .with_node(
                NodeDecl::new("toggle", NodeKind::CapabilityToggle)
                    .with_param("agent_id", ParamValue::reference("primary", "agent_id")),
            )
            .with_node(
                NodeDecl::new("assoc1", NodeKind::CollaboratorAssociation)
                    .with_param("agent_id", ParamValue::reference("primary", "agent_id"))
                    .with_param(
                        "collaborator_id",
                        ParamValue::reference("collab1", "agent_id"),
                    ),
            )
            .with_node(
                NodeDecl::new("assoc2", NodeKind::CollaboratorAssociation)
                    .with_param("agent_id", ParamValue::reference("primary", "agent_id"))
                    .with_param(
                        "collaborator_id",
                        ParamValue::reference("collab2", "agent_id"),
                    ),
            )
            .with_node(
                NodeDecl::new("publish", NodeKind::PublishStep)
                    .with_param("agent_id", ParamValue::reference("primary", "agent_id"))
                    // The platform cannot express "associations before
                    // publish" as a data reference; declared explicitly.
                    .with_dependencies(["toggle", "assoc1", "assoc2"]),
            )
            .with_node(
                NodeDecl::new("alias", NodeKind::Alias)
                    .with_param("agent_id", ParamValue::reference("primary", "agent_id"))
                    .with_param("version", ParamValue::reference("publish", "version")),
            )
    }

    fn ids(order: &[NodeId]) -> Vec<&str> {
        order.iter().map(NodeId::as_str).collect()
    }

    #[test]
    fn agent_network_apply_order() {
        let graph = ResourceGraph::build(agent_network()).unwrap();
        assert_eq!(
            ids(&graph.apply_order()),
            vec![
                "store", "primary", "collab1", "collab2", "toggle", "assoc1", "assoc2",
                "publish", "alias"
            ]
        );
    }

    #[test]
    fn destroy_order_is_exact_reverse() {
        let graph = ResourceGraph::build(agent_network()).unwrap();
        let mut reversed = graph.apply_order();
        reversed.reverse();
        assert_eq!(graph.destroy_order(), reversed);
    }

    #[test]
    fn repeated_builds_yield_identical_orders() {
        let a = ResourceGraph::build(agent_network()).unwrap().apply_order();
        let b = ResourceGraph::build(agent_network()).unwrap().apply_order();
        assert_eq!(a, b);
    }

    #[test]
    fn references_create_edges() {
        let graph = ResourceGraph::build(agent_network()).unwrap();
        // toggle has no depends_on entry; its edge comes from the reference.
        assert_eq!(graph.dependencies_of(&"toggle".into()), vec!["primary".into()]);
    }

    #[test]
    fn reachable_from_is_transitive() {
        let graph = ResourceGraph::build(agent_network()).unwrap();
        let reachable = graph.reachable_from(&"collab1".into());
        assert!(reachable.contains(&"assoc1".into()));
        assert!(reachable.contains(&"publish".into()));
        assert!(reachable.contains(&"alias".into()));
        assert!(!reachable.contains(&"collab2".into()));
        assert!(!reachable.contains(&"toggle".into()));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let spec = StackSpec::new("dup")
            .with_node(NodeDecl::new("a", NodeKind::PrimaryAgent))
            .with_node(NodeDecl::new("a", NodeKind::Alias));
        assert!(matches!(
            ResourceGraph::build(spec),
            Err(ValidationError::DuplicateNodeId(_))
        ));
    }

    #[test]
    fn rejects_unknown_dependency() {
        let spec = StackSpec::new("unknown")
            .with_node(NodeDecl::new("a", NodeKind::PrimaryAgent).with_dependencies(["ghost"]));
        assert!(matches!(
            ResourceGraph::build(spec),
            Err(ValidationError::UnknownDependency { .. })
        ));
    }

    #[test]
    fn rejects_unknown_reference_target() {
        let spec = StackSpec::new("unknown-ref").with_node(
            NodeDecl::new("a", NodeKind::Alias)
                .with_param("version", ParamValue::reference("ghost", "version")),
        );
        assert!(matches!(
            ResourceGraph::build(spec),
            Err(ValidationError::UnknownReferenceTarget { .. })
        ));
    }

    #[test]
    fn rejects_self_dependency() {
        let spec = StackSpec::new("self")
            .with_node(NodeDecl::new("a", NodeKind::PrimaryAgent).with_dependencies(["a"]));
        assert!(matches!(
            ResourceGraph::build(spec),
            Err(ValidationError::SelfDependency(_))
        ));
    }

    #[test]
    fn rejects_cycles_with_members() {
        let spec = StackSpec::new("cycle")
            .with_node(NodeDecl::new("a", NodeKind::PrimaryAgent).with_dependencies(["c"]))
            .with_node(NodeDecl::new("b", NodeKind::CollaboratorAgent).with_dependencies(["a"]))
            .with_node(NodeDecl::new("c", NodeKind::CollaboratorAgent).with_dependencies(["b"]));
        match ResourceGraph::build(spec) {
            Err(ValidationError::Cycle { members }) => {
                assert_eq!(members, vec!["a", "b", "c"]);
            }
            other => panic!("expected cycle error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn group_members_lookup() {
        let spec = StackSpec::new("groups")
            .with_node(NodeDecl::new("store", NodeKind::KnowledgeStore).with_group("knowledge"))
            .with_node(NodeDecl::new("primary", NodeKind::PrimaryAgent));
        let graph = ResourceGraph::build(spec).unwrap();
        assert_eq!(
            graph.group_members(&"knowledge".into()),
            vec![NodeId::new("store")]
        );
    }
}
