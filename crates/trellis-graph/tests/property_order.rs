//! Property tests: any random DAG yields a valid, deterministic order.
//!
//! Validity means every node appears after all of its dependencies, and the
//! destroy order is the exact reverse of the apply order.

use proptest::prelude::*;
use std::collections::HashMap;
use trellis_graph::ResourceGraph;
use trellis_types::{NodeDecl, NodeKind, StackSpec};

/// Generate a random DAG: node i may depend on any subset of nodes 0..i.
fn arb_spec() -> impl Strategy<Value = StackSpec> {
    (1usize..16).prop_flat_map(|n| {
        let bits = n * (n - 1) / 2;
        prop::collection::vec(any::<bool>(), bits).prop_map(move |edges| {
            let mut spec = StackSpec::new("random-dag");
            let mut k = 0;
            for i in 0..n {
                let mut deps = Vec::new();
                for j in 0..i {
                    if edges[k] {
                        deps.push(format!("n{}", j));
                    }
                    k += 1;
                }
                spec = spec.with_node(
                    NodeDecl::new(format!("n{}", i), NodeKind::CollaboratorAgent)
                        .with_dependencies(deps),
                );
            }
            spec
        })
    })
}

proptest! {
    #[test]
    fn apply_order_respects_dependencies(spec in arb_spec()) {
        let graph = ResourceGraph::build(spec).unwrap();
        let order = graph.apply_order();

        let position: HashMap<_, _> = order
            .iter()
            .enumerate()
            .map(|(p, id)| (id.clone(), p))
            .collect();

        for node in graph.nodes() {
            for dep in graph.dependencies_of(&node.id) {
                prop_assert!(position[&dep] < position[&node.id]);
            }
        }

        let mut reversed = order.clone();
        reversed.reverse();
        prop_assert_eq!(graph.destroy_order(), reversed);
    }

    #[test]
    fn apply_order_is_deterministic(spec in arb_spec()) {
        let a = ResourceGraph::build(spec.clone()).unwrap().apply_order();
        let b = ResourceGraph::build(spec).unwrap().apply_order();
        prop_assert_eq!(a, b);
    }
}
