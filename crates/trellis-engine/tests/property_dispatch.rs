//! Property tests over random DAGs: the executor never dispatches a node
//! before all of its dependencies completed successfully, re-applying a
//! converged stack makes zero provider calls, and a single failure poisons
//! exactly the forward closure of the failed node.

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use trellis_engine::{ApplyOptions, Executor, InMemoryShadowStore, RetryPolicy};
use trellis_graph::ResourceGraph;
use trellis_provider::mock::{CallLog, ScriptedAdapter};
use trellis_provider::{
    CreatedResource, ProviderAdapter, ProviderError, ProviderRegistry, ResolvedParams,
};
use trellis_types::{NodeDecl, NodeKind, NodeState, ParamValue, StackSpec};

/// Random DAG: node i may depend on any subset of nodes 0..i. Every node
/// carries a `name` literal so the shared call log can tag its calls.
fn arb_spec() -> impl Strategy<Value = StackSpec> {
    (1usize..12).prop_flat_map(|n| {
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
                        .with_param("name", ParamValue::literal(format!("n{}", i)))
                        .with_dependencies(deps),
                );
            }
            spec
        })
    })
}

fn registry(log: &Arc<CallLog>) -> ProviderRegistry {
    ProviderRegistry::new()
        .with_adapter(Arc::new(ScriptedAdapter::new(
            NodeKind::CollaboratorAgent,
            log.clone(),
        )))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn no_dispatch_before_dependencies_complete(spec in arb_spec()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let graph = Arc::new(ResourceGraph::build(spec).unwrap());
            let log = CallLog::new();
            let executor = Executor::new(
                graph.clone(),
                Arc::new(registry(&log)),
                Arc::new(InMemoryShadowStore::new()),
            );

            let report = executor.apply(ApplyOptions::default()).await.unwrap();
            prop_assert!(report.success());

            // A dependency's create call is recorded before it completes, and
            // completion gates the dependent's dispatch, so log order must
            // respect every edge.
            let names = log.dispatched_names();
            let position: HashMap<_, _> = names
                .iter()
                .enumerate()
                .map(|(p, name)| (name.clone(), p))
                .collect();
            for node in graph.nodes() {
                for dep in graph.dependencies_of(&node.id) {
                    prop_assert!(
                        position[dep.as_str()] < position[node.id.as_str()],
                        "{} dispatched before its dependency {}",
                        node.id,
                        dep
                    );
                }
            }
            Ok(())
        })?;
    }

    #[test]
    fn reapply_of_converged_stack_is_quiescent(spec in arb_spec()) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let graph = Arc::new(ResourceGraph::build(spec).unwrap());
            let log = CallLog::new();
            let shadow = Arc::new(InMemoryShadowStore::new());
            let executor = Executor::new(graph, Arc::new(registry(&log)), shadow);

            executor.apply(ApplyOptions::default()).await.unwrap();
            let after_first = log.total();

            let report = executor.apply(ApplyOptions::default()).await.unwrap();
            prop_assert!(report.success());
            prop_assert_eq!(log.total(), after_first);
            Ok(())
        })?;
    }

    #[test]
    fn failure_partitions_nodes_by_forward_reachability(
        spec in arb_spec(),
        failure_seed in any::<prop::sample::Index>(),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let graph = Arc::new(ResourceGraph::build(spec).unwrap());
            let victim = graph.nodes()[failure_seed.index(graph.len())].id.clone();

            // Scripted failures are per-adapter, not per-node; wrap the
            // adapter so exactly the victim's create is rejected.
            let log = CallLog::new();
            let adapter = NameRejectingAdapter {
                inner: ScriptedAdapter::new(NodeKind::CollaboratorAgent, log.clone()),
                reject: victim.to_string(),
            };
            let registry = ProviderRegistry::new().with_adapter(Arc::new(adapter));
            let executor = Executor::new(
                graph.clone(),
                Arc::new(registry),
                Arc::new(InMemoryShadowStore::new()),
            );

            let options = ApplyOptions {
                retry: RetryPolicy::immediate(),
                ..Default::default()
            };
            let report = executor.apply(options).await.unwrap();
            prop_assert!(!report.success());

            let poisoned = graph.reachable_from(&victim);
            for outcome in &report.outcomes {
                let expected = if outcome.node == victim {
                    NodeState::Failed
                } else if poisoned.contains(&outcome.node) {
                    NodeState::SkippedUpstreamFailure
                } else {
                    NodeState::Created
                };
                prop_assert_eq!(outcome.state, expected, "node {}", &outcome.node);
            }
            Ok(())
        })?;
    }
}

/// Adapter wrapper that fails creates for one specific `name` parameter
struct NameRejectingAdapter {
    inner: ScriptedAdapter,
    reject: String,
}

#[async_trait::async_trait]
impl ProviderAdapter for NameRejectingAdapter {
    fn kind(&self) -> NodeKind {
        self.inner.kind()
    }

    async fn create(&self, params: &ResolvedParams) -> trellis_provider::Result<CreatedResource> {
        if params.get("name").and_then(|v| v.as_str()) == Some(self.reject.as_str()) {
            return Err(ProviderError::Invalid(format!(
                "{} rejected by test",
                self.reject
            )));
        }
        self.inner.create(params).await
    }

    async fn update(
        &self,
        physical_id: &str,
        params: &ResolvedParams,
    ) -> trellis_provider::Result<std::collections::BTreeMap<String, String>> {
        self.inner.update(physical_id, params).await
    }

    async fn delete(&self, physical_id: &str, force: bool) -> trellis_provider::Result<()> {
        self.inner.delete(physical_id, force).await
    }
}
