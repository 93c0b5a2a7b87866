//! Dependency-ordered execution
//!
//! The executor is a per-node state machine driven purely by dependency
//! completion: a node is dispatched once every dependency has reached a
//! terminal state, independent nodes run concurrently in a `JoinSet`, and a
//! dependency edge is a mutual-exclusion discipline - a dependent never
//! starts before its dependency's remote call has completed.
//!
//! Failures are contained, never rolled back: a failed node poisons only its
//! forward closure (`SkippedUpstreamFailure`), siblings keep converging, and
//! re-running the same spec picks up where the last run stopped because
//! converged nodes no-op against the shadow store.

use crate::error::{EngineError, Result};
use crate::fingerprint::fingerprint;
use crate::propagator::{absent_outputs, resolve_node_params, RunOutputs};
use crate::report::{ApplyReport, DestroyReport, NodeAction, NodeOutcome};
use crate::retry::RetryPolicy;
use crate::state_store::ShadowStateStore;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use trellis_graph::ResourceGraph;
use trellis_provider::{ProviderAdapter, ProviderError, ProviderRegistry, ResolvedParams};
use trellis_types::{
    EngineEvent, EngineEventEnvelope, GroupId, NodeId, NodeKind, NodeState, OutputValue,
    PhysicalResource,
};

/// Options for an apply run
#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    /// Groups whose members are skipped with absent outputs
    pub disabled_groups: BTreeSet<GroupId>,
    /// Backoff for transient provider failures
    pub retry: RetryPolicy,
    /// Fires to stop new dispatches; in-flight nodes finish
    pub cancel: CancellationToken,
}

/// Options for a destroy run
#[derive(Debug, Clone, Copy)]
pub struct DestroyOptions {
    /// Pass `force` to every delete, bypassing the platform's in-use checks
    pub force_teardown: bool,
    /// Backoff for transient provider failures
    pub retry: RetryPolicy,
}

impl Default for DestroyOptions {
    fn default() -> Self {
        Self {
            force_teardown: false,
            retry: RetryPolicy::default(),
        }
    }
}

/// Payload a successful provider task hands back to the coordinator
struct TaskSuccess {
    physical_id: String,
    outputs: BTreeMap<String, String>,
    action: NodeAction,
}

type TaskResult = (NodeId, std::result::Result<TaskSuccess, String>);

/// Dependency-ordered provisioning executor
///
/// One instance per graph; `apply` and `destroy` borrow it immutably, so a
/// caller can hold subscriptions across runs.
pub struct Executor {
    graph: Arc<ResourceGraph>,
    registry: Arc<ProviderRegistry>,
    shadow: Arc<dyn ShadowStateStore>,
    event_tx: broadcast::Sender<EngineEventEnvelope>,
}

impl Executor {
    pub fn new(
        graph: Arc<ResourceGraph>,
        registry: Arc<ProviderRegistry>,
        shadow: Arc<dyn ShadowStateStore>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            graph,
            registry,
            shadow,
            event_tx,
        }
    }

    /// Subscribe to engine events (progress lines, test assertions)
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEventEnvelope> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: EngineEvent) {
        // No subscribers is fine; events are observability, not control flow.
        let _ = self.event_tx.send(EngineEventEnvelope::new(event));
    }

    fn adapter_for(&self, kind: NodeKind) -> Result<Arc<dyn ProviderAdapter>> {
        self.registry.get(kind).ok_or(EngineError::NoAdapter(kind))
    }

    /// Converge the graph against the remote platform
    ///
    /// Terminates when every node is terminal or cancellation stopped the
    /// remaining dispatches. Returns `Err` only for run-level faults (missing
    /// adapter, state store I/O, unresolved reference); per-node provider
    /// failures are contained in the report.
    #[instrument(skip_all, fields(stack = %self.graph.name()))]
    pub async fn apply(&self, options: ApplyOptions) -> Result<ApplyReport> {
        // Fail before the first remote call, not halfway through the graph.
        for node in self.graph.nodes() {
            self.adapter_for(node.kind)?;
        }

        let disabled: BTreeSet<NodeId> = options
            .disabled_groups
            .iter()
            .flat_map(|g| self.graph.group_members(g))
            .collect();

        let apply_order = self.graph.apply_order();
        let mut states: HashMap<NodeId, NodeState> = apply_order
            .iter()
            .map(|id| (id.clone(), NodeState::Pending))
            .collect();
        let mut outputs = RunOutputs::new();
        let mut actions: HashMap<NodeId, NodeAction> = HashMap::new();
        let mut errors: HashMap<NodeId, String> = HashMap::new();
        let mut tasks: JoinSet<TaskResult> = JoinSet::new();

        loop {
            let mut progressed = false;

            if !options.cancel.is_cancelled() {
                for id in &apply_order {
                    if states[id] != NodeState::Pending {
                        continue;
                    }
                    let deps = self.graph.dependencies_of(id);
                    if deps.iter().any(|d| !states[d].is_terminal()) {
                        continue;
                    }

                    let node = self.graph.node(id).ok_or_else(|| {
                        EngineError::Internal(format!("node {id} missing from graph"))
                    })?;

                    if disabled.contains(id) {
                        states.insert(id.clone(), NodeState::SkippedByCondition);
                        outputs.insert(id.clone(), absent_outputs(node.kind));
                        actions.insert(id.clone(), NodeAction::Skipped);
                        self.emit(EngineEvent::NodeSkipped {
                            node: id.clone(),
                            state: NodeState::SkippedByCondition,
                        });
                        progressed = true;
                        continue;
                    }

                    // Only hard failures poison dependents; a dependency
                    // skipped by condition resolves to absent outputs and the
                    // dependent proceeds.
                    let upstream_failed = deps.iter().any(|d| {
                        matches!(
                            states[d],
                            NodeState::Failed | NodeState::SkippedUpstreamFailure
                        )
                    });
                    if upstream_failed {
                        states.insert(id.clone(), NodeState::SkippedUpstreamFailure);
                        outputs.insert(id.clone(), absent_outputs(node.kind));
                        actions.insert(id.clone(), NodeAction::Skipped);
                        self.emit(EngineEvent::NodeSkipped {
                            node: id.clone(),
                            state: NodeState::SkippedUpstreamFailure,
                        });
                        progressed = true;
                        continue;
                    }

                    let params = resolve_node_params(node, &states, &outputs)?;
                    let digest = fingerprint(&params);

                    match self.shadow.get(id).await? {
                        Some(record) if record.fingerprint == digest => {
                            // Already converged; surface the stored outputs
                            // without touching the platform.
                            states.insert(id.clone(), NodeState::Created);
                            outputs.insert(id.clone(), present_outputs(&record.outputs));
                            actions.insert(id.clone(), NodeAction::Unchanged);
                            self.emit(EngineEvent::NodeUnchanged { node: id.clone() });
                            progressed = true;
                        }
                        Some(record) => {
                            states.insert(id.clone(), NodeState::Updating);
                            self.emit(EngineEvent::NodeStarted {
                                node: id.clone(),
                                kind: node.kind,
                            });
                            let adapter = self.adapter_for(node.kind)?;
                            let shadow = Arc::clone(&self.shadow);
                            let retry = options.retry;
                            let id = id.clone();
                            tasks.spawn(async move {
                                let result =
                                    update_node(adapter, shadow, &id, record, params, digest, retry)
                                        .await;
                                (id, result)
                            });
                            progressed = true;
                        }
                        None => {
                            states.insert(id.clone(), NodeState::Creating);
                            self.emit(EngineEvent::NodeStarted {
                                node: id.clone(),
                                kind: node.kind,
                            });
                            let adapter = self.adapter_for(node.kind)?;
                            let shadow = Arc::clone(&self.shadow);
                            let retry = options.retry;
                            let id = id.clone();
                            tasks.spawn(async move {
                                let result =
                                    create_node(adapter, shadow, &id, params, digest, retry).await;
                                (id, result)
                            });
                            progressed = true;
                        }
                    }
                }
            }

            if let Some(joined) = tasks.join_next().await {
                let (id, result) = joined.map_err(|e| EngineError::Internal(e.to_string()))?;
                match result {
                    Ok(done) => {
                        states.insert(id.clone(), NodeState::Created);
                        outputs.insert(id.clone(), present_outputs(&done.outputs));
                        actions.insert(id.clone(), done.action);
                        let event = match done.action {
                            NodeAction::Updated => EngineEvent::NodeUpdated {
                                node: id.clone(),
                                physical_id: done.physical_id,
                            },
                            _ => EngineEvent::NodeCreated {
                                node: id.clone(),
                                physical_id: done.physical_id,
                            },
                        };
                        self.emit(event);
                    }
                    Err(message) => {
                        warn!(node = %id, error = %message, "node failed");
                        states.insert(id.clone(), NodeState::Failed);
                        actions.insert(id.clone(), NodeAction::Failed);
                        self.emit(EngineEvent::NodeFailed {
                            node: id.clone(),
                            error: message.clone(),
                        });
                        errors.insert(id, message);
                    }
                }
                continue;
            }

            if !progressed {
                break;
            }
        }

        let cancelled = options.cancel.is_cancelled()
            && states.values().any(|s| *s == NodeState::Pending);

        let outcomes: Vec<NodeOutcome> = apply_order
            .iter()
            .filter_map(|id| {
                let node = self.graph.node(id)?;
                Some(NodeOutcome {
                    node: id.clone(),
                    kind: node.kind,
                    state: states[id],
                    action: actions.get(id).copied().unwrap_or(NodeAction::Skipped),
                    error: errors.remove(id),
                })
            })
            .collect();

        let failed = outcomes
            .iter()
            .filter(|o| o.state == NodeState::Failed)
            .count();
        let skipped = outcomes.iter().filter(|o| o.state.is_skipped()).count();

        let report = ApplyReport {
            outcomes,
            outputs,
            cancelled,
        };
        info!(
            failed,
            skipped,
            cancelled,
            succeeded = report.success(),
            "apply run finished"
        );
        self.emit(EngineEvent::RunCompleted {
            succeeded: report.success(),
            failed,
            skipped,
        });
        Ok(report)
    }

    /// Tear the graph down in exact reverse apply order
    ///
    /// Sequential: each delete must land before the next, because deleting a
    /// dependency while its dependent still exists trips the platform's
    /// in-use check. A failed delete therefore blocks every node it
    /// transitively depends on; unrelated nodes keep deleting.
    #[instrument(skip_all, fields(stack = %self.graph.name()))]
    pub async fn destroy(&self, options: DestroyOptions) -> Result<DestroyReport> {
        for node in self.graph.nodes() {
            self.adapter_for(node.kind)?;
        }

        let mut outcomes = Vec::with_capacity(self.graph.len());
        let mut blocked: BTreeSet<NodeId> = BTreeSet::new();

        for id in self.graph.destroy_order() {
            let node = self.graph.node(&id).ok_or_else(|| {
                EngineError::Internal(format!("node {id} missing from graph"))
            })?;

            if blocked.contains(&id) {
                outcomes.push(NodeOutcome {
                    node: id.clone(),
                    kind: node.kind,
                    state: NodeState::SkippedUpstreamFailure,
                    action: NodeAction::Skipped,
                    error: None,
                });
                self.emit(EngineEvent::NodeSkipped {
                    node: id,
                    state: NodeState::SkippedUpstreamFailure,
                });
                continue;
            }

            let Some(record) = self.shadow.get(&id).await? else {
                // Never created, already destroyed, or skipped on apply.
                outcomes.push(NodeOutcome {
                    node: id.clone(),
                    kind: node.kind,
                    state: NodeState::Deleted,
                    action: NodeAction::AlreadyAbsent,
                    error: None,
                });
                self.emit(EngineEvent::NodeDeleted { node: id });
                continue;
            };

            let adapter = self.adapter_for(node.kind)?;
            self.emit(EngineEvent::NodeStarted {
                node: id.clone(),
                kind: node.kind,
            });

            match delete_with_retry(
                adapter.as_ref(),
                &record.physical_id,
                options.force_teardown,
                options.retry,
            )
            .await
            {
                Ok(()) => {
                    self.shadow.remove(&id).await?;
                    outcomes.push(NodeOutcome {
                        node: id.clone(),
                        kind: node.kind,
                        state: NodeState::Deleted,
                        action: NodeAction::Deleted,
                        error: None,
                    });
                    self.emit(EngineEvent::NodeDeleted { node: id });
                }
                Err(message) => {
                    warn!(node = %id, error = %message, "delete failed");
                    for dep in self.transitive_dependencies(&id) {
                        blocked.insert(dep);
                    }
                    outcomes.push(NodeOutcome {
                        node: id.clone(),
                        kind: node.kind,
                        state: NodeState::Failed,
                        action: NodeAction::Failed,
                        error: Some(message.clone()),
                    });
                    self.emit(EngineEvent::NodeFailed {
                        node: id,
                        error: message,
                    });
                }
            }
        }

        let failed = outcomes
            .iter()
            .filter(|o| o.state == NodeState::Failed)
            .count();
        let skipped = outcomes.iter().filter(|o| o.state.is_skipped()).count();
        self.emit(EngineEvent::RunCompleted {
            succeeded: failed == 0 && skipped == 0,
            failed,
            skipped,
        });
        info!(failed, skipped, "destroy run finished");
        Ok(DestroyReport { outcomes })
    }

    /// Everything `id` transitively depends on (backward closure)
    fn transitive_dependencies(&self, id: &NodeId) -> BTreeSet<NodeId> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            for dep in self.graph.dependencies_of(&current) {
                if seen.insert(dep.clone()) {
                    stack.push(dep);
                }
            }
        }
        seen
    }
}

fn present_outputs(outputs: &BTreeMap<String, String>) -> BTreeMap<String, OutputValue> {
    outputs
        .iter()
        .map(|(k, v)| (k.clone(), OutputValue::Present(v.clone())))
        .collect()
}

/// Bound one provider call by the per-call deadline
///
/// An elapsed call is surfaced as `Transient`, so the normal retry and
/// containment path applies and a stalled platform cannot hang the run.
async fn bounded<T>(
    limit: Duration,
    call: impl std::future::Future<Output = std::result::Result<T, ProviderError>>,
) -> std::result::Result<T, ProviderError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Transient(format!(
            "provider call timed out after {:?}",
            limit
        ))),
    }
}

async fn create_node(
    adapter: Arc<dyn ProviderAdapter>,
    shadow: Arc<dyn ShadowStateStore>,
    id: &NodeId,
    params: ResolvedParams,
    digest: String,
    retry: RetryPolicy,
) -> std::result::Result<TaskSuccess, String> {
    let mut attempt = 1;
    loop {
        match bounded(retry.call_timeout, adapter.create(&params)).await {
            Ok(created) => {
                let resource =
                    PhysicalResource::new(&created.physical_id, created.outputs.clone(), &digest);
                shadow.put(id, resource).await.map_err(|e| e.to_string())?;
                return Ok(TaskSuccess {
                    physical_id: created.physical_id,
                    outputs: created.outputs,
                    action: NodeAction::Created,
                });
            }
            Err(ProviderError::Conflict {
                existing_id: Some(existing),
                ..
            }) => {
                // The object already exists remotely (an earlier run crashed
                // after create, before the shadow write). Adopt it and
                // converge it in place.
                let outputs =
                    update_with_retry(adapter.as_ref(), &existing, &params, retry).await?;
                let resource = PhysicalResource::new(&existing, outputs.clone(), &digest);
                shadow.put(id, resource).await.map_err(|e| e.to_string())?;
                return Ok(TaskSuccess {
                    physical_id: existing,
                    outputs,
                    action: NodeAction::Created,
                });
            }
            Err(e) if e.is_transient() && attempt < retry.max_attempts => {
                tokio::time::sleep(retry.delay(attempt)).await;
                attempt += 1;
            }
            Err(e) => return Err(e.to_string()),
        }
    }
}

async fn update_node(
    adapter: Arc<dyn ProviderAdapter>,
    shadow: Arc<dyn ShadowStateStore>,
    id: &NodeId,
    mut record: PhysicalResource,
    params: ResolvedParams,
    digest: String,
    retry: RetryPolicy,
) -> std::result::Result<TaskSuccess, String> {
    let outputs = update_with_retry(adapter.as_ref(), &record.physical_id, &params, retry).await?;
    record.record_update(outputs.clone(), digest);
    let physical_id = record.physical_id.clone();
    shadow.put(id, record).await.map_err(|e| e.to_string())?;
    Ok(TaskSuccess {
        physical_id,
        outputs,
        action: NodeAction::Updated,
    })
}

async fn update_with_retry(
    adapter: &dyn ProviderAdapter,
    physical_id: &str,
    params: &ResolvedParams,
    retry: RetryPolicy,
) -> std::result::Result<BTreeMap<String, String>, String> {
    let mut attempt = 1;
    loop {
        match bounded(retry.call_timeout, adapter.update(physical_id, params)).await {
            Ok(outputs) => return Ok(outputs),
            Err(e) if e.is_transient() && attempt < retry.max_attempts => {
                tokio::time::sleep(retry.delay(attempt)).await;
                attempt += 1;
            }
            // NotFound here means the remote object drifted away under our
            // shadow record; repairing drift is a separate concern, so the
            // node fails.
            Err(e) => return Err(e.to_string()),
        }
    }
}

async fn delete_with_retry(
    adapter: &dyn ProviderAdapter,
    physical_id: &str,
    force: bool,
    retry: RetryPolicy,
) -> std::result::Result<(), String> {
    let mut attempt = 1;
    loop {
        match bounded(retry.call_timeout, adapter.delete(physical_id, force)).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) if e.is_transient() && attempt < retry.max_attempts => {
                tokio::time::sleep(retry.delay(attempt)).await;
                attempt += 1;
            }
            Err(e) => return Err(e.to_string()),
        }
    }
}
