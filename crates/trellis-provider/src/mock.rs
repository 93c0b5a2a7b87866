//! Scripted adapters for engine tests
//!
//! A [`CallLog`] shared across adapters records every provider call with a
//! monotonic sequence number, so tests can assert dispatch order and call
//! counts. [`ScriptedAdapter`] replays programmed failures before
//! succeeding, which is how retry, conflict-reroute, and containment paths
//! get exercised.

use crate::adapter::{CreatedResource, ProviderAdapter, ResolvedParams};
use crate::error::{ProviderError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use trellis_types::NodeKind;

/// Provider verb observed by the log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOp {
    Create,
    Update,
    Delete,
}

/// One recorded provider call
#[derive(Debug, Clone)]
pub struct CallRecord {
    /// Monotonic sequence number across all adapters sharing the log
    pub seq: u64,
    pub kind: NodeKind,
    pub op: MockOp,
    /// The `name` parameter, when present (tests use it to tag nodes)
    pub name: Option<String>,
    /// Physical id for update/delete calls
    pub physical_id: Option<String>,
    /// Force flag for delete calls
    pub force: bool,
}

/// Shared call log with monotonic ordering
#[derive(Default)]
pub struct CallLog {
    seq: AtomicU64,
    calls: Mutex<Vec<CallRecord>>,
}

impl CallLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn record(
        &self,
        kind: NodeKind,
        op: MockOp,
        params: Option<&ResolvedParams>,
        physical_id: Option<&str>,
        force: bool,
    ) {
        let record = CallRecord {
            seq: self.seq.fetch_add(1, Ordering::SeqCst),
            kind,
            op,
            name: params
                .and_then(|p| p.get("name"))
                .and_then(|v| v.as_str())
                .map(String::from),
            physical_id: physical_id.map(String::from),
            force,
        };
        self.calls.lock().expect("call log poisoned").push(record);
    }

    /// Every recorded call, in sequence order
    pub fn calls(&self) -> Vec<CallRecord> {
        self.calls.lock().expect("call log poisoned").clone()
    }

    pub fn count(&self, op: MockOp) -> usize {
        self.calls().iter().filter(|c| c.op == op).count()
    }

    pub fn total(&self) -> usize {
        self.calls().len()
    }

    /// `name` tags of create/update calls, in dispatch order
    pub fn dispatched_names(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c.op, MockOp::Create | MockOp::Update))
            .filter_map(|c| c.name)
            .collect()
    }

    /// Physical ids of delete calls, in dispatch order
    pub fn deleted_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.op == MockOp::Delete)
            .filter_map(|c| c.physical_id)
            .collect()
    }
}

/// Adapter that replays programmed failures, then succeeds
pub struct ScriptedAdapter {
    kind: NodeKind,
    log: Arc<CallLog>,
    ids: AtomicU64,
    extra_outputs: BTreeMap<String, String>,
    create_failures: Mutex<VecDeque<ProviderError>>,
    update_failures: Mutex<VecDeque<ProviderError>>,
    delete_failures: Mutex<VecDeque<ProviderError>>,
}

impl ScriptedAdapter {
    pub fn new(kind: NodeKind, log: Arc<CallLog>) -> Self {
        Self {
            kind,
            log,
            ids: AtomicU64::new(1),
            extra_outputs: BTreeMap::new(),
            create_failures: Mutex::new(VecDeque::new()),
            update_failures: Mutex::new(VecDeque::new()),
            delete_failures: Mutex::new(VecDeque::new()),
        }
    }

    /// Merge fixed outputs into every create/update result
    pub fn with_outputs(mut self, outputs: BTreeMap<String, String>) -> Self {
        self.extra_outputs = outputs;
        self
    }

    /// Queue a failure for the next create call (repeatable)
    pub fn fail_create(self, error: ProviderError) -> Self {
        self.create_failures.lock().unwrap().push_back(error);
        self
    }

    /// Queue `n` copies of a failure for upcoming create calls
    pub fn fail_create_times(self, error: ProviderError, n: usize) -> Self {
        {
            let mut queue = self.create_failures.lock().unwrap();
            for _ in 0..n {
                queue.push_back(error.clone());
            }
        }
        self
    }

    pub fn fail_update(self, error: ProviderError) -> Self {
        self.update_failures.lock().unwrap().push_back(error);
        self
    }

    pub fn fail_delete(self, error: ProviderError) -> Self {
        self.delete_failures.lock().unwrap().push_back(error);
        self
    }

    fn next_failure(queue: &Mutex<VecDeque<ProviderError>>) -> Option<ProviderError> {
        queue.lock().expect("failure queue poisoned").pop_front()
    }

    fn outputs(&self, physical_id: &str) -> BTreeMap<String, String> {
        let mut outputs: BTreeMap<String, String> = self
            .kind
            .output_names()
            .iter()
            .map(|name| ((*name).to_string(), physical_id.to_string()))
            .collect();
        outputs.extend(self.extra_outputs.clone());
        outputs
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn kind(&self) -> NodeKind {
        self.kind
    }

    async fn create(&self, params: &ResolvedParams) -> Result<CreatedResource> {
        self.log
            .record(self.kind, MockOp::Create, Some(params), None, false);
        if let Some(error) = Self::next_failure(&self.create_failures) {
            return Err(error);
        }
        let physical_id = format!(
            "{}-{}",
            self.kind.as_str(),
            self.ids.fetch_add(1, Ordering::SeqCst)
        );
        Ok(CreatedResource {
            outputs: self.outputs(&physical_id),
            physical_id,
        })
    }

    async fn update(
        &self,
        physical_id: &str,
        params: &ResolvedParams,
    ) -> Result<BTreeMap<String, String>> {
        self.log.record(
            self.kind,
            MockOp::Update,
            Some(params),
            Some(physical_id),
            false,
        );
        if let Some(error) = Self::next_failure(&self.update_failures) {
            return Err(error);
        }
        Ok(self.outputs(physical_id))
    }

    async fn delete(&self, physical_id: &str, force: bool) -> Result<()> {
        self.log
            .record(self.kind, MockOp::Delete, None, Some(physical_id), force);
        if let Some(error) = Self::next_failure(&self.delete_failures) {
            return Err(error);
        }
        Ok(())
    }
}
