//! Provider adapter trait and registry

use crate::error::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use trellis_types::NodeKind;

/// Node parameters after reference resolution
///
/// References are gone by the time an adapter sees them; outputs of
/// condition-skipped nodes arrive as JSON `null` (absent - "feature disabled
/// for this run"). Adapters that cannot operate without a value return
/// [`crate::ProviderError::Invalid`] rather than provisioning against it.
pub type ResolvedParams = BTreeMap<String, serde_json::Value>;

/// Result of a successful create call
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedResource {
    /// Opaque identifier assigned by the platform
    pub physical_id: String,
    /// Named output attributes
    pub outputs: BTreeMap<String, String>,
}

/// Per-resource-kind binding to the control plane's flat verbs
///
/// All three calls must be safe to retry for transient failures - the
/// platform may have partially applied the request.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// The node kind this adapter provisions
    fn kind(&self) -> NodeKind;

    /// Create the remote object
    async fn create(&self, params: &ResolvedParams) -> Result<CreatedResource>;

    /// Update the remote object in place
    async fn update(
        &self,
        physical_id: &str,
        params: &ResolvedParams,
    ) -> Result<BTreeMap<String, String>>;

    /// Delete the remote object
    ///
    /// "Already gone" is success, not failure. `force` requests the platform
    /// bypass its "still referenced" safety check and is passed only during
    /// whole-graph teardown.
    async fn delete(&self, physical_id: &str, force: bool) -> Result<()>;
}

/// Kind-to-adapter lookup used by the executor
#[derive(Default)]
pub struct ProviderRegistry {
    adapters: HashMap<NodeKind, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own kind (last registration wins)
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, kind: NodeKind) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&kind).cloned()
    }

    pub fn contains(&self, kind: NodeKind) -> bool {
        self.adapters.contains_key(&kind)
    }
}
