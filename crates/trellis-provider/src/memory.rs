//! In-memory simulated control plane
//!
//! Suitable for development and engine testing. It enforces the same
//! referential rules a real platform would: wiring steps require their agent
//! to exist, publishing snapshots a draft into a numbered version, and
//! deleting a still-referenced object fails unless forced.

use crate::adapter::{CreatedResource, ProviderAdapter, ProviderRegistry, ResolvedParams};
use crate::error::{ProviderError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use trellis_types::NodeKind;
use uuid::Uuid;

/// A materialized object as the simulated platform sees it
#[derive(Debug, Clone)]
pub struct PlatformObject {
    pub kind: NodeKind,
    pub params: ResolvedParams,
}

/// Simulated remote platform shared by one adapter per kind
#[derive(Default)]
pub struct InMemoryControlPlane {
    objects: DashMap<String, PlatformObject>,
    publish_counters: DashMap<String, u64>,
}

impl InMemoryControlPlane {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registry with an adapter for every node kind, all backed by this plane
    pub fn registry(self: &Arc<Self>) -> ProviderRegistry {
        let kinds = [
            NodeKind::PrimaryAgent,
            NodeKind::CollaboratorAgent,
            NodeKind::KnowledgeStore,
            NodeKind::ToolGroup,
            NodeKind::CapabilityToggle,
            NodeKind::CollaboratorAssociation,
            NodeKind::PublishStep,
            NodeKind::Alias,
        ];
        let mut registry = ProviderRegistry::new();
        for kind in kinds {
            registry.register(Arc::new(InMemoryAdapter {
                kind,
                plane: Arc::clone(self),
            }));
        }
        registry
    }

    pub fn contains(&self, physical_id: &str) -> bool {
        self.objects.contains_key(physical_id)
    }

    pub fn object(&self, physical_id: &str) -> Option<PlatformObject> {
        self.objects.get(physical_id).map(|o| o.clone())
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn next_id(&self, prefix: &str) -> String {
        let uuid = Uuid::new_v4().simple().to_string();
        format!("{}-{}", prefix, &uuid[..8])
    }

    /// Whether any other object's parameters point at this physical id
    fn in_use(&self, physical_id: &str) -> bool {
        self.objects.iter().any(|entry| {
            entry.key() != physical_id
                && entry
                    .value()
                    .params
                    .values()
                    .any(|v| v.as_str() == Some(physical_id))
        })
    }

    fn require_existing(&self, params: &ResolvedParams, key: &str) -> Result<String> {
        let id = require_str(params, key)?;
        if !self.objects.contains_key(&id) {
            return Err(ProviderError::Invalid(format!(
                "{} refers to unknown object {}",
                key, id
            )));
        }
        Ok(id)
    }
}

/// One adapter per kind, all sharing the same plane
pub struct InMemoryAdapter {
    kind: NodeKind,
    plane: Arc<InMemoryControlPlane>,
}

impl InMemoryAdapter {
    fn id_prefix(&self) -> &'static str {
        match self.kind {
            NodeKind::PrimaryAgent | NodeKind::CollaboratorAgent => "agent",
            NodeKind::KnowledgeStore => "store",
            NodeKind::ToolGroup => "tools",
            NodeKind::CapabilityToggle => "toggle",
            NodeKind::CollaboratorAssociation => "assoc",
            NodeKind::PublishStep => "publish",
            NodeKind::Alias => "alias",
        }
    }

    /// Validate referential parameters the way the platform would
    fn check_wiring(&self, params: &ResolvedParams) -> Result<()> {
        match self.kind {
            NodeKind::CapabilityToggle | NodeKind::PublishStep => {
                self.plane.require_existing(params, "agent_id")?;
            }
            NodeKind::CollaboratorAssociation => {
                self.plane.require_existing(params, "agent_id")?;
                self.plane.require_existing(params, "collaborator_id")?;
            }
            NodeKind::Alias => {
                self.plane.require_existing(params, "agent_id")?;
                // An alias must point at a published version; absent means
                // the publish step was skipped for this run.
                require_str(params, "version")?;
            }
            _ => {}
        }
        Ok(())
    }

    fn outputs_for(&self, physical_id: &str, params: &ResolvedParams) -> BTreeMap<String, String> {
        let mut outputs = BTreeMap::new();
        match self.kind {
            NodeKind::PublishStep => {
                // Snapshot the draft: bump the per-agent version counter.
                let agent = params
                    .get("agent_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or(physical_id)
                    .to_string();
                let mut counter = self.plane.publish_counters.entry(agent).or_insert(0);
                *counter += 1;
                outputs.insert("version".into(), counter.to_string());
            }
            _ => {
                for name in self.kind.output_names() {
                    outputs.insert((*name).into(), physical_id.to_string());
                }
            }
        }
        outputs
    }
}

#[async_trait]
impl ProviderAdapter for InMemoryAdapter {
    fn kind(&self) -> NodeKind {
        self.kind
    }

    async fn create(&self, params: &ResolvedParams) -> Result<CreatedResource> {
        self.check_wiring(params)?;

        let physical_id = self.plane.next_id(self.id_prefix());
        let outputs = self.outputs_for(&physical_id, params);
        self.plane.objects.insert(
            physical_id.clone(),
            PlatformObject {
                kind: self.kind,
                params: params.clone(),
            },
        );

        debug!(kind = %self.kind, physical_id = %physical_id, "object created");
        Ok(CreatedResource {
            physical_id,
            outputs,
        })
    }

    async fn update(
        &self,
        physical_id: &str,
        params: &ResolvedParams,
    ) -> Result<BTreeMap<String, String>> {
        self.check_wiring(params)?;

        let Some(mut object) = self.plane.objects.get_mut(physical_id) else {
            return Err(ProviderError::NotFound(physical_id.to_string()));
        };
        object.params = params.clone();
        drop(object);

        debug!(kind = %self.kind, physical_id = %physical_id, "object updated");
        Ok(self.outputs_for(physical_id, params))
    }

    async fn delete(&self, physical_id: &str, force: bool) -> Result<()> {
        if !self.plane.objects.contains_key(physical_id) {
            // Already gone: success, not failure.
            return Ok(());
        }

        if !force && self.plane.in_use(physical_id) {
            return Err(ProviderError::Invalid(format!(
                "{} is still referenced by another object",
                physical_id
            )));
        }

        self.plane.objects.remove(physical_id);
        self.plane.publish_counters.remove(physical_id);
        debug!(kind = %self.kind, physical_id = %physical_id, force, "object deleted");
        Ok(())
    }
}

fn require_str(params: &ResolvedParams, key: &str) -> Result<String> {
    match params.get(key) {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(serde_json::Value::Null) => Err(ProviderError::Invalid(format!(
            "{} is absent for this run",
            key
        ))),
        Some(other) => Err(ProviderError::Invalid(format!(
            "{} must be a string, got {}",
            key, other
        ))),
        None => Err(ProviderError::Invalid(format!("{} is required", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, serde_json::Value)]) -> ResolvedParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn create_agent_exposes_agent_id() {
        let plane = InMemoryControlPlane::new();
        let registry = plane.registry();
        let adapter = registry.get(NodeKind::PrimaryAgent).unwrap();

        let created = adapter
            .create(&params(&[("name", json!("supervisor"))]))
            .await
            .unwrap();
        assert_eq!(created.outputs["agent_id"], created.physical_id);
        assert!(plane.contains(&created.physical_id));
    }

    #[tokio::test]
    async fn association_requires_existing_agents() {
        let plane = InMemoryControlPlane::new();
        let registry = plane.registry();
        let adapter = registry.get(NodeKind::CollaboratorAssociation).unwrap();

        let err = adapter
            .create(&params(&[
                ("agent_id", json!("agent-missing")),
                ("collaborator_id", json!("agent-missing-too")),
            ]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Invalid(_)));
    }

    #[tokio::test]
    async fn publish_increments_version_per_agent() {
        let plane = InMemoryControlPlane::new();
        let registry = plane.registry();
        let agents = registry.get(NodeKind::PrimaryAgent).unwrap();
        let publish = registry.get(NodeKind::PublishStep).unwrap();

        let agent = agents.create(&ResolvedParams::new()).await.unwrap();
        let wiring = params(&[("agent_id", json!(agent.physical_id))]);

        let first = publish.create(&wiring).await.unwrap();
        assert_eq!(first.outputs["version"], "1");
        let again = publish.update(&first.physical_id, &wiring).await.unwrap();
        assert_eq!(again["version"], "2");
    }

    #[tokio::test]
    async fn alias_rejects_absent_version() {
        let plane = InMemoryControlPlane::new();
        let registry = plane.registry();
        let agents = registry.get(NodeKind::PrimaryAgent).unwrap();
        let alias = registry.get(NodeKind::Alias).unwrap();

        let agent = agents.create(&ResolvedParams::new()).await.unwrap();
        let err = alias
            .create(&params(&[
                ("agent_id", json!(agent.physical_id)),
                ("version", serde_json::Value::Null),
            ]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Invalid(_)));
    }

    #[tokio::test]
    async fn delete_tolerates_already_gone() {
        let plane = InMemoryControlPlane::new();
        let registry = plane.registry();
        let adapter = registry.get(NodeKind::KnowledgeStore).unwrap();
        assert!(adapter.delete("store-never-existed", false).await.is_ok());
    }

    #[tokio::test]
    async fn delete_of_referenced_agent_needs_force() {
        let plane = InMemoryControlPlane::new();
        let registry = plane.registry();
        let agents = registry.get(NodeKind::PrimaryAgent).unwrap();
        let toggles = registry.get(NodeKind::CapabilityToggle).unwrap();

        let agent = agents.create(&ResolvedParams::new()).await.unwrap();
        toggles
            .create(&params(&[("agent_id", json!(agent.physical_id))]))
            .await
            .unwrap();

        let err = agents.delete(&agent.physical_id, false).await.unwrap_err();
        assert!(matches!(err, ProviderError::Invalid(_)));
        assert!(agents.delete(&agent.physical_id, true).await.is_ok());
        assert!(!plane.contains(&agent.physical_id));
    }
}
