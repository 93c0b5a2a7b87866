//! Shadow state persistence
//!
//! The shadow store is the engine's local record of which nodes are already
//! materialized remotely and with which parameter fingerprint. It is the only
//! shared mutable structure in a run and is accessed under per-node, not
//! global, exclusion.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use trellis_types::{NodeId, PhysicalResource};

/// State store for shadow persistence
#[async_trait]
pub trait ShadowStateStore: Send + Sync {
    /// Get the record for a node, if one exists
    async fn get(&self, node: &NodeId) -> Result<Option<PhysicalResource>, StateStoreError>;

    /// Insert or replace the record for a node
    async fn put(&self, node: &NodeId, resource: PhysicalResource) -> Result<(), StateStoreError>;

    /// Remove the record for a node (no-op if absent)
    async fn remove(&self, node: &NodeId) -> Result<(), StateStoreError>;

    /// All records, keyed by node id
    async fn list(&self) -> Result<BTreeMap<NodeId, PhysicalResource>, StateStoreError>;
}

/// State store errors
#[derive(Debug, thiserror::Error)]
pub enum StateStoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// In-memory implementation for development and testing
#[derive(Default)]
pub struct InMemoryShadowStore {
    records: DashMap<NodeId, PhysicalResource>,
}

impl InMemoryShadowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShadowStateStore for InMemoryShadowStore {
    async fn get(&self, node: &NodeId) -> Result<Option<PhysicalResource>, StateStoreError> {
        Ok(self.records.get(node).map(|r| r.clone()))
    }

    async fn put(&self, node: &NodeId, resource: PhysicalResource) -> Result<(), StateStoreError> {
        self.records.insert(node.clone(), resource);
        Ok(())
    }

    async fn remove(&self, node: &NodeId) -> Result<(), StateStoreError> {
        self.records.remove(node);
        Ok(())
    }

    async fn list(&self) -> Result<BTreeMap<NodeId, PhysicalResource>, StateStoreError> {
        Ok(self
            .records
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect())
    }
}

/// File-backed implementation: one JSON document per stack
///
/// Writes go through a temp file and an atomic rename so a crash never
/// leaves a half-written state file. Mutations serialize on the document
/// mutex; the per-node exclusion guarantee still holds because each node is
/// touched by at most one in-flight task.
pub struct FileShadowStore {
    path: PathBuf,
    records: tokio::sync::Mutex<BTreeMap<NodeId, PhysicalResource>>,
}

impl FileShadowStore {
    /// Open a state file, creating an empty store if it does not exist yet
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StateStoreError> {
        let path = path.as_ref().to_path_buf();
        let records = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StateStoreError::Serialization(e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StateStoreError::Storage(e.to_string())),
        };
        Ok(Self {
            path,
            records: tokio::sync::Mutex::new(records),
        })
    }

    async fn persist(
        &self,
        records: &BTreeMap<NodeId, PhysicalResource>,
    ) -> Result<(), StateStoreError> {
        let bytes = serde_json::to_vec_pretty(records)
            .map_err(|e| StateStoreError::Serialization(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| StateStoreError::Storage(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StateStoreError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ShadowStateStore for FileShadowStore {
    async fn get(&self, node: &NodeId) -> Result<Option<PhysicalResource>, StateStoreError> {
        Ok(self.records.lock().await.get(node).cloned())
    }

    async fn put(&self, node: &NodeId, resource: PhysicalResource) -> Result<(), StateStoreError> {
        let mut records = self.records.lock().await;
        records.insert(node.clone(), resource);
        self.persist(&records).await
    }

    async fn remove(&self, node: &NodeId) -> Result<(), StateStoreError> {
        let mut records = self.records.lock().await;
        if records.remove(node).is_some() {
            self.persist(&records).await?;
        }
        Ok(())
    }

    async fn list(&self) -> Result<BTreeMap<NodeId, PhysicalResource>, StateStoreError> {
        Ok(self.records.lock().await.clone())
    }
}
