//! In-process append store.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::storage::store::{AppendStore, StoreError};
use crate::storage::target::RemoteAppendTarget;

/// Append store kept in memory.
///
/// Cloning shares the underlying data. Appends take the object's shard lock,
/// so every block lands contiguously.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    containers: Arc<DashMap<String, DashMap<String, Vec<u8>>>>,
    operations: Arc<AtomicUsize>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every operation fails until switched back.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of store operations attempted so far.
    pub fn operation_count(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    pub fn container_exists(&self, container: &str) -> bool {
        self.containers.contains_key(container)
    }

    /// Current bytes of an object, if it exists.
    pub fn contents(&self, target: &RemoteAppendTarget) -> Option<Vec<u8>> {
        self.containers
            .get(&target.container_id)
            .and_then(|objects| objects.get(&target.object_id).map(|data| data.value().clone()))
    }

    /// Object contents split into lines.
    pub fn lines(&self, target: &RemoteAppendTarget) -> Vec<String> {
        self.contents(target)
            .map(|data| String::from_utf8_lossy(&data).lines().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn begin(&self) -> Result<(), StoreError> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Status {
                status: 503,
                code: Some("ServerBusy".to_string()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AppendStore for MemoryStore {
    async fn create_container_if_not_exists(&self, container: &str) -> Result<(), StoreError> {
        self.begin()?;
        self.containers.entry(container.to_string()).or_default();
        Ok(())
    }

    async fn create_append_object_if_not_exists(
        &self,
        target: &RemoteAppendTarget,
    ) -> Result<(), StoreError> {
        self.begin()?;
        let objects = self
            .containers
            .get(&target.container_id)
            .ok_or_else(|| StoreError::NotFound(format!("container '{}'", target.container_id)))?;
        objects.entry(target.object_id.clone()).or_default();
        Ok(())
    }

    async fn append_block(&self, target: &RemoteAppendTarget, block: Vec<u8>) -> Result<(), StoreError> {
        self.begin()?;
        let objects = self
            .containers
            .get(&target.container_id)
            .ok_or_else(|| StoreError::NotFound(format!("container '{}'", target.container_id)))?;
        let mut data = objects
            .get_mut(&target.object_id)
            .ok_or_else(|| StoreError::NotFound(format!("object '{}'", target)))?;
        data.extend_from_slice(&block);
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
