//! In-memory node store.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use crate::error::{Result, StoreError};
use crate::key::ObjectKey;
use crate::traits::NodeStore;

/// Concurrent map-backed store. Used for tests and ephemeral nodes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: DashMap<ObjectKey, Bytes>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.objects.contains_key(key)
    }
}

#[async_trait]
impl NodeStore for MemoryStore {
    async fn read(&self, key: &ObjectKey) -> Result<Bytes> {
        self.objects
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    async fn write(&self, key: &ObjectKey, data: Bytes) -> Result<()> {
        self.objects.insert(key.clone(), data);
        Ok(())
    }

    async fn remove(&self, key: &ObjectKey) -> Result<()> {
        self.objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    async fn list(&self) -> Result<Vec<ObjectKey>> {
        Ok(self.objects.iter().map(|entry| entry.key().clone()).collect())
    }
}
