//! The node store contract.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::key::ObjectKey;

/// Keyed blob store backing one storage node.
///
/// Implemented by local backends and by remote clients alike, so the router
/// and the membership controller never care which one they talk to. A write
/// is visible to every later read and list on the same store.
#[async_trait]
pub trait NodeStore: Send + Sync + 'static {
    /// Returns the object's bytes, or `StoreError::NotFound`.
    async fn read(&self, key: &ObjectKey) -> Result<Bytes>;

    /// Stores (or overwrites) the object.
    async fn write(&self, key: &ObjectKey, data: Bytes) -> Result<()>;

    /// Deletes the object, or `StoreError::NotFound`.
    async fn remove(&self, key: &ObjectKey) -> Result<()>;

    /// Every object currently held, in no particular order.
    async fn list(&self) -> Result<Vec<ObjectKey>>;

    /// Releases any connection held to the backend. Called once when the
    /// node leaves the cluster; local backends have nothing to release.
    async fn close(&self) {}
}
